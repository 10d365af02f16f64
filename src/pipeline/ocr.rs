//! OCR pass: run tesseract over each rendered page.
//!
//! Each page is written to a temporary PNG and handed to the tesseract CLI.
//! The child process is spawned with `kill_on_drop(true)` so that a timed-out
//! (dropped) call never leaves a stray process behind. Pages run with bounded
//! concurrency but results always line up 1:1 with the input pages.

use crate::error::PdfTablesError;
use crate::output::PageOcr;
use crate::pipeline::render::PageImage;
use async_trait::async_trait;
use futures::future::FutureExt;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Installation hint attached to a missing-tesseract error.
pub const TESSERACT_INSTALL_HINT: &str = "Install tesseract-ocr (apt install tesseract-ocr, \
brew install tesseract, or the Windows installer) and set TESSERACT_CMD if it is not on PATH.";

/// Character recognition collaborator.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognised text of one page; may be empty.
    async fn recognize(&self, page: &PageImage) -> Result<String, PdfTablesError>;
}

/// [`OcrEngine`] that shells out to the tesseract binary.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    cmd: PathBuf,
    lang: String,
    timeout_secs: u64,
}

impl TesseractEngine {
    pub fn new(cmd: impl Into<PathBuf>, lang: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            cmd: cmd.into(),
            lang: lang.into(),
            timeout_secs,
        }
    }

    fn not_installed(&self, detail: String) -> PdfTablesError {
        PdfTablesError::Configuration {
            tool: format!("tesseract ({})", self.cmd.display()),
            detail,
            hint: TESSERACT_INSTALL_HINT.to_string(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, page: &PageImage) -> Result<String, PdfTablesError> {
        let page_num = page.page_index + 1;
        let dir = tempfile::TempDir::new()
            .map_err(|e| PdfTablesError::Internal(format!("tempdir: {e}")))?;
        let png_path = dir.path().join(format!("page-{page_num}.png"));

        let image = page.image.clone();
        let target = png_path.clone();
        tokio::task::spawn_blocking(move || image.save_with_format(&target, image::ImageFormat::Png))
            .await
            .map_err(|e| PdfTablesError::Internal(format!("PNG task panicked: {e}")))?
            .map_err(|e| PdfTablesError::Internal(format!("PNG encode of page {page_num}: {e}")))?;

        let mut cmd = Command::new(&self.cmd);
        cmd.arg(&png_path)
            .arg("stdout")
            .args(["-l", &self.lang])
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(Duration::from_secs(self.timeout_secs), cmd.output())
            .await
        {
            Err(_) => {
                return Err(PdfTablesError::Timeout {
                    step: format!("OCR of page {page_num}"),
                    secs: self.timeout_secs,
                })
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(self.not_installed(e.to_string()))
            }
            Ok(Err(e)) => {
                return Err(PdfTablesError::Extraction(format!(
                    "cannot run tesseract on page {page_num}: {e}"
                )))
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PdfTablesError::Extraction(format!(
                "tesseract failed on page {page_num}: {}",
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("OCR page {}: {} chars", page_num, text.len());
        Ok(text)
    }
}

/// OCR every page with at most `concurrency` pages in flight.
///
/// The result aligns 1:1 with `pages`. The first engine error aborts the pass.
pub async fn run_ocr(
    engine: &Arc<dyn OcrEngine>,
    pages: Vec<PageImage>,
    concurrency: usize,
) -> Result<Vec<PageOcr>, PdfTablesError> {
    let engine = Arc::clone(engine);
    let results: Vec<PageOcr> = stream::iter(pages.into_iter().map(move |page| {
        let engine = Arc::clone(&engine);
        async move {
            let text = engine.recognize(&page).await?;
            Ok::<_, PdfTablesError>(PageOcr {
                page_index: page.page_index,
                text,
            })
        }
        .boxed()
    }))
    .buffered(concurrency.max(1))
    .try_collect()
    .await?;

    info!(
        "OCR finished: {} pages, {} chars",
        results.len(),
        results.iter().map(|p| p.text.len()).sum::<usize>()
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn page(idx: usize) -> PageImage {
        PageImage {
            page_index: idx,
            image: image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                8,
                8,
                Rgba([255, 255, 255, 255]),
            )),
        }
    }

    /// Earlier pages take longer, so completion order is reversed.
    struct SlowFirstEngine;

    #[async_trait]
    impl OcrEngine for SlowFirstEngine {
        async fn recognize(&self, page: &PageImage) -> Result<String, PdfTablesError> {
            let delay = 30u64.saturating_sub(page.page_index as u64 * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(format!("page {}", page.page_index + 1))
        }
    }

    struct FailingEngine;

    #[async_trait]
    impl OcrEngine for FailingEngine {
        async fn recognize(&self, page: &PageImage) -> Result<String, PdfTablesError> {
            if page.page_index == 1 {
                Err(PdfTablesError::Extraction("unreadable".into()))
            } else {
                Ok(String::new())
            }
        }
    }

    #[tokio::test]
    async fn results_align_with_input_order() {
        let engine: Arc<dyn OcrEngine> = Arc::new(SlowFirstEngine);
        let pages = vec![page(0), page(1), page(2)];
        let out = run_ocr(&engine, pages, 3).await.unwrap();
        let texts: Vec<_> = out.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["page 1", "page 2", "page 3"]);
        assert_eq!(out[2].page_index, 2);
    }

    #[tokio::test]
    async fn engine_error_aborts_pass() {
        let engine: Arc<dyn OcrEngine> = Arc::new(FailingEngine);
        let err = run_ocr(&engine, vec![page(0), page(1)], 1).await.unwrap_err();
        assert!(matches!(err, PdfTablesError::Extraction(_)));
    }

    #[tokio::test]
    async fn no_pages_no_work() {
        let engine: Arc<dyn OcrEngine> = Arc::new(FailingEngine);
        assert!(run_ocr(&engine, Vec::new(), 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_binary_is_configuration_error() {
        let engine = TesseractEngine::new("/definitely/not/tesseract", "eng", 5);
        let err = engine.recognize(&page(0)).await.unwrap_err();
        match err {
            PdfTablesError::Configuration { hint, .. } => assert!(hint.contains("tesseract")),
            other => panic!("expected Configuration, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_binary_is_extraction_error() {
        let engine = TesseractEngine::new("false", "eng", 5);
        let err = engine.recognize(&page(0)).await.unwrap_err();
        assert!(matches!(err, PdfTablesError::Extraction(_)), "got {err:?}");
    }
}

//! Text extraction and page rasterisation via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is CPU-bound and not
//! async-aware. Both operations run on Tokio's blocking pool through
//! [`extract_text`] and [`render_pages`] so request handlers never stall the
//! worker threads.
//!
//! ## Toolchain detection
//!
//! A failure to *bind* the pdfium shared library means the rendering
//! toolchain is absent and is reported as [`PdfTablesError::Configuration`]
//! with an installation hint. A failure to *open* a document is an
//! [`PdfTablesError::Extraction`].
//!
//! ## Library lifetime
//!
//! Dropping a [`Pdfium`] tears the library down process-wide, so a backend
//! binds once on first use and every later call, including concurrent
//! requests, shares that instance. A failed bind is not cached.

use crate::error::PdfTablesError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Installation hint attached to a missing-pdfium error.
pub const PDFIUM_INSTALL_HINT: &str = "Install the pdfium shared library \
(https://github.com/bblanchon/pdfium-binaries) and either place it on the system \
library path or set PDFIUM_LIB_PATH to the directory containing it.";

/// One rasterised page, consumed by the OCR pass.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 0-based page index.
    pub page_index: usize,
    pub image: DynamicImage,
}

/// PDF parser + rasteriser collaborator.
///
/// Implementations are blocking; the pipeline calls them from
/// `spawn_blocking`.
pub trait PdfBackend: Send + Sync {
    /// Plain text of every page, in page order, joined with `\n`.
    fn extract_text(&self, pdf_path: &Path) -> Result<String, PdfTablesError>;

    /// Rasterise every page, in page order.
    fn render_pages(&self, pdf_path: &Path) -> Result<Vec<PageImage>, PdfTablesError>;
}

/// [`PdfBackend`] backed by the pdfium library.
///
/// Clones share the bound library.
#[derive(Debug, Clone)]
pub struct PdfiumBackend {
    library_dir: Option<PathBuf>,
    max_rendered_pixels: u32,
    pdfium: Arc<Mutex<Option<Arc<Pdfium>>>>,
}

impl PdfiumBackend {
    pub fn new(library_dir: Option<PathBuf>, max_rendered_pixels: u32) -> Self {
        Self {
            library_dir,
            max_rendered_pixels,
            pdfium: Arc::new(Mutex::new(None)),
        }
    }

    /// The shared library instance, bound on first use.
    fn pdfium(&self) -> Result<Arc<Pdfium>, PdfTablesError> {
        let mut slot = self
            .pdfium
            .lock()
            .map_err(|_| PdfTablesError::Internal("pdfium lock poisoned".to_string()))?;
        if let Some(pdfium) = slot.as_ref() {
            return Ok(Arc::clone(pdfium));
        }
        let pdfium = Arc::new(self.bind()?);
        info!("Bound pdfium library");
        *slot = Some(Arc::clone(&pdfium));
        Ok(pdfium)
    }

    fn bind(&self) -> Result<Pdfium, PdfTablesError> {
        let bindings = match &self.library_dir {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| PdfTablesError::Configuration {
            tool: "pdfium".to_string(),
            detail: format!("{:?}", e),
            hint: PDFIUM_INSTALL_HINT.to_string(),
        })?;
        Ok(Pdfium::new(bindings))
    }
}

fn open_error(pdf_path: &Path, e: PdfiumError) -> PdfTablesError {
    PdfTablesError::Extraction(format!(
        "cannot open PDF '{}': {:?}",
        pdf_path.display(),
        e
    ))
}

impl PdfBackend for PdfiumBackend {
    fn extract_text(&self, pdf_path: &Path) -> Result<String, PdfTablesError> {
        let pdfium = self.pdfium()?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| open_error(pdf_path, e))?;

        let mut pages_text = Vec::new();
        for (idx, page) in document.pages().iter().enumerate() {
            let text = page.text().map_err(|e| {
                PdfTablesError::Extraction(format!("text layer of page {}: {:?}", idx + 1, e))
            })?;
            pages_text.push(text.all());
        }
        drop(document);

        let text = join_page_text(&pages_text);
        debug!("Extracted {} chars from {} pages", text.len(), pages_text.len());
        Ok(text)
    }

    fn render_pages(&self, pdf_path: &Path) -> Result<Vec<PageImage>, PdfTablesError> {
        let pdfium = self.pdfium()?;
        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| open_error(pdf_path, e))?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(self.max_rendered_pixels as i32)
            .set_maximum_height(self.max_rendered_pixels as i32);

        let mut images = Vec::new();
        for (idx, page) in document.pages().iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                PdfTablesError::Extraction(format!("rasterisation of page {}: {:?}", idx + 1, e))
            })?;
            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(PageImage {
                page_index: idx,
                image,
            });
        }

        info!("Rendered {} pages", images.len());
        Ok(images)
    }
}

/// Join per-page text the way the document reads: one `\n` between pages.
pub fn join_page_text(pages: &[String]) -> String {
    pages.join("\n")
}

/// Run [`PdfBackend::extract_text`] on the blocking pool.
pub async fn extract_text(
    backend: Arc<dyn PdfBackend>,
    pdf_path: &Path,
) -> Result<String, PdfTablesError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || backend.extract_text(&path))
        .await
        .map_err(|e| PdfTablesError::Internal(format!("Text task panicked: {}", e)))?
}

/// Run [`PdfBackend::render_pages`] on the blocking pool.
pub async fn render_pages(
    backend: Arc<dyn PdfBackend>,
    pdf_path: &Path,
) -> Result<Vec<PageImage>, PdfTablesError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || backend.render_pages(&path))
        .await
        .map_err(|e| PdfTablesError::Internal(format!("Render task panicked: {}", e)))?
}

//! Whole-document orchestration: upload in, [`ExtractionReport`] out.
//!
//! [`TablePipeline`] owns one instance of each collaborator behind a trait
//! object so the HTTP server, the CLI and the tests can all drive the same
//! flow with real or fake backends.

use crate::config::ExtractorConfig;
use crate::error::{PdfTablesError, TableError};
use crate::gemini::GeminiClient;
use crate::output::{
    CleanedTable, ExtractionReport, ExtractionResponse, ExtractionStats, PageOcr, TableContent,
    TableOutcome,
};
use crate::pipeline::clean::clean_table;
use crate::pipeline::ingest::UploadedDocument;
use crate::pipeline::ocr::{run_ocr, OcrEngine, TesseractEngine};
use crate::pipeline::render::{self, PdfBackend, PdfiumBackend};
use crate::pipeline::summarize::{summarize_tables, ProviderGenerator, SummarySettings, TextGenerator};
use crate::pipeline::tables::{TableExtractor, TabulaExtractor};
use crate::prompts::{INVALID_TABLE_FORMAT, SUCCESS_MESSAGE};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The extraction pipeline with its collaborators.
#[derive(Clone)]
pub struct TablePipeline {
    config: ExtractorConfig,
    pdf: Arc<dyn PdfBackend>,
    ocr: Arc<dyn OcrEngine>,
    tables: Arc<dyn TableExtractor>,
    generator: Arc<dyn TextGenerator>,
}

impl TablePipeline {
    /// Wire the production collaborators from `config`.
    ///
    /// Summaries go through the named edgequake-llm provider when
    /// `provider_name` is set, otherwise through Gemini.
    pub fn from_config(config: ExtractorConfig) -> Result<Self, PdfTablesError> {
        let pdf = Arc::new(PdfiumBackend::new(
            config.pdfium_lib_path.clone(),
            config.max_rendered_pixels,
        ));
        let ocr = Arc::new(TesseractEngine::new(
            config.tesseract_cmd.clone(),
            config.tesseract_lang.clone(),
            config.ocr_timeout_secs,
        ));
        let tables = Arc::new(TabulaExtractor::new(
            config.java_cmd.clone(),
            config.tabula_jar.clone(),
            config.tabula_timeout_secs,
        ));
        let generator: Arc<dyn TextGenerator> = match config.provider_name.as_deref() {
            Some(name) => {
                info!("Summaries via provider '{}' ({})", name, config.model);
                Arc::new(ProviderGenerator::from_name(name, &config.model)?)
            }
            None => Arc::new(GeminiClient::from_config(&config)),
        };
        Ok(Self::with_backends(config, pdf, ocr, tables, generator))
    }

    /// Build a pipeline around caller-supplied collaborators.
    pub fn with_backends(
        config: ExtractorConfig,
        pdf: Arc<dyn PdfBackend>,
        ocr: Arc<dyn OcrEngine>,
        tables: Arc<dyn TableExtractor>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            config,
            pdf,
            ocr,
            tables,
            generator,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Persist `bytes` to a temporary PDF and process it.
    ///
    /// The temporary file is removed before this returns, on success and on
    /// every error path.
    pub async fn process_bytes(&self, bytes: &[u8]) -> Result<ExtractionReport, PdfTablesError> {
        let document = UploadedDocument::persist(bytes)?;
        info!("Processing upload ({} bytes)", document.len());
        let report = self.process_path(document.path()).await;
        drop(document);
        report
    }

    /// Process a PDF that already lives on disk.
    pub async fn process_path(&self, pdf_path: &Path) -> Result<ExtractionReport, PdfTablesError> {
        let total_start = Instant::now();
        let mut stats = ExtractionStats::default();

        // ── Step 1: Text layer ───────────────────────────────────────────
        let step = Instant::now();
        let text = render::extract_text(Arc::clone(&self.pdf), pdf_path).await?;
        stats.text_duration_ms = step.elapsed().as_millis() as u64;
        debug!("Text layer: {} chars", text.len());

        // ── Step 2: Rasterise + OCR ──────────────────────────────────────
        let ocr_pages = if self.config.ocr_enabled {
            self.ocr_pass(pdf_path, &mut stats).await?
        } else {
            debug!("OCR disabled, skipping rasterisation");
            Vec::new()
        };

        // ── Step 3: Detect and clean tables ──────────────────────────────
        let step = Instant::now();
        let cleaned = self.clean_tables(pdf_path).await?;
        stats.table_duration_ms = step.elapsed().as_millis() as u64;
        stats.detected_tables = cleaned.len();

        // ── Step 4: Summarise ────────────────────────────────────────────
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_extraction_start(cleaned.len());
        }
        let step = Instant::now();
        let outcomes = summarize_tables(
            &self.generator,
            cleaned,
            &SummarySettings::from_config(&self.config),
            self.config.concurrency,
            self.config.progress_callback.as_ref(),
        )
        .await;
        stats.summary_duration_ms = step.elapsed().as_millis() as u64;

        // ── Step 5: Assemble ─────────────────────────────────────────────
        let response = assemble_response(&outcomes)?;
        stats.summarized_tables = outcomes.iter().filter(|o| o.is_success()).count();
        stats.failed_tables = outcomes.len() - stats.summarized_tables;
        stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

        info!(
            "Extraction complete: {}/{} tables summarised, {}ms total",
            stats.summarized_tables, stats.detected_tables, stats.total_duration_ms
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_extraction_complete(outcomes.len(), stats.summarized_tables);
        }

        Ok(ExtractionReport {
            response,
            text,
            ocr_pages,
            outcomes,
            stats,
        })
    }

    /// Detect and clean the tables of a PDF on disk without summarising them.
    ///
    /// One entry per detected table, in detection order.
    pub async fn clean_tables(
        &self,
        pdf_path: &Path,
    ) -> Result<Vec<Result<CleanedTable, TableError>>, PdfTablesError> {
        let raw_tables = self.tables.extract(pdf_path).await?;
        info!("Detected {} tables", raw_tables.len());

        Ok(raw_tables
            .iter()
            .enumerate()
            .map(|(pos, raw)| {
                let result = clean_table(raw, pos + 1);
                if let Err(ref e) = result {
                    warn!("{}", e);
                }
                result
            })
            .collect())
    }

    async fn ocr_pass(
        &self,
        pdf_path: &Path,
        stats: &mut ExtractionStats,
    ) -> Result<Vec<PageOcr>, PdfTablesError> {
        let step = Instant::now();
        let images = render::render_pages(Arc::clone(&self.pdf), pdf_path).await?;
        stats.render_duration_ms = step.elapsed().as_millis() as u64;
        stats.rendered_pages = images.len();

        let step = Instant::now();
        let pages = run_ocr(&self.ocr, images, self.config.concurrency).await?;
        stats.ocr_duration_ms = step.elapsed().as_millis() as u64;
        Ok(pages)
    }
}

/// Build the wire response from per-table outcomes.
///
/// Outcomes must carry the indices `1..=n` in order; anything else means a
/// table was lost or duplicated and the whole request fails.
pub fn assemble_response(outcomes: &[TableOutcome]) -> Result<ExtractionResponse, PdfTablesError> {
    let mut tables = Vec::with_capacity(outcomes.len());
    for (pos, outcome) in outcomes.iter().enumerate() {
        if outcome.table_index() != pos + 1 {
            warn!(
                "Outcome at position {} carries table index {}",
                pos + 1,
                outcome.table_index()
            );
            return Err(PdfTablesError::Aggregation(INVALID_TABLE_FORMAT.to_string()));
        }
        tables.push(TableContent {
            table_index: outcome.table_index(),
            content: outcome.content_text(),
            summary: outcome.summary_text(),
        });
    }

    Ok(ExtractionResponse {
        message: SUCCESS_MESSAGE.to_string(),
        num_tables: tables.len(),
        tables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summarized(idx: usize) -> TableOutcome {
        TableOutcome::Summarized {
            table: CleanedTable {
                table_index: idx,
                headers: vec!["a".into()],
                rows: vec![vec!["1".into()]],
                content: "a\n1".into(),
            },
            summary: format!("table {idx}"),
        }
    }

    #[test]
    fn empty_outcomes_give_zero_tables() {
        let response = assemble_response(&[]).unwrap();
        assert_eq!(response.message, "PDF processed successfully");
        assert_eq!(response.num_tables, 0);
        assert!(response.tables.is_empty());
    }

    #[test]
    fn mixed_outcomes_keep_one_entry_each() {
        let outcomes = vec![
            summarized(1),
            TableOutcome::CleaningFailed {
                table_index: 2,
                error: TableError::Cleaning {
                    table: 2,
                    reason: "ragged".into(),
                },
            },
            summarized(3),
        ];
        let response = assemble_response(&outcomes).unwrap();
        assert_eq!(response.num_tables, 3);
        let indices: Vec<_> = response.tables.iter().map(|t| t.table_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(response.tables[1].content, "Error cleaning table: ragged");
        assert_eq!(response.tables[2].summary, "table 3");
    }

    #[test]
    fn gap_in_indices_is_aggregation_error() {
        let err = assemble_response(&[summarized(1), summarized(3)]).unwrap_err();
        match err {
            PdfTablesError::Aggregation(msg) => {
                assert_eq!(msg, "Invalid table format encountered.")
            }
            other => panic!("expected Aggregation, got {other:?}"),
        }
    }
}

//! # edgequake-pdftables
//!
//! Extract the tables of a PDF document, normalise them into aligned text and
//! summarise each one with a hosted language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Ingest     persist bytes to a temp file (removed on drop)
//!  ├─ 2. Render     text layer + page rasters via pdfium (spawn_blocking)
//!  ├─ 3. OCR        tesseract per page, bounded concurrency
//!  ├─ 4. Tables     tabula-java detection → clean → aligned text
//!  ├─ 5. Summarise  Gemini (or any edgequake-llm provider), per table
//!  └─ 6. Assemble   { message, num_tables, tables: [...] }
//! ```
//!
//! A failure in steps 1–4 aborts the document. Cleaning and summarising fail
//! per table: the table still appears in the response, with an error text.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdftables::{ExtractorConfig, TablePipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // GOOGLE_API_KEY, TABULA_JAR, TESSERACT_CMD, ... from the environment
//!     let config = ExtractorConfig::from_env()?;
//!     let pipeline = TablePipeline::from_config(config)?;
//!     let report = pipeline.process_path("report.pdf".as_ref()).await?;
//!     for table in &report.response.tables {
//!         println!("#{}: {}", table.table_index, table.summary);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## External tools
//!
//! | Tool | Used for | Configured by |
//! |------|----------|---------------|
//! | pdfium | text layer, rasterisation | `PDFIUM_LIB_PATH` |
//! | tesseract | OCR | `TESSERACT_CMD`, `TESSERACT_LANG` |
//! | Java + tabula jar | table detection | `JAVA_CMD`, `TABULA_JAR` |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdftables` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractorConfig, ExtractorConfigBuilder};
pub use embedding::{embed_texts, index_tables, Embedder, SearchHit, TableIndex};
pub use error::{GenerationError, PdfTablesError, TableError};
pub use extract::{assemble_response, TablePipeline};
pub use gemini::GeminiClient;
pub use output::{
    CleanedTable, ExtractionReport, ExtractionResponse, ExtractionStats, PageOcr, RawTable,
    TableContent, TableOutcome,
};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use server::{create_router, create_router_with_limit, serve, AppState};

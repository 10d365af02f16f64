//! Pipeline stages for PDF table extraction.
//!
//! Each submodule implements one step and talks to at most one external
//! collaborator, behind a trait.
//!
//! ## Data Flow
//!
//! ```text
//! ingest ──▶ render ──▶ ocr        (diagnostic text per page)
//!   │
//!   └──────▶ tables ──▶ clean ──▶ summarize
//! (temp file) (tabula)  (normalise) (LLM, per table)
//! ```
//!
//! 1. [`ingest`]: persist the upload to a scoped temp file
//! 2. [`render`]: text layer and page rasters via pdfium; blocking, so
//!    driven from `spawn_blocking`
//! 3. [`ocr`]: tesseract over every rendered page
//! 4. [`tables`]: tabula-java table detection
//! 5. [`clean`]: deterministic normalisation and text rendering
//! 6. [`summarize`]: one model call per table with timeout and retry

pub mod clean;
pub mod ingest;
pub mod ocr;
pub mod render;
pub mod summarize;
pub mod tables;

//! Error types for the edgequake-pdftables library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PdfTablesError`] (**fatal**): the request cannot proceed at all
//!   (rendering toolchain missing, tabula bridge missing, unreadable PDF).
//!   Returned as `Err(PdfTablesError)` from [`crate::extract::TablePipeline`]
//!   and mapped to HTTP 500 by the server.
//!
//! * [`TableError`] (**non-fatal**): a single table failed to clean or to
//!   summarise. Stored inside [`crate::output::TableOutcome`] so one bad
//!   table never costs the caller the rest of the document.

use thiserror::Error;

/// All fatal errors returned by the edgequake-pdftables library.
///
/// Per-table failures use [`TableError`] and are stored in
/// [`crate::output::TableOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PdfTablesError {
    // ── Environment errors ────────────────────────────────────────────────
    /// A required external toolchain (pdfium, tesseract) is not installed.
    #[error("{tool} is not available: {detail}\n{hint}")]
    Configuration {
        tool: String,
        detail: String,
        hint: String,
    },

    /// The Java runtime bridge used by the table engine is not available.
    #[error("{bridge} is not properly installed: {detail}\nPlease ensure Java is installed and the tabula jar is configured (TABULA_JAR).")]
    Dependency { bridge: String, detail: String },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// The PDF could not be opened, parsed or rendered.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// An external step did not finish within its time budget.
    #[error("{step} timed out after {secs}s")]
    Timeout { step: String, secs: u64 },

    /// The assembled per-table results are inconsistent.
    #[error("{0}")]
    Aggregation(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfTablesError {
    /// Whether the error means some external program or library is missing,
    /// as opposed to a problem with the document itself.
    pub fn is_missing_dependency(&self) -> bool {
        matches!(
            self,
            PdfTablesError::Configuration { .. } | PdfTablesError::Dependency { .. }
        )
    }
}

/// A non-fatal error for a single table.
///
/// The overall request continues; the failure is rendered as visible text in
/// the response entry of the affected table.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TableError {
    /// Normalisation of the raw grid failed.
    #[error("Table {table}: cleaning failed: {reason}")]
    Cleaning { table: usize, reason: String },

    /// The generation service failed after all retries.
    #[error("Table {table}: summarisation failed: {reason}")]
    Summary { table: usize, reason: String },

    /// The generation service did not answer in time.
    #[error("Table {table}: summarisation timed out after {secs}s")]
    Timeout { table: usize, secs: u64 },
}

impl TableError {
    /// The bare reason, without the `Table N:` prefix.
    pub fn reason(&self) -> String {
        match self {
            TableError::Cleaning { reason, .. } | TableError::Summary { reason, .. } => {
                reason.clone()
            }
            TableError::Timeout { secs, .. } => format!("request timed out after {secs}s"),
        }
    }
}

/// A failed call to a hosted generation or embedding model.
///
/// Never fatal on its own: the summariser turns it into a [`TableError`] and
/// the embedder into a zero vector.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    #[error("API key not configured (set GOOGLE_API_KEY)")]
    MissingApiKey,

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("{0}")]
    Provider(String),
}

impl From<edgequake_llm::LlmError> for GenerationError {
    fn from(e: edgequake_llm::LlmError) -> Self {
        use edgequake_llm::LlmError;
        match e {
            LlmError::RateLimited(msg) => GenerationError::RateLimited(msg),
            LlmError::NetworkError(msg) => GenerationError::Request(msg),
            LlmError::Timeout => GenerationError::Request("timed out".to_string()),
            other => GenerationError::Provider(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_display_carries_hint() {
        let e = PdfTablesError::Configuration {
            tool: "pdfium".into(),
            detail: "library not found".into(),
            hint: "Install pdfium and set PDFIUM_LIB_PATH.".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("pdfium"), "got: {msg}");
        assert!(msg.contains("PDFIUM_LIB_PATH"), "got: {msg}");
        assert!(e.is_missing_dependency());
    }

    #[test]
    fn dependency_display_names_bridge() {
        let e = PdfTablesError::Dependency {
            bridge: "tabula-java".into(),
            detail: "java: not found".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("tabula-java"));
        assert!(msg.contains("Java"));
    }

    #[test]
    fn extraction_is_not_missing_dependency() {
        let e = PdfTablesError::Extraction("bad xref".into());
        assert!(!e.is_missing_dependency());
    }

    #[test]
    fn timeout_display() {
        let e = PdfTablesError::Timeout {
            step: "tabula".into(),
            secs: 30,
        };
        assert_eq!(e.to_string(), "tabula timed out after 30s");
    }

    #[test]
    fn table_error_reason_strips_prefix() {
        let e = TableError::Summary {
            table: 2,
            reason: "HTTP 503".into(),
        };
        assert_eq!(e.reason(), "HTTP 503");
        assert!(e.to_string().starts_with("Table 2:"));
    }

    #[test]
    fn generation_error_display() {
        let e = GenerationError::RateLimited("quota".into());
        assert_eq!(e.to_string(), "rate limited: quota");
        assert!(GenerationError::MissingApiKey
            .to_string()
            .contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn provider_errors_are_classified() {
        use edgequake_llm::LlmError;
        assert_eq!(
            GenerationError::from(LlmError::RateLimited("429".into())),
            GenerationError::RateLimited("429".into())
        );
        assert_eq!(
            GenerationError::from(LlmError::NetworkError("refused".into())),
            GenerationError::Request("refused".into())
        );
        assert!(matches!(
            GenerationError::from(LlmError::ApiError("bad".into())),
            GenerationError::Provider(m) if m.contains("bad")
        ));
    }
}

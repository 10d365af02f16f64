//! Data model: raw and cleaned tables, per-table outcomes and the response.

use crate::error::TableError;
use crate::prompts::{cleaning_error_content, summary_error_text};
use serde::{Deserialize, Serialize};

/// A tabular region as detected, before normalisation.
///
/// `headers` holds the engine's header row; `rows` may be ragged and a
/// missing cell is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { headers, rows }
    }

    /// Treat already-rendered table text as a single-column table: the first
    /// line is the header, every further line one row.
    pub fn from_text_block(text: &str) -> Self {
        let mut lines = text.lines();
        let Some(first) = lines.next() else {
            return Self::default();
        };
        let header = if first.trim().is_empty() {
            "Unnamed: 0".to_string()
        } else {
            first.to_string()
        };
        let rows = lines
            .map(|l| {
                if l.is_empty() {
                    vec![None]
                } else {
                    vec![Some(l.to_string())]
                }
            })
            .collect();
        Self {
            headers: vec![header],
            rows,
        }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

/// A table after normalisation, with its canonical text rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedTable {
    /// 1-based position in detection order.
    pub table_index: usize,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Whitespace-aligned rendering without an index column.
    pub content: String,
}

impl CleanedTable {
    /// True when the rendering carries no visible characters.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// OCR text of one rendered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageOcr {
    /// 0-based page index.
    pub page_index: usize,
    pub text: String,
}

/// What happened to one detected table.
///
/// Success and failure are separate variants so a failure reason can never be
/// mistaken for table content and sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Summarized {
        table: CleanedTable,
        summary: String,
    },
    SummaryFailed {
        table: CleanedTable,
        error: TableError,
    },
    CleaningFailed {
        table_index: usize,
        error: TableError,
    },
}

impl TableOutcome {
    pub fn table_index(&self) -> usize {
        match self {
            TableOutcome::Summarized { table, .. } | TableOutcome::SummaryFailed { table, .. } => {
                table.table_index
            }
            TableOutcome::CleaningFailed { table_index, .. } => *table_index,
        }
    }

    /// The cleaned table, unless cleaning failed.
    pub fn table(&self) -> Option<&CleanedTable> {
        match self {
            TableOutcome::Summarized { table, .. } | TableOutcome::SummaryFailed { table, .. } => {
                Some(table)
            }
            TableOutcome::CleaningFailed { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TableOutcome::Summarized { .. })
    }

    pub fn error(&self) -> Option<&TableError> {
        match self {
            TableOutcome::Summarized { .. } => None,
            TableOutcome::SummaryFailed { error, .. } | TableOutcome::CleaningFailed { error, .. } => {
                Some(error)
            }
        }
    }

    /// Text placed in the `content` field of the response.
    pub fn content_text(&self) -> String {
        match self {
            TableOutcome::Summarized { table, .. } | TableOutcome::SummaryFailed { table, .. } => {
                table.content.clone()
            }
            TableOutcome::CleaningFailed { error, .. } => cleaning_error_content(&error.reason()),
        }
    }

    /// Text placed in the `summary` field of the response.
    pub fn summary_text(&self) -> String {
        match self {
            TableOutcome::Summarized { summary, .. } => summary.clone(),
            TableOutcome::SummaryFailed { error, .. } => summary_error_text(&error.reason()),
            TableOutcome::CleaningFailed { .. } => {
                summary_error_text("the table could not be cleaned")
            }
        }
    }
}

/// One entry of the response `tables` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableContent {
    pub table_index: usize,
    pub content: String,
    pub summary: String,
}

/// The JSON body returned by the upload endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResponse {
    pub message: String,
    pub num_tables: usize,
    pub tables: Vec<TableContent>,
}

/// Timing and count statistics for one processed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages rasterised for OCR; 0 when OCR is disabled.
    pub rendered_pages: usize,
    pub detected_tables: usize,
    pub summarized_tables: usize,
    pub failed_tables: usize,
    pub text_duration_ms: u64,
    pub render_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub table_duration_ms: u64,
    pub summary_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything the pipeline produced for one document.
///
/// The HTTP surface only exposes [`ExtractionReport::response`]; library and
/// CLI callers also get the full text layer, per-page OCR text and the typed
/// per-table outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub response: ExtractionResponse,
    /// Plain text of every page joined with `\n`.
    pub text: String,
    /// OCR text per rendered page; empty when OCR is disabled.
    pub ocr_pages: Vec<PageOcr>,
    pub outcomes: Vec<TableOutcome>,
    pub stats: ExtractionStats,
}

impl ExtractionReport {
    /// Every table that survived cleaning, in detection order.
    pub fn cleaned_tables(&self) -> Vec<&CleanedTable> {
        self.outcomes.iter().filter_map(TableOutcome::table).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaned(idx: usize, content: &str) -> CleanedTable {
        CleanedTable {
            table_index: idx,
            headers: vec!["a".into()],
            rows: vec![],
            content: content.into(),
        }
    }

    #[test]
    fn from_text_block_builds_single_column() {
        let t = RawTable::from_text_block("name\n alice\n\nbob");
        assert_eq!(t.headers, vec!["name"]);
        assert_eq!(
            t.rows,
            vec![
                vec![Some(" alice".to_string())],
                vec![None],
                vec![Some("bob".to_string())]
            ]
        );
    }

    #[test]
    fn from_text_block_of_empty_text_is_empty() {
        let t = RawTable::from_text_block("");
        assert_eq!(t.column_count(), 0);
        assert!(t.rows.is_empty());
    }

    #[test]
    fn cleaning_failure_renders_prefixed_content() {
        let o = TableOutcome::CleaningFailed {
            table_index: 3,
            error: TableError::Cleaning {
                table: 3,
                reason: "row 2 has 3 cells".into(),
            },
        };
        assert_eq!(o.table_index(), 3);
        assert!(!o.is_success());
        assert_eq!(o.content_text(), "Error cleaning table: row 2 has 3 cells");
        assert!(o.summary_text().starts_with("Unable to generate summary. Error:"));
    }

    #[test]
    fn summary_failure_keeps_table_content() {
        let o = TableOutcome::SummaryFailed {
            table: cleaned(1, "a\n1"),
            error: TableError::Summary {
                table: 1,
                reason: "HTTP 429".into(),
            },
        };
        assert_eq!(o.content_text(), "a\n1");
        assert_eq!(o.summary_text(), "Unable to generate summary. Error: HTTP 429");
    }

    #[test]
    fn outcome_serialises_with_status_tag() {
        let o = TableOutcome::Summarized {
            table: cleaned(1, "a"),
            summary: "one column".into(),
        };
        let json = serde_json::to_value(&o).unwrap();
        assert_eq!(json["status"], "summarized");
        assert_eq!(json["table"]["table_index"], 1);
    }
}

//! Prompt template and fixed response strings.
//!
//! Every string the pipeline shows to a model or returns verbatim to a client
//! lives here, so changing wording touches exactly one place.

/// Template for the per-table summary request. `{content}` is replaced with
/// the cleaned table text.
pub const SUMMARY_PROMPT_TEMPLATE: &str =
    "Summarize the following table content:\n\n{content}\n\nSummary:";

/// Returned without contacting the model when a table renders to nothing.
pub const EMPTY_TABLE_SUMMARY: &str = "The table is empty.";

/// Status message of a successful extraction.
pub const SUCCESS_MESSAGE: &str = "PDF processed successfully";

/// Prefix of the wire content of a table that failed to clean.
pub const CLEANING_ERROR_PREFIX: &str = "Error cleaning table:";

/// Prefix of the wire summary of a table whose summary failed.
pub const SUMMARY_ERROR_PREFIX: &str = "Unable to generate summary. Error:";

/// Aggregation failure detail.
pub const INVALID_TABLE_FORMAT: &str = "Invalid table format encountered.";

/// Build the summary prompt for one table.
pub fn summary_prompt(content: &str) -> String {
    SUMMARY_PROMPT_TEMPLATE.replace("{content}", content)
}

/// Wire text for a table that could not be cleaned.
pub fn cleaning_error_content(reason: &str) -> String {
    format!("{CLEANING_ERROR_PREFIX} {reason}")
}

/// Wire text for a table whose summary could not be produced.
pub fn summary_error_text(reason: &str) -> String {
    format!("{SUMMARY_ERROR_PREFIX} {reason}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_wraps_content() {
        assert_eq!(
            summary_prompt("a b\n1 2"),
            "Summarize the following table content:\n\na b\n1 2\n\nSummary:"
        );
    }

    #[test]
    fn error_strings_keep_prefixes() {
        assert!(cleaning_error_content("ragged row").starts_with("Error cleaning table:"));
        assert_eq!(
            summary_error_text("HTTP 500"),
            "Unable to generate summary. Error: HTTP 500"
        );
    }
}

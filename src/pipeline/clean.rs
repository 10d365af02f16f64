//! Table normalisation.
//!
//! Cleaning turns a [`RawTable`] into a [`CleanedTable`]:
//!
//! 1. rows whose cells are all missing are dropped, then columns whose cells
//!    are all missing (a table without data rows therefore loses every column);
//! 2. headers are trimmed and lower-cased, and a positional `unnamed:` header
//!    becomes `column_<i>`, where `i` is the column's position *before* any
//!    column was dropped;
//! 3. missing cells become empty strings;
//! 4. the table is rendered as right-aligned, space-separated text without a
//!    row-index column.
//!
//! Errors are per table: the caller records a [`TableError::Cleaning`] and
//! moves on to the next table.

use crate::error::TableError;
use crate::output::{CleanedTable, RawTable};
use tracing::debug;

/// Normalise one raw table. `table_index` is its 1-based detection position.
pub fn clean_table(raw: &RawTable, table_index: usize) -> Result<CleanedTable, TableError> {
    let width = raw.column_count();
    if let Some((row_no, row)) = raw.rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(TableError::Cleaning {
            table: table_index,
            reason: format!(
                "row {} has {} cells but the header has {}",
                row_no + 1,
                row.len(),
                width
            ),
        });
    }

    let rows: Vec<&Vec<Option<String>>> = raw
        .rows
        .iter()
        .filter(|row| row.iter().any(Option::is_some))
        .collect();

    // Original positions of the surviving columns.
    let kept: Vec<usize> = (0..width)
        .filter(|&col| rows.iter().any(|row| row[col].is_some()))
        .collect();

    let headers: Vec<String> = kept
        .iter()
        .map(|&col| normalize_header(&raw.headers[col], col))
        .collect();

    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            kept.iter()
                .map(|&col| row[col].clone().unwrap_or_default())
                .collect()
        })
        .collect();

    debug!(
        "Table {}: {}x{} raw -> {}x{} cleaned",
        table_index,
        raw.rows.len(),
        width,
        rows.len(),
        headers.len()
    );

    let content = render_table(&headers, &rows);
    Ok(CleanedTable {
        table_index,
        headers,
        rows,
        content,
    })
}

/// Trim and lower-case a header; positional placeholders get `column_<position>`.
pub fn normalize_header(header: &str, position: usize) -> String {
    let name = header.trim().to_lowercase();
    if name.starts_with("unnamed:") {
        format!("column_{position}")
    } else {
        name
    }
}

/// Render headers and rows as a whitespace-aligned block.
///
/// Every column is right-aligned to its widest cell (header included),
/// columns are separated by one space and lines by `\n`. A table without
/// rows or without columns renders as the empty string.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    if headers.is_empty() || rows.is_empty() {
        return String::new();
    }

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(col, h)| {
            rows.iter()
                .map(|row| row[col].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    std::iter::once(headers)
        .chain(rows.iter().map(Vec::as_slice))
        .map(|cells| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, &w)| format!("{cell:>w$}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn drops_empty_rows_and_columns() {
        let raw = RawTable::new(
            vec!["Year".into(), "Notes".into(), "Sales".into()],
            vec![
                vec![s("2023"), None, s("12")],
                vec![None, None, None],
                vec![s("2024"), None, s("7")],
            ],
        );
        let t = clean_table(&raw, 1).unwrap();
        assert_eq!(t.headers, vec!["year", "sales"]);
        assert_eq!(t.rows, vec![vec!["2023", "12"], vec!["2024", "7"]]);
        assert_eq!(t.content, "year sales\n2023    12\n2024     7");
    }

    #[test]
    fn two_by_two_with_empty_row_keeps_one_data_row() {
        let raw = RawTable::new(
            vec!["a".into(), "b".into()],
            vec![vec![s("1"), s("2")], vec![None, None]],
        );
        let t = clean_table(&raw, 1).unwrap();
        assert_eq!(t.rows.len(), 1);
        assert!(!t.is_blank());
        assert_eq!(t.content.lines().count(), 2);
    }

    #[test]
    fn unnamed_header_uses_original_position() {
        let raw = RawTable::new(
            vec!["A".into(), "Unnamed: 1".into(), "C".into()],
            vec![vec![s("x"), s("y"), s("z")]],
        );
        let t = clean_table(&raw, 1).unwrap();
        assert_eq!(t.headers, vec!["a", "column_1", "c"]);
    }

    #[test]
    fn unnamed_position_counts_dropped_columns() {
        let raw = RawTable::new(
            vec!["Empty".into(), "Unnamed: 1".into(), " Total ".into()],
            vec![vec![None, s("y"), s("9")]],
        );
        let t = clean_table(&raw, 4).unwrap();
        assert_eq!(t.table_index, 4);
        assert_eq!(t.headers, vec!["column_1", "total"]);
    }

    #[test]
    fn missing_cells_become_blank() {
        let raw = RawTable::new(
            vec!["k".into(), "v".into()],
            vec![vec![s("a"), None], vec![None, s("b")]],
        );
        let t = clean_table(&raw, 1).unwrap();
        assert_eq!(t.rows, vec![vec!["a", ""], vec!["", "b"]]);
        assert_eq!(t.content, "k v\na  \n  b");
    }

    #[test]
    fn table_without_data_renders_empty() {
        let raw = RawTable::new(vec!["a".into(), "b".into()], vec![vec![None, None]]);
        let t = clean_table(&raw, 2).unwrap();
        assert!(t.headers.is_empty());
        assert!(t.rows.is_empty());
        assert_eq!(t.content, "");
        assert!(t.is_blank());

        let t = clean_table(&RawTable::default(), 3).unwrap();
        assert_eq!(t.content, "");
    }

    #[test]
    fn ragged_row_is_a_cleaning_error() {
        let raw = RawTable::new(
            vec!["a".into(), "b".into()],
            vec![vec![s("1"), s("2")], vec![s("3")]],
        );
        let err = clean_table(&raw, 5).unwrap_err();
        match err {
            TableError::Cleaning { table, reason } => {
                assert_eq!(table, 5);
                assert!(reason.contains("row 2"), "got: {reason}");
            }
            other => panic!("expected Cleaning, got {other:?}"),
        }
    }

    #[test]
    fn recleaning_rendered_text_does_not_fail() {
        let raw = RawTable::new(
            vec!["Name".into(), "Unnamed: 1".into()],
            vec![vec![s("alice"), s("10")], vec![None, None], vec![s("bob"), None]],
        );
        let first = clean_table(&raw, 1).unwrap();
        let again = clean_table(&RawTable::from_text_block(&first.content), 1).unwrap();
        assert_eq!(again.headers.len(), 1);
        assert_eq!(again.rows.len(), 2);

        let third = clean_table(&RawTable::from_text_block(&again.content), 1);
        assert!(third.is_ok());
    }

    #[test]
    fn alignment_counts_characters_not_bytes() {
        let headers = vec!["ville".to_string(), "n".to_string()];
        let rows = vec![vec!["Zürich".to_string(), "3".to_string()]];
        assert_eq!(render_table(&headers, &rows), " ville n\nZürich 3");
    }
}

//! Table detection via tabula-java.
//!
//! tabula runs on the JVM, so the Java runtime plus the tabula jar form a
//! "runtime bridge" that may simply be missing from a deployment. That case
//! is reported as [`PdfTablesError::Dependency`] so operators can tell an
//! installation problem from a document the engine cannot read
//! ([`PdfTablesError::Extraction`]).
//!
//! The engine is asked for JSON (`--format JSON`) over all pages with
//! `--guess`, which returns one entry per detected table in detection order:
//!
//! ```text
//! [{"extraction_method": "lattice", ..., "data": [[{"text": "Year"}, ...], ...]}]
//! ```

use crate::error::PdfTablesError;
use crate::output::RawTable;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

const BRIDGE: &str = "tabula-java (Java runtime bridge)";

/// Tabular extraction collaborator.
#[async_trait]
pub trait TableExtractor: Send + Sync {
    /// Every table of the document, in detection order.
    async fn extract(&self, pdf_path: &Path) -> Result<Vec<RawTable>, PdfTablesError>;
}

/// [`TableExtractor`] running the tabula-java CLI.
#[derive(Debug, Clone)]
pub struct TabulaExtractor {
    java_cmd: PathBuf,
    jar: PathBuf,
    timeout_secs: u64,
}

impl TabulaExtractor {
    pub fn new(java_cmd: impl Into<PathBuf>, jar: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            java_cmd: java_cmd.into(),
            jar: jar.into(),
            timeout_secs,
        }
    }
}

#[async_trait]
impl TableExtractor for TabulaExtractor {
    async fn extract(&self, pdf_path: &Path) -> Result<Vec<RawTable>, PdfTablesError> {
        if !self.jar.is_file() {
            warn!("tabula jar not found at {}", self.jar.display());
            return Err(PdfTablesError::Dependency {
                bridge: BRIDGE.to_string(),
                detail: format!("tabula jar not found at '{}'", self.jar.display()),
            });
        }

        let mut cmd = Command::new(&self.java_cmd);
        cmd.arg("-Dfile.encoding=UTF8")
            .arg("-jar")
            .arg(&self.jar)
            .args(["--pages", "all", "--guess", "--format", "JSON"])
            .arg(pdf_path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(Duration::from_secs(self.timeout_secs), cmd.output())
            .await
        {
            Err(_) => {
                return Err(PdfTablesError::Timeout {
                    step: "tabula table extraction".to_string(),
                    secs: self.timeout_secs,
                })
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Java runtime not found at {}", self.java_cmd.display());
                return Err(PdfTablesError::Dependency {
                    bridge: BRIDGE.to_string(),
                    detail: format!("'{}' not found: {e}", self.java_cmd.display()),
                });
            }
            Ok(Err(e)) => {
                return Err(PdfTablesError::Extraction(format!("cannot run tabula: {e}")))
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(stderr.trim()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let tables = parse_tabula_json(&stdout)?;
        info!("Extracted {} tables from the PDF", tables.len());
        Ok(tables)
    }
}

/// Decide whether a failed tabula run is a broken bridge or a bad document.
pub fn classify_failure(stderr: &str) -> PdfTablesError {
    const BRIDGE_MARKERS: [&str; 4] = [
        "Unable to access jarfile",
        "UnsupportedClassVersionError",
        "NoClassDefFoundError",
        "Could not find or load main class",
    ];
    if BRIDGE_MARKERS.iter().any(|m| stderr.contains(m)) {
        PdfTablesError::Dependency {
            bridge: BRIDGE.to_string(),
            detail: first_line(stderr).to_string(),
        }
    } else {
        PdfTablesError::Extraction(format!("tabula failed: {}", first_line(stderr)))
    }
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or("")
}

#[derive(Debug, Deserialize)]
struct TabulaTable {
    #[serde(default)]
    data: Vec<Vec<TabulaCell>>,
}

#[derive(Debug, Deserialize)]
struct TabulaCell {
    #[serde(default)]
    text: String,
}

/// Parse tabula's JSON output into raw tables.
pub fn parse_tabula_json(json: &str) -> Result<Vec<RawTable>, PdfTablesError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let tables: Vec<TabulaTable> = serde_json::from_str(json)
        .map_err(|e| PdfTablesError::Extraction(format!("unreadable tabula output: {e}")))?;

    Ok(tables
        .into_iter()
        .map(|t| {
            let grid = t
                .data
                .into_iter()
                .map(|row| row.into_iter().map(|c| c.text).collect())
                .collect();
            raw_table_from_grid(grid)
        })
        .collect())
}

/// Turn a grid of cell texts into a [`RawTable`].
///
/// The first row becomes the header row; a blank header at position `i` is
/// named `Unnamed: i`. Empty cell text is a missing value.
pub fn raw_table_from_grid(grid: Vec<Vec<String>>) -> RawTable {
    let mut rows = grid.into_iter();
    let Some(header_row) = rows.next() else {
        return RawTable::default();
    };

    let headers = header_row
        .into_iter()
        .enumerate()
        .map(|(i, h)| if h.is_empty() { format!("Unnamed: {i}") } else { h })
        .collect::<Vec<_>>();

    let rows = rows
        .map(|row| {
            row.into_iter()
                .map(|c| if c.is_empty() { None } else { Some(c) })
                .collect()
        })
        .collect::<Vec<_>>();

    debug!("Raw table: {} columns, {} rows", headers.len(), rows.len());
    RawTable::new(headers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
      {"extraction_method":"lattice","top":10.0,"left":5.0,"width":200.0,"height":50.0,
       "data":[
         [{"top":10.0,"left":5.0,"width":50.0,"height":10.0,"text":"Year"},
          {"top":10.0,"left":55.0,"width":50.0,"height":10.0,"text":""}],
         [{"text":"2023"},{"text":"12"}],
         [{"text":""},{"text":""}]
       ]},
      {"extraction_method":"stream","data":[]}
    ]"#;

    #[test]
    fn parses_tables_in_detection_order() {
        let tables = parse_tabula_json(SAMPLE).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].headers, vec!["Year", "Unnamed: 1"]);
        assert_eq!(
            tables[0].rows,
            vec![
                vec![Some("2023".to_string()), Some("12".to_string())],
                vec![None, None],
            ]
        );
        assert_eq!(tables[1], RawTable::default());
    }

    #[test]
    fn empty_output_means_no_tables() {
        assert!(parse_tabula_json("").unwrap().is_empty());
        assert!(parse_tabula_json("[]").unwrap().is_empty());
    }

    #[test]
    fn garbage_output_is_extraction_error() {
        let err = parse_tabula_json("Exception in thread main").unwrap_err();
        assert!(matches!(err, PdfTablesError::Extraction(_)));
    }

    #[test]
    fn jar_access_failure_is_dependency_error() {
        let err = classify_failure("Error: Unable to access jarfile /opt/tabula.jar");
        assert!(matches!(err, PdfTablesError::Dependency { .. }));
        let err = classify_failure("java.io.IOException: Error: End-of-File, expected line");
        assert!(matches!(err, PdfTablesError::Extraction(_)));
    }

    #[tokio::test]
    async fn missing_jar_is_dependency_error() {
        let extractor = TabulaExtractor::new("java", "/definitely/not/tabula.jar", 5);
        let err = extractor.extract(Path::new("/tmp/x.pdf")).await.unwrap_err();
        assert!(err.is_missing_dependency());
        assert!(err.to_string().contains("tabula"));
    }

    #[tokio::test]
    async fn missing_java_is_dependency_error() {
        let jar = tempfile::NamedTempFile::new().unwrap();
        let extractor = TabulaExtractor::new("/definitely/not/java", jar.path(), 5);
        let err = extractor.extract(Path::new("/tmp/x.pdf")).await.unwrap_err();
        match err {
            PdfTablesError::Dependency { bridge, detail } => {
                assert!(bridge.contains("Java"));
                assert!(detail.contains("not found"));
            }
            other => panic!("expected Dependency, got {other:?}"),
        }
    }
}

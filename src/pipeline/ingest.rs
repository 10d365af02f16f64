//! Document ingestion: persist uploaded PDF bytes to a scoped temp file.
//!
//! pdfium, tesseract and tabula all want a file-system path, so the upload is
//! written to a uniquely named `NamedTempFile`. The file lives exactly as long
//! as the [`UploadedDocument`] and is removed when it is dropped, whether the
//! request succeeded, failed, or panicked. The bytes are not validated here;
//! a malformed PDF is reported by the first extractor that opens it.

use crate::error::PdfTablesError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// An uploaded PDF persisted to a temporary file.
#[derive(Debug)]
pub struct UploadedDocument {
    file: NamedTempFile,
    len: usize,
}

impl UploadedDocument {
    /// Write `bytes` to a fresh `pdftables-*.pdf` temp file.
    pub fn persist(bytes: &[u8]) -> Result<Self, PdfTablesError> {
        let mut file = tempfile::Builder::new()
            .prefix("pdftables-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| PdfTablesError::Internal(format!("tempfile: {e}")))?;
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| PdfTablesError::Internal(format!("tempfile write: {e}")))?;

        debug!(
            "Persisted upload ({} bytes) to {}",
            bytes.len(),
            file.path().display()
        );
        Ok(Self {
            file,
            len: bytes.len(),
        })
    }

    /// Path of the temporary PDF.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of bytes written.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_writes_bytes_with_pdf_suffix() {
        let doc = UploadedDocument::persist(b"%PDF-1.7\n").unwrap();
        assert!(doc.path().exists());
        assert_eq!(doc.path().extension().and_then(|e| e.to_str()), Some("pdf"));
        assert_eq!(std::fs::read(doc.path()).unwrap(), b"%PDF-1.7\n");
        assert_eq!(doc.len(), 9);
    }

    #[test]
    fn drop_removes_file() {
        let doc = UploadedDocument::persist(b"not even a pdf").unwrap();
        let path = doc.path().to_path_buf();
        assert!(path.exists());
        drop(doc);
        assert!(!path.exists());
    }

    #[test]
    fn each_upload_gets_its_own_file() {
        let a = UploadedDocument::persist(b"a").unwrap();
        let b = UploadedDocument::persist(b"b").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn empty_upload_is_accepted() {
        let doc = UploadedDocument::persist(b"").unwrap();
        assert!(doc.is_empty());
        assert!(doc.path().exists());
    }
}

//! Input checks: reject obviously wrong bytes before any engine sees them.
//!
//! OCR engines are expensive to invoke and produce unhelpful errors for
//! non-PDF input, so the `%PDF` signature is checked up front. The same
//! check guards the CLI's local-file path.

use crate::error::ExtractionError;
use std::path::Path;
use tracing::debug;

/// Signature every PDF file starts with.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Validate that `bytes` looks like a PDF.
///
/// Empty input is its own error so callers can tell "no body" from
/// "wrong body".
pub fn check_pdf_bytes(bytes: &[u8]) -> Result<(), ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::EmptyDocument);
    }
    if !bytes.starts_with(PDF_MAGIC) {
        let magic = bytes.iter().take(PDF_MAGIC.len()).copied().collect();
        return Err(ExtractionError::NotAPdf { magic });
    }
    Ok(())
}

/// Read a local PDF file, mapping I/O failures to extraction errors.
pub async fn read_pdf_file(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ExtractionError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => ExtractionError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ExtractionError::Internal(format!("Failed to read {}: {}", path.display(), e)),
    })?;
    check_pdf_bytes(&bytes)?;
    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

//! Error types for the edgequake-ocr2json library.
//!
//! Each pipeline stage owns a closed error enum:
//!
//! * [`ExtractionError`]: the document could not be turned into a transcript
//!   (empty body, not a PDF, corrupt file, OCR engine failure).
//! * [`StructuringError`]: the LLM call that turns a transcript into JSON
//!   failed (provider missing, API error, timeout, invalid JSON in
//!   `validate` mode).
//! * [`ConfigError`]: the service configuration was rejected at startup.
//!
//! [`Ocr2JsonError`] wraps the two request-time errors so the pipeline can
//! propagate either with `?`. The HTTP boundary renders every variant the
//! same way: status 500 with the Display text as the `error` field.
//! [`ConfigError`] only occurs before the server starts.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error returned by the full extraction pipeline.
#[derive(Debug, Error)]
pub enum Ocr2JsonError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Structuring(#[from] StructuringError),
}

/// Failure while turning raw document bytes into a transcript.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The request body was empty.
    #[error("Document is empty: expected PDF bytes in the request body")]
    EmptyDocument,

    /// The bytes do not start with the `%PDF` signature.
    #[error("Document is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// Local input file was not found (CLI only).
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file (CLI only).
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// pdfium could not parse the document.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none (or the wrong one) was configured.
    #[error("PDF is encrypted and the configured password is missing or wrong")]
    PasswordRequired,

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    /// The vision model could not transcribe a page.
    #[error("OCR failed for page {page}: {detail}")]
    PageTranscriptionFailed { page: usize, detail: String },

    /// The remote OCR service rejected the request or returned garbage.
    #[error("Remote OCR service error: {0}")]
    Remote(String),

    /// The OCR engine could not be constructed.
    #[error("OCR engine initialisation failed: {0}")]
    EngineInit(String),

    #[error("Internal extraction error: {0}")]
    Internal(String),
}

/// Failure while asking the LLM to structure a transcript.
#[derive(Debug, Error)]
pub enum StructuringError {
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The LLM call did not complete within the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// `validate` mode only: the reply did not parse as a JSON object.
    #[error("LLM reply is not a valid JSON object: {detail}")]
    InvalidJson { detail: String },
}

/// Configuration rejected by [`crate::config::ServiceConfigBuilder::build`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

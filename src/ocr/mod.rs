//! OCR engines: turn PDF bytes into a [`RecognizedDocument`].
//!
//! The rest of the crate only sees the [`OcrEngine`] trait, so the engine can
//! be swapped by configuration (or replaced by a fake in tests) without
//! touching extraction or the HTTP layer.
//!
//! | Engine | How it reads pages |
//! |--------|--------------------|
//! | [`vision::VisionOcrEngine`] | pdfium rasterisation + vision LLM transcription |
//! | [`remote::RemoteOcrEngine`] | docTR-compatible HTTP OCR service |

pub mod model;
pub mod remote;
pub mod vision;

pub use model::{
    RecognizedBlock, RecognizedDocument, RecognizedLine, RecognizedPage, RecognizedWord,
    Transcript,
};

use crate::error::ExtractionError;
use async_trait::async_trait;

/// A recogniser for whole PDF documents.
///
/// Implementations are constructed once per process and shared across
/// requests, so `recognize` takes `&self` and must be safe to call
/// concurrently.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short identifier used in logs (e.g. "vision", "remote").
    fn name(&self) -> &'static str;

    /// Recognise every page of `pdf`, preserving page → block → line → word order.
    async fn recognize(&self, pdf: &[u8]) -> Result<RecognizedDocument, ExtractionError>;
}

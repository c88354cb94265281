//! # edgequake-ocr2json
//!
//! Turn invoice and logistics PDFs into structured JSON: OCR the document,
//! then ask an LLM to map the transcript onto a JSON shape.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST /extract-binary (raw PDF bytes)
//!  │
//!  ├─ 1. Check     non-empty, starts with %PDF
//!  ├─ 2. OCR       singleton engine → pages / blocks / lines / words
//!  ├─ 3. Serialise one line per recognised line, words joined by spaces
//!  ├─ 4. Structure system prompt + "Extract structured JSON data…" + transcript
//!  └─ 5. Respond   200 "<result as JSON string>" or 500 {"error": …}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_ocr2json::{serve, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ServiceConfig::builder().max_retries(2).build()?;
//!     serve(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## OCR Engines
//!
//! | Backend | Needs |
//! |---------|-------|
//! | `OcrBackend::Vision` (default) | libpdfium + a vision-capable LLM provider |
//! | `OcrBackend::Remote { url, .. }` | a docTR-compatible OCR service |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr2json` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod ocr;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod structure;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OcrBackend, ResponseMode, ServiceConfig, ServiceConfigBuilder};
pub use error::{ConfigError, ExtractionError, Ocr2JsonError, StructuringError};
pub use extract::TextExtractor;
pub use ocr::{OcrEngine, RecognizedDocument, Transcript};
pub use pipeline::llm::{ChatBackend, ChatReply, ChatRequest};
pub use server::{router, run_pipeline, serve, AppState};
pub use structure::Structurer;

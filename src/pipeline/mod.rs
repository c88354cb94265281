//! Building blocks shared by the OCR engines and the structurer.
//!
//! ```text
//! input ──▶ render ──▶ llm ──▶ postprocess
//! (checks)  (pdfium)   (chat)  (cleanup / JSON check)
//! ```
//!
//! 1. [`input`]: reject empty or non-PDF bytes; read local files for the CLI
//! 2. [`render`]: rasterise pages; blocking, so callers use `spawn_blocking`
//! 3. [`llm`]: the [`llm::ChatBackend`] seam and its `edgequake-llm` provider
//! 4. [`postprocess`]: deterministic cleanup of model output

pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;

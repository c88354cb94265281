//! Text Extractor: PDF bytes → [`Transcript`].
//!
//! The OCR engine is the expensive part of the pipeline (library binding,
//! provider setup, HTTP client pools), so the extractor builds it once per
//! process, on first use, behind a [`tokio::sync::OnceCell`]. Requests that
//! arrive while initialisation is running wait for it instead of building
//! their own engine. A failed initialisation leaves the cell empty so the next
//! request tries again.

use crate::config::{OcrBackend, ServiceConfig};
use crate::error::ExtractionError;
use crate::ocr::remote::{RemoteOcrConfig, RemoteOcrEngine};
use crate::ocr::vision::VisionOcrEngine;
use crate::ocr::{OcrEngine, Transcript};
use crate::pipeline::input::check_pdf_bytes;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, info};

type EngineFuture = BoxFuture<'static, Result<Arc<dyn OcrEngine>, ExtractionError>>;

/// Constructs the OCR engine; called until it first succeeds.
type EngineBuilder = Arc<dyn Fn() -> EngineFuture + Send + Sync>;

pub struct TextExtractor {
    builder: EngineBuilder,
    engine: OnceCell<Arc<dyn OcrEngine>>,
}

impl TextExtractor {
    /// Extractor whose engine is built from `config` on first use.
    pub fn new(config: ServiceConfig) -> Self {
        let config = Arc::new(config);
        Self::with_builder(move || {
            let config = Arc::clone(&config);
            async move { build_engine(&config).await }
        })
    }

    /// Extractor whose engine comes from `builder` on first use.
    pub fn with_builder<F, Fut>(builder: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn OcrEngine>, ExtractionError>> + Send + 'static,
    {
        Self {
            builder: Arc::new(move || -> EngineFuture { Box::pin(builder()) }),
            engine: OnceCell::new(),
        }
    }

    /// Extractor around an already-constructed engine.
    pub fn with_engine(engine: Arc<dyn OcrEngine>) -> Self {
        let fallback = Arc::clone(&engine);
        Self {
            builder: Arc::new(move || -> EngineFuture {
                let engine = Arc::clone(&fallback);
                Box::pin(async move { Ok(engine) })
            }),
            engine: OnceCell::new_with(Some(engine)),
        }
    }

    /// Whether the engine has been built yet.
    pub fn is_initialised(&self) -> bool {
        self.engine.initialized()
    }

    /// The shared engine, building it on first call.
    pub async fn engine(&self) -> Result<&Arc<dyn OcrEngine>, ExtractionError> {
        self.engine.get_or_try_init(|| (self.builder)()).await
    }

    /// Run OCR on `document` and serialise the result.
    pub async fn extract(&self, document: &[u8]) -> Result<Transcript, ExtractionError> {
        check_pdf_bytes(document)?;

        let engine = self.engine().await?;
        let start = Instant::now();
        let recognized = engine.recognize(document).await?;
        let transcript = Transcript::from_document(&recognized);

        info!(
            "Extracted {} pages / {} lines with '{}' engine in {}ms",
            recognized.pages.len(),
            recognized.line_count(),
            engine.name(),
            start.elapsed().as_millis()
        );
        debug!("Transcript is {} bytes", transcript.as_str().len());
        Ok(transcript)
    }
}

async fn build_engine(config: &ServiceConfig) -> Result<Arc<dyn OcrEngine>, ExtractionError> {
    let engine: Arc<dyn OcrEngine> = match config.ocr_backend {
        OcrBackend::Vision => {
            info!("Initialising vision OCR engine");
            Arc::new(VisionOcrEngine::from_config(config).await?)
        }
        OcrBackend::Remote {
            ref url,
            ref api_key,
            timeout_secs,
        } => {
            info!("Initialising remote OCR engine ({})", url);
            Arc::new(RemoteOcrEngine::new(RemoteOcrConfig {
                url: url.clone(),
                api_key: api_key.clone(),
                timeout_secs,
            })?)
        }
    };
    Ok(engine)
}

//! Configuration types for the OCR-to-JSON service.
//!
//! Every knob lives in [`ServiceConfig`], built via its
//! [`ServiceConfigBuilder`]. One struct covers the HTTP layer, the OCR engine
//! and the structuring LLM so the binary can map flags onto it in one place
//! and tests can override exactly the fields they care about.

use crate::error::ConfigError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used for structuring when none is configured.
pub const DEFAULT_STRUCTURING_MODEL: &str = "gpt-4";

/// Vision model used by [`OcrBackend::Vision`] when none is configured.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4.1-nano";

/// Configuration for the extraction service.
///
/// Built via [`ServiceConfig::builder()`] or [`ServiceConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_ocr2json::{ResponseMode, ServiceConfig};
///
/// let config = ServiceConfig::builder()
///     .model("gpt-4.1-mini")
///     .max_retries(2)
///     .response_mode(ResponseMode::Validate)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to. Default: `0.0.0.0:8000`.
    pub bind_addr: SocketAddr,

    /// Largest request body accepted by `POST /extract-binary`. Default: 64 MiB.
    pub max_body_bytes: usize,

    /// Which OCR engine turns PDF bytes into recognised text. Default: [`OcrBackend::Vision`].
    pub ocr_backend: OcrBackend,

    /// Provider name for the vision OCR engine. If None, the structuring
    /// provider resolution chain is used.
    pub vision_provider_name: Option<String>,

    /// Vision model for the OCR engine. Default: `gpt-4.1-nano`.
    pub vision_model: String,

    /// Pre-constructed provider for the vision OCR engine.
    pub vision_provider: Option<Arc<dyn LLMProvider>>,

    /// Number of pages transcribed concurrently by the vision engine. Default: 4.
    pub ocr_concurrency: usize,

    /// Longest edge of a rendered page in pixels. Default: 2000.
    ///
    /// Caps memory for oversized pages independently of the physical page size.
    pub max_rendered_pixels: u32,

    /// Password for encrypted PDFs.
    pub pdf_password: Option<String>,

    /// Explicit path to libpdfium. `PDFIUM_LIB_PATH` takes precedence.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Structuring LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Structuring LLM model. If None, uses `gpt-4`.
    pub model: Option<String>,

    /// Pre-constructed structuring provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for structuring. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the structuring LLM may generate. Default: 4096.
    pub max_tokens: usize,

    /// Retries after a failed structuring call. Default: 0 (fail immediately).
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-LLM-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Whether the structuring reply is passed through or validated. Default: passthrough.
    pub response_mode: ResponseMode,

    /// Custom structuring system prompt. If None, uses the built-in invoice example.
    pub system_prompt: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_body_bytes: 64 * 1024 * 1024,
            ocr_backend: OcrBackend::default(),
            vision_provider_name: None,
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            vision_provider: None,
            ocr_concurrency: 4,
            max_rendered_pixels: 2000,
            pdf_password: None,
            pdfium_lib_path: None,
            provider_name: None,
            model: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 0,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            response_mode: ResponseMode::default(),
            system_prompt: None,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("bind_addr", &self.bind_addr)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("ocr_backend", &self.ocr_backend)
            .field("vision_provider_name", &self.vision_provider_name)
            .field("vision_model", &self.vision_model)
            .field(
                "vision_provider",
                &self.vision_provider.as_ref().map(|_| "<dyn LLMProvider>"),
            )
            .field("ocr_concurrency", &self.ocr_concurrency)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("response_mode", &self.response_mode)
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// The structuring model, falling back to [`DEFAULT_STRUCTURING_MODEL`].
    pub fn structuring_model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_STRUCTURING_MODEL)
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    pub fn max_body_bytes(mut self, n: usize) -> Self {
        self.config.max_body_bytes = n;
        self
    }

    pub fn ocr_backend(mut self, backend: OcrBackend) -> Self {
        self.config.ocr_backend = backend;
        self
    }

    pub fn vision_provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.vision_provider_name = Some(name.into());
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_model = model.into();
        self
    }

    pub fn vision_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.vision_provider = Some(provider);
        self
    }

    pub fn ocr_concurrency(mut self, n: usize) -> Self {
        self.config.ocr_concurrency = n.max(1);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdf_password(mut self, pwd: impl Into<String>) -> Self {
        self.config.pdf_password = Some(pwd.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn response_mode(mut self, mode: ResponseMode) -> Self {
        self.config.response_mode = mode;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, ConfigError> {
        let c = &self.config;
        if c.max_body_bytes == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_body_bytes must be > 0".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(ConfigError::InvalidConfig("max_tokens must be > 0".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "api_timeout_secs must be > 0".into(),
            ));
        }
        if let OcrBackend::Remote { ref url, .. } = c.ocr_backend {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidConfig(format!(
                    "Remote OCR url must be http(s), got '{url}'"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which engine performs optical character recognition.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OcrBackend {
    /// Rasterise pages with pdfium and transcribe them with a vision LLM. (default)
    #[default]
    Vision,
    /// POST the PDF to a docTR-compatible OCR service that answers with the
    /// `pages → blocks → lines → words` export JSON.
    Remote {
        url: String,
        api_key: Option<String>,
        timeout_secs: u64,
    },
}

impl fmt::Debug for OcrBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vision => f.write_str("Vision"),
            Self::Remote {
                url,
                api_key,
                timeout_secs,
            } => f
                .debug_struct("Remote")
                .field("url", url)
                .field("api_key", &api_key.as_ref().map(|_| "<redacted>"))
                .field("timeout_secs", timeout_secs)
                .finish(),
        }
    }
}

/// What the structurer does with the LLM reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResponseMode {
    /// Return the reply verbatim, whatever it contains. (default)
    #[default]
    Passthrough,
    /// Strip an outer code fence and require a JSON object; anything else is
    /// a [`crate::error::StructuringError::InvalidJson`].
    Validate,
}

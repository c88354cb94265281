//! LLM interaction: the [`ChatBackend`] seam and its `edgequake-llm` implementation.
//!
//! Both the vision OCR engine and the structurer talk to a model through
//! [`ChatBackend`], which takes one system instruction, one user instruction
//! (optionally with page images) and returns the first completion. Keeping the
//! seam this narrow means the pipeline never depends on provider-specific
//! message types, and tests can record exactly what would have been sent.
//!
//! [`ProviderBackend`] resolves its `edgequake-llm` provider lazily, on the
//! first call, behind a one-time async guard. A missing API key therefore
//! fails the call that needed it instead of the process start, and a failed
//! resolution is retried on the next call rather than cached.

use crate::error::StructuringError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

/// One system + one user instruction for a single completion.
#[derive(Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    /// Images attached to the user message (vision OCR only).
    pub images: Vec<ImageData>,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl fmt::Debug for ChatRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatRequest")
            .field("system_len", &self.system.len())
            .field("user_len", &self.user.len())
            .field("images", &self.images.len())
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Text of the first completion choice plus token accounting.
#[derive(Debug, Clone, Default)]
pub struct ChatReply {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// The minimal chat surface the pipeline needs from an LLM.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, StructuringError>;
}

/// Where a [`ProviderBackend`] gets its provider from.
#[derive(Clone)]
pub enum ProviderSource {
    /// Caller-constructed provider, used as-is.
    Prebuilt(Arc<dyn LLMProvider>),
    /// `ProviderFactory::create_llm_provider(name, model)`.
    Named { name: String, model: String },
    /// Environment auto-detection; `model` is used when a provider is picked
    /// by API key rather than by `EDGEQUAKE_MODEL`.
    Auto { model: String },
}

impl ProviderSource {
    /// Pick a source from the optional pieces of a config.
    pub fn from_parts(
        provider: Option<&Arc<dyn LLMProvider>>,
        provider_name: Option<&str>,
        model: &str,
    ) -> Self {
        if let Some(p) = provider {
            return Self::Prebuilt(Arc::clone(p));
        }
        match provider_name {
            Some(name) => Self::Named {
                name: name.to_string(),
                model: model.to_string(),
            },
            None => Self::Auto {
                model: model.to_string(),
            },
        }
    }
}

/// [`ChatBackend`] over an `edgequake-llm` provider.
pub struct ProviderBackend {
    source: ProviderSource,
    provider: OnceCell<Arc<dyn LLMProvider>>,
    call_timeout: Duration,
}

impl ProviderBackend {
    pub fn new(source: ProviderSource, call_timeout: Duration) -> Self {
        Self {
            source,
            provider: OnceCell::new(),
            call_timeout,
        }
    }

    async fn provider(&self) -> Result<&Arc<dyn LLMProvider>, StructuringError> {
        self.provider
            .get_or_try_init(|| async { resolve_provider(&self.source) })
            .await
    }
}

#[async_trait]
impl ChatBackend for ProviderBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, StructuringError> {
        let provider = self.provider().await?;

        let user = if request.images.is_empty() {
            ChatMessage::user(&request.user)
        } else {
            ChatMessage::user_with_images(&request.user, request.images.clone())
        };
        let messages = vec![ChatMessage::system(&request.system), user];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let start = Instant::now();
        let response = timeout(self.call_timeout, provider.chat(&messages, Some(&options)))
            .await
            .map_err(|_| StructuringError::Timeout {
                secs: self.call_timeout.as_secs(),
            })?
            .map_err(|e| StructuringError::LlmApiError {
                message: format!("{}", e),
            })?;

        debug!(
            "LLM call: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(ChatReply {
            content: response.content,
            prompt_tokens: response.prompt_tokens as usize,
            completion_tokens: response.completion_tokens as usize,
        })
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, StructuringError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        StructuringError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve a provider, from most-specific to least-specific:
///
/// 1. pre-built provider
/// 2. named provider + model
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 4. `OPENAI_API_KEY` present → openai with the configured model
/// 5. `ProviderFactory::from_env()`
fn resolve_provider(source: &ProviderSource) -> Result<Arc<dyn LLMProvider>, StructuringError> {
    let model = match source {
        ProviderSource::Prebuilt(provider) => return Ok(Arc::clone(provider)),
        ProviderSource::Named { name, model } => {
            info!("Using LLM provider '{}' with model '{}'", name, model);
            return create_provider(name, model);
        }
        ProviderSource::Auto { model } => model,
    };

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            info!("Using LLM provider '{}' with model '{}' from environment", prov, env_model);
            return create_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            info!("Using LLM provider 'openai' with model '{}'", model);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| StructuringError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_prefers_named_over_auto() {
        match ProviderSource::from_parts(None, Some("anthropic"), "claude-sonnet-4-20250514") {
            ProviderSource::Named { name, model } => {
                assert_eq!(name, "anthropic");
                assert_eq!(model, "claude-sonnet-4-20250514");
            }
            _ => panic!("expected a named source"),
        }
    }

    #[test]
    fn source_falls_back_to_auto() {
        match ProviderSource::from_parts(None, None, "gpt-4") {
            ProviderSource::Auto { model } => assert_eq!(model, "gpt-4"),
            _ => panic!("expected an auto source"),
        }
    }
}

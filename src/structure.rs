//! Structurer: transcript → JSON text via one chat completion.
//!
//! Each call sends exactly two messages: the system prompt (the built-in
//! invoice example unless overridden) and a user message made of
//! [`STRUCTURING_USER_PREAMBLE`](crate::prompts::STRUCTURING_USER_PREAMBLE)
//! followed by the transcript. The reply text is returned as-is in
//! [`ResponseMode::Passthrough`]; [`ResponseMode::Validate`] strips an outer
//! code fence and insists on a JSON object.
//!
//! Failed calls are retried `max_retries` times with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`). A provider that cannot be resolved is
//! never retried.

use crate::config::{ResponseMode, ServiceConfig};
use crate::error::StructuringError;
use crate::pipeline::llm::{ChatBackend, ChatRequest, ProviderBackend, ProviderSource};
use crate::pipeline::postprocess::validate_json_object;
use crate::prompts::{structuring_user_message, DEFAULT_STRUCTURING_PROMPT};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Upper bound on a single retry delay.
const MAX_BACKOFF_MS: u64 = 60_000;

pub struct Structurer {
    backend: Arc<dyn ChatBackend>,
    system_prompt: String,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    response_mode: ResponseMode,
}

impl Structurer {
    /// Structurer backed by the configured `edgequake-llm` provider.
    ///
    /// The provider itself is resolved on the first call.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let source = ProviderSource::from_parts(
            config.provider.as_ref(),
            config.provider_name.as_deref(),
            config.structuring_model(),
        );
        let backend = Arc::new(ProviderBackend::new(
            source,
            Duration::from_secs(config.api_timeout_secs),
        ));
        Self::with_backend(config, backend)
    }

    /// Structurer over an arbitrary [`ChatBackend`].
    pub fn with_backend(config: &ServiceConfig, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_STRUCTURING_PROMPT.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            response_mode: config.response_mode,
        }
    }

    fn request(&self, transcript: &str) -> ChatRequest {
        ChatRequest {
            system: self.system_prompt.clone(),
            user: structuring_user_message(transcript),
            images: Vec::new(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Ask the model to turn `transcript` into JSON text.
    pub async fn structure(&self, transcript: &str) -> Result<String, StructuringError> {
        let request = self.request(transcript);
        let start = Instant::now();
        let mut last_err: Option<StructuringError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.backoff_ms(attempt);
                warn!(
                    "Structuring: retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            let result = self.backend.chat(&request).await.and_then(|reply| {
                let tokens = (reply.prompt_tokens, reply.completion_tokens);
                self.finish(reply.content).map(|text| (text, tokens))
            });

            match result {
                Ok((text, (prompt_tokens, completion_tokens))) => {
                    info!(
                        "Structured {} transcript bytes into {} bytes ({} input / {} output tokens) in {:?}",
                        transcript.len(),
                        text.len(),
                        prompt_tokens,
                        completion_tokens,
                        start.elapsed()
                    );
                    return Ok(text);
                }
                Err(e @ StructuringError::ProviderNotConfigured { .. }) => return Err(e),
                Err(e) => {
                    warn!("Structuring: attempt {} failed: {}", attempt + 1, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| StructuringError::LlmApiError {
            message: "Unknown error".to_string(),
        }))
    }

    /// Delay before retry `attempt` (1-based): `retry_backoff_ms * 2^(attempt-1)`,
    /// saturating and capped at [`MAX_BACKOFF_MS`].
    fn backoff_ms(&self, attempt: u32) -> u64 {
        self.retry_backoff_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
            .min(MAX_BACKOFF_MS)
    }

    fn finish(&self, content: String) -> Result<String, StructuringError> {
        match self.response_mode {
            ResponseMode::Passthrough => Ok(content),
            ResponseMode::Validate => {
                let json = validate_json_object(&content)?;
                debug!("Reply validated as a JSON object");
                Ok(json)
            }
        }
    }
}

//! Rewrite backend: turn one chunk plus a style into rewritten text.
//!
//! The engine only sees the [`Rewriter`] trait, so tests and alternative
//! backends plug in without an LLM. [`LlmRewriter`] is the production
//! implementation over an `edgequake_llm` provider.
//!
//! ## Timeouts and retries
//!
//! Each call is bounded by `api_timeout_secs`; a timeout is reported as a
//! [`RewriteError::Timeout`] like any other failure. Retries are off by
//! default (`max_retries = 0`). When enabled they back off exponentially:
//! `retry_backoff_ms * 2^(attempt-1)`.

use crate::config::ParaphraseConfig;
use crate::error::{ParaphraseError, RewriteError};
use crate::pipeline::postprocess::clean_rewrite;
use crate::prompts::{build_system_prompt, build_user_prompt};
use crate::style::StyleConfig;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Something that can paraphrase a piece of text.
///
/// Implementations must return only the rewritten text, without commentary.
#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn rewrite(&self, text: &str, style: &StyleConfig) -> Result<String, RewriteError>;
}

/// [`Rewriter`] backed by an LLM chat completion.
pub struct LlmRewriter {
    provider: Arc<dyn LLMProvider>,
    system_prompt: Option<String>,
    max_tokens_cap: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    api_timeout_secs: u64,
}

impl LlmRewriter {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ParaphraseConfig) -> Self {
        Self {
            provider,
            system_prompt: config.system_prompt.clone(),
            max_tokens_cap: config.max_tokens_cap,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            api_timeout_secs: config.api_timeout_secs,
        }
    }

    /// Resolve a provider from `config` (see [`resolve_provider`]) and wrap it.
    pub fn from_config(
        config: &ParaphraseConfig,
        style: &StyleConfig,
    ) -> Result<Self, ParaphraseError> {
        let provider = resolve_provider(config, style.model.as_deref())?;
        Ok(Self::new(provider, config))
    }

    fn messages(&self, text: &str, style: &StyleConfig) -> Vec<ChatMessage> {
        let system = match self.system_prompt {
            Some(ref custom) => custom.clone(),
            None => build_system_prompt(style),
        };
        vec![
            ChatMessage::system(system),
            ChatMessage::user(build_user_prompt(text)),
        ]
    }

    async fn attempt(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, RewriteError> {
        let call = self.provider.chat(messages, Some(options));
        let response = timeout(Duration::from_secs(self.api_timeout_secs), call)
            .await
            .map_err(|_| RewriteError::Timeout {
                secs: self.api_timeout_secs,
            })?
            .map_err(|e| RewriteError::Api {
                detail: format!("{}", e),
            })?;

        debug!(
            "rewrite: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        let cleaned = clean_rewrite(&response.content);
        if cleaned.is_empty() {
            return Err(RewriteError::EmptyResponse);
        }
        Ok(cleaned)
    }
}

/// Delay before retry `attempt` (1-based), saturating at `u64::MAX`.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor)
}

#[async_trait]
impl Rewriter for LlmRewriter {
    async fn rewrite(&self, text: &str, style: &StyleConfig) -> Result<String, RewriteError> {
        let start = Instant::now();
        let messages = self.messages(text, style);
        let options = build_options(text, style, self.max_tokens_cap);

        let mut last_err = RewriteError::EmptyResponse;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "rewrite: retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.attempt(&messages, &options).await {
                Ok(text) => {
                    debug!("rewrite: done in {:?}", start.elapsed());
                    return Ok(text);
                }
                Err(e) => {
                    warn!("rewrite: attempt {} failed: {}", attempt + 1, e);
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }
}

/// Build `CompletionOptions` for one chunk.
///
/// Output budget is twice the input length in characters, capped.
fn build_options(text: &str, style: &StyleConfig, max_tokens_cap: usize) -> CompletionOptions {
    let budget = text.chars().count().saturating_mul(2).clamp(1, max_tokens_cap);
    CompletionOptions {
        temperature: Some(style.creativity.temperature()),
        max_tokens: Some(budget),
        ..Default::default()
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`): used as-is.
/// 2. **Named provider** (`config.provider_name`): created through
///    [`ProviderFactory::create_llm_provider`] with the resolved model; the
///    factory reads the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
///    A model named by the style still wins over `EDGEQUAKE_MODEL`.
/// 4. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(
    config: &ParaphraseConfig,
    style_model: Option<&str>,
) -> Result<Arc<dyn LLMProvider>, ParaphraseError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, config.resolve_model(style_model));
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            let model = style_model.unwrap_or(&model);
            return create_provider(&prov, model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ParaphraseError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENROUTER_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ParaphraseError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ParaphraseError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

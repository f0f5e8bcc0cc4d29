//! Configuration types for document paraphrasing.
//!
//! Engine and backend behaviour is controlled through [`ParaphraseConfig`],
//! built via its [`ParaphraseConfigBuilder`]. Per-request style knobs live
//! separately in [`crate::style::StyleConfig`] because they belong to a job,
//! whereas this struct belongs to the process.

use crate::error::ParaphraseError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Model used when neither the style nor the config names one.
pub const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";

/// Configuration for a paraphrasing run.
///
/// Built via [`ParaphraseConfig::builder()`] or using
/// [`ParaphraseConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_paraphrase::ParaphraseConfig;
///
/// let config = ParaphraseConfig::builder()
///     .max_chunk_size(2000)
///     .overlap_size(150)
///     .chunk_delay_ms(0)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_chunk_size, 2000);
/// ```
#[derive(Clone)]
pub struct ParaphraseConfig {
    /// Upper bound on a chunk's size in characters. Default: 4000.
    ///
    /// Chunks built from whole paragraphs may exceed it by up to
    /// `overlap_size` because the overlap seed is prepended after the split
    /// decision is made.
    pub max_chunk_size: usize,

    /// Target length of the text repeated at the start of each chunk. Default: 200.
    pub overlap_size: usize,

    /// Pause between two successful chunk calls in milliseconds. Default: 1000.
    ///
    /// Keeps a long document from bursting through the provider's rate limit.
    pub chunk_delay_ms: u64,

    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "openrouter").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Ceiling for the per-request `max_tokens`. Default: 8000.
    ///
    /// Each request asks for twice the chunk's character count, capped here.
    pub max_tokens_cap: usize,

    /// Retry attempts inside the rewrite backend. Default: 0.
    ///
    /// The engine itself never retries a chunk; this only affects the LLM
    /// backend wrapper.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-rewrite-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Custom system prompt. If None, one is built from the style.
    pub system_prompt: Option<String>,
}

impl Default for ParaphraseConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 4000,
            overlap_size: 200,
            chunk_delay_ms: 1000,
            model: None,
            provider_name: None,
            provider: None,
            max_tokens_cap: 8000,
            max_retries: 0,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for ParaphraseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParaphraseConfig")
            .field("max_chunk_size", &self.max_chunk_size)
            .field("overlap_size", &self.overlap_size)
            .field("chunk_delay_ms", &self.chunk_delay_ms)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_tokens_cap", &self.max_tokens_cap)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ParaphraseConfig {
    /// Create a new builder for `ParaphraseConfig`.
    pub fn builder() -> ParaphraseConfigBuilder {
        ParaphraseConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    /// The model to request: style override, then config, then [`DEFAULT_MODEL`].
    pub fn resolve_model<'a>(&'a self, style_model: Option<&'a str>) -> &'a str {
        style_model
            .or(self.model.as_deref())
            .unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`ParaphraseConfig`].
#[derive(Debug)]
pub struct ParaphraseConfigBuilder {
    config: ParaphraseConfig,
}

impl ParaphraseConfigBuilder {
    pub fn max_chunk_size(mut self, n: usize) -> Self {
        self.config.max_chunk_size = n;
        self
    }

    pub fn overlap_size(mut self, n: usize) -> Self {
        self.config.overlap_size = n;
        self
    }

    pub fn chunk_delay_ms(mut self, ms: u64) -> Self {
        self.config.chunk_delay_ms = ms;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn max_tokens_cap(mut self, n: usize) -> Self {
        self.config.max_tokens_cap = n.max(1);
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

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ParaphraseConfig, ParaphraseError> {
        let c = &self.config;
        if c.max_chunk_size == 0 {
            return Err(ParaphraseError::InvalidConfig(
                "max_chunk_size must be ≥ 1".into(),
            ));
        }
        if c.overlap_size >= c.max_chunk_size {
            return Err(ParaphraseError::InvalidConfig(format!(
                "overlap_size ({}) must be smaller than max_chunk_size ({})",
                c.overlap_size, c.max_chunk_size
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(ParaphraseError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

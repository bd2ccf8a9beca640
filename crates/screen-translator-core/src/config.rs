use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fingerprint::FingerprintStrategy;

/// Language codes following ISO 639-1 with regional variants
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Placeholder used in cache keys when the source language is not given
    pub fn auto() -> Self {
        Self::new(AUTO_LANG)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_auto(&self) -> bool {
        self.0 == AUTO_LANG
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Source language placeholder meaning "let the provider detect it"
pub const AUTO_LANG: &str = "auto";
/// Default target language code
pub const DEFAULT_TARGET_LANG: &str = "en";

fn default_target_lang() -> Lang {
    Lang::new(DEFAULT_TARGET_LANG)
}

const fn default_true() -> bool {
    true
}

// =============================================================================
// Monitor
// =============================================================================

/// Region monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Polling interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Extracted text shorter than this (in characters) is ignored
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,

    /// How captured images are fingerprinted
    #[serde(default)]
    pub fingerprint: FingerprintStrategy,

    /// Only dispatch text the classifier considers subtitle-like
    #[serde(default)]
    pub subtitles_only: bool,

    /// Start the polling loop when a region becomes active
    #[serde(default = "default_true")]
    pub auto_start: bool,

    /// Stop the polling loop on a tick that finds no active region
    #[serde(default)]
    pub stop_when_idle: bool,
}

const fn default_interval_ms() -> u64 {
    1000
}

const fn default_min_text_length() -> usize {
    2
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            min_text_length: default_min_text_length(),
            fingerprint: FingerprintStrategy::default(),
            subtitles_only: false,
            auto_start: true,
            stop_when_idle: false,
        }
    }
}

// =============================================================================
// Classifier
// =============================================================================

/// Bounds for the subtitle heuristic used when no pattern rule matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_min_len")]
    pub min_len: usize,
    #[serde(default = "default_max_len")]
    pub max_len: usize,
}

const fn default_min_len() -> usize {
    2
}

const fn default_max_len() -> usize {
    200
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_len: default_min_len(),
            max_len: default_max_len(),
        }
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Translation dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Timeout applied to each individual provider attempt
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// A provider result is accepted only above this confidence
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

const fn default_provider_timeout_ms() -> u64 {
    5000
}

const fn default_min_confidence() -> f32 {
    0.5
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: default_provider_timeout_ms(),
            min_confidence: default_min_confidence(),
        }
    }
}

// =============================================================================
// Cache
// =============================================================================

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached translations (0 disables caching)
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Share of the capacity evicted in one batch when the cache is full
    #[serde(default = "default_eviction_fraction")]
    pub eviction_fraction: f64,
}

const fn default_capacity() -> usize {
    1000
}

const fn default_eviction_fraction() -> f64 {
    0.2
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            eviction_fraction: default_eviction_fraction(),
        }
    }
}

// =============================================================================
// Providers
// =============================================================================

/// One OpenAI-compatible translation endpoint.
///
/// Supports llama.cpp, Ollama, DeepSeek, OpenAI, and any other OpenAI-compatible API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name reported in results and used to toggle the provider
    pub name: String,
    /// Lower numbers are tried first
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Confidence reported for every translation of this endpoint
    #[serde(default = "default_provider_confidence")]
    pub confidence: f32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

const fn default_provider_confidence() -> f32 {
    0.8
}

const fn default_retry_count() -> u32 {
    1
}

const fn default_retry_delay_ms() -> u64 {
    250
}

impl ProviderConfig {
    /// Create a new provider config with default tuning
    pub fn new(
        name: impl Into<String>,
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            enabled: true,
            api_base: api_base.into(),
            api_key,
            model: model.into(),
            confidence: default_provider_confidence(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

// =============================================================================
// Application
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source language (`None` lets providers detect it)
    #[serde(default)]
    pub source_lang: Option<Lang>,

    /// Target language
    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Translation endpoints, in no particular order (see `priority`)
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_lang: None,
            target_lang: default_target_lang(),
            monitor: MonitorConfig::default(),
            classifier: ClassifierConfig::default(),
            dispatcher: DispatcherConfig::default(),
            cache: CacheConfig::default(),
            providers: Vec::new(),
        }
    }
}

/// Prefix of environment variables read by [`AppConfig::load`]
pub const ENV_PREFIX: &str = "SCREEN_TRANSLATOR";

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/screen-translator/config.toml,
    /// ./config.toml), then `SCREEN_TRANSLATOR__*` environment overrides.
    pub fn load() -> Self {
        let mut builder = config::Config::builder();

        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("screen-translator").join("config.toml");
            builder = builder.add_source(config::File::from(user_config).required(false));
        }

        builder = builder
            .add_source(config::File::with_name("config.toml").required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        let loaded = builder
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| Error::ConfigLoad(e.to_string()))
            .and_then(|config| config.validate().map(|()| config));

        match loaded {
            Ok(config) => {
                tracing::debug!("Loaded configuration with {} provider(s)", config.providers.len());
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Reject values the monitor or dispatcher cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.monitor.interval_ms == 0 {
            return Err(invalid("monitor.interval_ms", "must be greater than zero"));
        }
        if self.classifier.min_len > self.classifier.max_len {
            return Err(invalid("classifier.min_len", "must not exceed classifier.max_len"));
        }
        if self.dispatcher.provider_timeout_ms == 0 {
            return Err(invalid("dispatcher.provider_timeout_ms", "must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.dispatcher.min_confidence) {
            return Err(invalid("dispatcher.min_confidence", "must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.cache.eviction_fraction) {
            return Err(invalid("cache.eviction_fraction", "must be within [0, 1]"));
        }
        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                return Err(invalid("providers.name", "must not be empty"));
            }
            if !(0.0..=1.0).contains(&provider.confidence) {
                return Err(invalid(
                    &format!("providers.{}.confidence", provider.name),
                    "must be within [0, 1]",
                ));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::ConfigInvalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

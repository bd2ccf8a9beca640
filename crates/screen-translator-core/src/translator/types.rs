use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Lang;

/// Provider name reported for results served from the cache
pub const CACHE_PROVIDER: &str = "cache";
/// Provider name reported when no provider produced an accepted result
pub const NO_PROVIDER: &str = "none";
/// Detected language reported when nothing better is known
pub const UNKNOWN_LANG: &str = "unknown";

/// A piece of text to translate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    /// `None` lets providers detect the language
    pub source_lang: Option<Lang>,
    pub target_lang: Lang,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, source_lang: Option<Lang>, target_lang: Lang) -> Self {
        Self {
            text: text.into(),
            source_lang,
            target_lang,
        }
    }
}

/// The normalized output every provider adapter must fill in completely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderTranslation {
    pub translated_text: String,
    /// Provider's own quality estimate in `[0, 1]`
    pub confidence: f32,
    pub detected_lang: Lang,
}

/// Final result of one dispatch. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub original_text: String,
    pub translated_text: String,
    pub detected_lang: Lang,
    pub confidence: f32,
    /// Name of the provider that produced it, `"cache"` or `"none"`
    pub provider: String,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl TranslationResult {
    /// Zero-confidence result returned when every provider failed.
    ///
    /// The text is passed through untranslated so the presentation layer can
    /// show it with a "translation unavailable" marker.
    pub fn fallback(request: &TranslationRequest, latency_ms: u64) -> Self {
        Self {
            original_text: request.text.clone(),
            translated_text: request.text.clone(),
            detected_lang: request
                .source_lang
                .clone()
                .unwrap_or_else(|| Lang::new(UNKNOWN_LANG)),
            confidence: 0.0,
            provider: NO_PROVIDER.to_string(),
            latency_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.provider == NO_PROVIDER
    }

    pub fn from_cache(&self) -> bool {
        self.provider == CACHE_PROVIDER
    }
}

use async_trait::async_trait;
use crate::config::Lang;
use crate::error::Result;
use super::types::ProviderTranslation;

/// Information about a provider backend
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    /// Human-readable backend kind
    pub kind: &'static str,
    /// Whether this backend requires an API key
    pub requires_api_key: bool,
    /// Whether this backend runs on the local machine (no quota, no network cost)
    pub is_local: bool,
}

/// Trait for translation backends.
///
/// Implementations only translate; timeouts, fallback and caching are the
/// dispatcher's job.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Get information about this backend
    fn info(&self) -> ProviderInfo;

    /// Translate text into the target language.
    ///
    /// `source` is `None` when the language should be detected.
    async fn translate(
        &self,
        text: &str,
        source: Option<&Lang>,
        target: &Lang,
    ) -> Result<ProviderTranslation>;

    /// Warm up the backend (load a model, open a connection)
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Check if the backend can be used at all (e.g., API key configured)
    fn is_available(&self) -> bool {
        true
    }
}

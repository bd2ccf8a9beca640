mod openai;
mod registry;
mod traits;
mod types;

pub use openai::OpenAiProvider;
pub use registry::{ProviderDescriptor, ProviderRegistry};
pub use traits::{ProviderInfo, TranslationProvider};
pub use types::{
    ProviderTranslation, TranslationRequest, TranslationResult, CACHE_PROVIDER, NO_PROVIDER,
    UNKNOWN_LANG,
};

use crate::config::ProviderConfig;
use crate::error::Result;
use std::sync::Arc;

/// Build a registry from the configured endpoints
pub fn create_registry(configs: &[ProviderConfig]) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    for config in configs {
        let provider: Arc<dyn TranslationProvider> = Arc::new(OpenAiProvider::new(config)?);
        registry.register(config.name.clone(), config.priority, provider);
        if !config.enabled {
            registry.set_enabled(&config.name, false);
        }
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_registry_honors_enabled_flag() {
        let mut remote = ProviderConfig::new("remote", "http://localhost:9000/v1", None, "big");
        remote.priority = 2;
        remote.enabled = false;
        let mut local = ProviderConfig::new("local", "http://localhost:8080/v1", None, "tiny");
        local.priority = 1;

        let registry = create_registry(&[remote, local]).unwrap();
        let descriptors = registry.descriptors();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "local");
        assert!(descriptors[0].enabled);
        assert!(!descriptors[1].enabled);
    }
}

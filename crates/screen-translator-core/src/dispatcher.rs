//! Multi-provider translation dispatch.
//!
//! A dispatch tries the cache first, then every enabled provider in priority
//! order, each under its own timeout. Only results above the configured
//! threshold are accepted, and only those above [`CACHEABLE_CONFIDENCE`] are
//! cached. When nothing is accepted a zero-confidence passthrough result is
//! returned instead of an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheStats, TranslationCache};
use crate::config::{AppConfig, DispatcherConfig};
use crate::error::{Error, Result};
use crate::telemetry::{PerformanceStats, Telemetry};
use crate::translator::{
    ProviderDescriptor, ProviderRegistry, ProviderTranslation, TranslationProvider,
    TranslationRequest, TranslationResult, CACHE_PROVIDER,
};
use crate::util::{duration_ms, truncate_text};

/// Only results above this confidence are ever cached, whatever the
/// configured acceptance threshold
pub const CACHEABLE_CONFIDENCE: f32 = 0.5;

/// Owns the provider chain, the cache and the telemetry aggregate
pub struct TranslationDispatcher {
    registry: RwLock<ProviderRegistry>,
    cache: TranslationCache,
    telemetry: Telemetry,
    config: DispatcherConfig,
}

impl TranslationDispatcher {
    pub fn new(registry: ProviderRegistry, cache: TranslationCache, config: DispatcherConfig) -> Self {
        Self {
            registry: RwLock::new(registry),
            cache,
            telemetry: Telemetry::new(),
            config,
        }
    }

    /// Build the dispatcher and its providers from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let registry = crate::translator::create_registry(&config.providers)?;
        Ok(Self::new(
            registry,
            TranslationCache::new(&config.cache),
            config.dispatcher.clone(),
        ))
    }

    /// Register an additional provider
    pub async fn register_provider(
        &self,
        name: impl Into<String>,
        priority: i32,
        provider: Arc<dyn TranslationProvider>,
    ) {
        self.registry.write().await.register(name, priority, provider);
    }

    /// Warm up every registered provider concurrently.
    ///
    /// Providers that fail to initialize are disabled. The total wall time is
    /// recorded as the last initialization duration.
    pub async fn initialize(&self) {
        let started = Instant::now();
        let providers = self.registry.read().await.all();

        let outcomes = futures::future::join_all(providers.into_iter().map(|(name, provider)| async move {
            let outcome = provider.initialize().await;
            (name, outcome)
        }))
        .await;

        let mut registry = self.registry.write().await;
        for (name, outcome) in outcomes {
            if let Err(e) = outcome {
                warn!("Provider '{}' failed to initialize, disabling it: {}", name, e);
                registry.set_enabled(&name, false);
            }
        }
        drop(registry);

        let elapsed = duration_ms(started.elapsed());
        self.telemetry.record_init(elapsed);
        info!("Providers initialized in {} ms", elapsed);
    }

    /// Translate one request. Never fails; see the module docs.
    pub async fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        let started = Instant::now();
        let key = CacheKey::new(&request.text, request.source_lang.as_ref(), &request.target_lang);

        if let Some(entry) = self.cache.get(&key) {
            let latency_ms = duration_ms(started.elapsed());
            self.telemetry.record_translation(latency_ms, true);
            return TranslationResult {
                provider: CACHE_PROVIDER.to_string(),
                latency_ms,
                timestamp: Utc::now(),
                ..entry.result
            };
        }

        let providers = self.registry.read().await.active();
        if providers.is_empty() {
            debug!("{} for '{}'", Error::NoProviderAvailable, truncate_text(&request.text, 30));
        }

        for (name, provider) in providers {
            let Some(translation) = self.attempt(&name, provider.as_ref(), request).await else {
                continue;
            };

            let result = TranslationResult {
                original_text: request.text.clone(),
                translated_text: translation.translated_text,
                detected_lang: translation.detected_lang,
                confidence: translation.confidence,
                provider: name,
                latency_ms: duration_ms(started.elapsed()),
                timestamp: Utc::now(),
            };

            if result.confidence > CACHEABLE_CONFIDENCE {
                self.cache.put(key, result.clone());
            } else {
                debug!(
                    "Not caching '{}': confidence {:.2} not above {:.2}",
                    truncate_text(&request.text, 30),
                    result.confidence,
                    CACHEABLE_CONFIDENCE
                );
            }
            self.telemetry.record_translation(result.latency_ms, false);
            debug!(
                "Translated '{}' with {} in {} ms",
                truncate_text(&request.text, 30),
                result.provider,
                result.latency_ms
            );
            return result;
        }

        warn!(
            "All providers exhausted for '{}', returning untranslated text",
            truncate_text(&request.text, 30)
        );
        let result = TranslationResult::fallback(request, duration_ms(started.elapsed()));
        self.telemetry.record_translation(result.latency_ms, false);
        result
    }

    /// One provider attempt. `None` means "move on to the next provider".
    async fn attempt(
        &self,
        name: &str,
        provider: &dyn TranslationProvider,
        request: &TranslationRequest,
    ) -> Option<ProviderTranslation> {
        let timeout = Duration::from_millis(self.config.provider_timeout_ms);
        let call = provider.translate(&request.text, request.source_lang.as_ref(), &request.target_lang);

        let error = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(translation)) if translation.confidence > self.config.min_confidence => {
                return Some(translation);
            }
            Ok(Ok(translation)) => {
                debug!(
                    "Provider '{}' confidence {:.2} not above {:.2}, trying next",
                    name, translation.confidence, self.config.min_confidence
                );
                return None;
            }
            Ok(Err(e)) => e,
            Err(_) => Error::ProviderTimeout {
                provider: name.to_string(),
                timeout_ms: self.config.provider_timeout_ms,
            },
        };

        warn!("Provider '{}' failed, trying next: {}", name, error);
        None
    }

    /// Enable or disable a provider by name. Returns `false` if unknown.
    pub async fn set_provider_enabled(&self, name: &str, enabled: bool) -> bool {
        self.registry.write().await.set_enabled(name, enabled)
    }

    pub async fn providers(&self) -> Vec<ProviderDescriptor> {
        self.registry.read().await.descriptors()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub const fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn stats(&self) -> PerformanceStats {
        self.telemetry.snapshot()
    }

    pub fn reset_stats(&self) {
        self.telemetry.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Lang;
    use crate::translator::{ProviderInfo, NO_PROVIDER};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        confidence: f32,
        fail_init: bool,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(confidence: f32) -> Arc<Self> {
            Arc::new(Self {
                confidence,
                fail_init: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn broken_init() -> Arc<Self> {
            Arc::new(Self {
                confidence: 0.9,
                fail_init: true,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TranslationProvider for Fixed {
        fn info(&self) -> ProviderInfo {
            ProviderInfo {
                kind: "fixed",
                requires_api_key: false,
                is_local: true,
            }
        }

        async fn translate(
            &self,
            text: &str,
            _source: Option<&Lang>,
            _target: &Lang,
        ) -> Result<ProviderTranslation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ProviderTranslation {
                translated_text: format!("[{text}]"),
                confidence: self.confidence,
                detected_lang: Lang::new("fr"),
            })
        }

        async fn initialize(&self) -> Result<()> {
            if self.fail_init {
                return Err(Error::provider("broken", "model file missing"));
            }
            Ok(())
        }
    }

    fn request(text: &str) -> TranslationRequest {
        TranslationRequest::new(text, None, Lang::new("en"))
    }

    fn dispatcher_with(providers: Vec<(&str, i32, Arc<Fixed>)>) -> TranslationDispatcher {
        let mut registry = ProviderRegistry::new();
        for (name, priority, provider) in providers {
            registry.register(name, priority, provider);
        }
        TranslationDispatcher::new(
            registry,
            TranslationCache::with_capacity(10, 0.2),
            DispatcherConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_confidence_exactly_at_threshold_is_rejected() {
        let edge = Fixed::new(0.5);
        let dispatcher = dispatcher_with(vec![("edge", 1, edge.clone())]);

        let result = dispatcher.translate(&request("Bonjour.")).await;
        assert_eq!(result.provider, NO_PROVIDER);
        assert_eq!(edge.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_providers_returns_fallback() {
        let dispatcher = dispatcher_with(Vec::new());
        let req = TranslationRequest::new("Bonjour.", Some(Lang::new("fr")), Lang::new("en"));

        let result = dispatcher.translate(&req).await;
        assert!(result.is_fallback());
        assert_eq!(result.translated_text, "Bonjour.");
        assert_eq!(result.detected_lang.as_str(), "fr");
        assert!(result.confidence.abs() < f32::EPSILON);
        assert_eq!(dispatcher.stats().total_translations, 1);
    }

    #[tokio::test]
    async fn test_cache_hit_reports_cache_provider() {
        let good = Fixed::new(0.9);
        let dispatcher = dispatcher_with(vec![("good", 1, good.clone())]);

        let first = dispatcher.translate(&request("Bonjour.")).await;
        let second = dispatcher.translate(&request("Bonjour.")).await;

        assert_eq!(first.provider, "good");
        assert_eq!(second.provider, CACHE_PROVIDER);
        assert_eq!(second.translated_text, first.translated_text);
        assert_eq!(good.calls.load(Ordering::SeqCst), 1);

        let stats = dispatcher.stats();
        assert_eq!(stats.total_translations, 2);
        assert_eq!(stats.cache_hits, 1);
    }

    #[tokio::test]
    async fn test_initialize_disables_failing_providers() {
        let broken = Fixed::broken_init();
        let good = Fixed::new(0.9);
        let dispatcher = dispatcher_with(vec![("broken", 1, broken.clone()), ("good", 2, good)]);
        dispatcher.initialize().await;

        let providers = dispatcher.providers().await;
        assert!(!providers[0].enabled);
        assert!(providers[1].enabled);

        let result = dispatcher.translate(&request("Bonjour.")).await;
        assert_eq!(result.provider, "good");
        assert_eq!(broken.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_low_acceptance_threshold_never_caches_weak_results() {
        let weak = Fixed::new(0.3);
        let mut registry = ProviderRegistry::new();
        registry.register("weak", 1, weak.clone());
        let dispatcher = TranslationDispatcher::new(
            registry,
            TranslationCache::with_capacity(10, 0.2),
            DispatcherConfig {
                min_confidence: 0.2,
                ..DispatcherConfig::default()
            },
        );

        let first = dispatcher.translate(&request("Bonjour.")).await;
        assert_eq!(first.provider, "weak");
        assert!((first.confidence - 0.3).abs() < f32::EPSILON);
        assert_eq!(dispatcher.cache_stats().size, 0);

        // Served by the provider again, never as a cache hit
        let second = dispatcher.translate(&request("Bonjour.")).await;
        assert_eq!(second.provider, "weak");
        assert_eq!(weak.calls.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.stats().cache_hits, 0);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_provider_call() {
        let good = Fixed::new(0.9);
        let dispatcher = dispatcher_with(vec![("good", 1, good.clone())]);

        dispatcher.translate(&request("Bonjour.")).await;
        dispatcher.clear_cache();
        assert_eq!(dispatcher.cache_stats().size, 0);

        let again = dispatcher.translate(&request("Bonjour.")).await;
        assert_eq!(again.provider, "good");
        assert_eq!(good.calls.load(Ordering::SeqCst), 2);
    }
}

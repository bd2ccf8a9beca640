//! Screen Translator Core Library
//!
//! This library provides the orchestration layer for live on-screen subtitle
//! translation:
//! - Region monitoring with fingerprint-based change detection
//! - Subtitle classification of recognized text
//! - Multi-provider translation dispatch with confidence gating
//! - Bounded translation cache with batch eviction
//! - Performance telemetry
//!
//! Screen capture and OCR are supplied by the caller through the
//! [`ScreenCapturer`] and [`TextExtractor`] traits.

pub mod cache;
pub mod capture;
pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fingerprint;
pub mod monitor;
pub mod region;
pub mod telemetry;
pub mod translator;
pub mod util;

pub use cache::{CacheKey, CacheStats, TranslationCache};
pub use capture::{ExtractedText, ScreenCapturer, TextExtractor};
pub use classifier::{classify, SubtitleCategory, SubtitleClassification};
pub use config::{AppConfig, Lang, ProviderConfig};
pub use dispatcher::TranslationDispatcher;
pub use error::{Error, Result};
pub use fingerprint::{Fingerprint, FingerprintStrategy};
pub use monitor::{MonitorEvent, RegionMonitor, TickReport};
pub use region::{Bounds, DisplayId, Region, RegionId, RegionState};
pub use telemetry::PerformanceStats;
pub use translator::{
    OpenAiProvider, ProviderDescriptor, ProviderTranslation, TranslationProvider,
    TranslationRequest, TranslationResult,
};

use std::sync::Arc;
use tokio::sync::mpsc;

/// High-level entry point that combines the monitor and the dispatcher and
/// exposes the control surface used by the presentation layer.
pub struct ScreenTranslator {
    dispatcher: Arc<TranslationDispatcher>,
    monitor: RegionMonitor,
    config: AppConfig,
}

impl ScreenTranslator {
    /// Create a translator whose providers come from the configuration
    pub fn new(
        config: AppConfig,
        capturer: Arc<dyn ScreenCapturer>,
        extractor: Arc<dyn TextExtractor>,
        events: mpsc::UnboundedSender<MonitorEvent>,
    ) -> Result<Self> {
        config.validate()?;
        let dispatcher = Arc::new(TranslationDispatcher::from_config(&config)?);
        Ok(Self::with_dispatcher(config, dispatcher, capturer, extractor, events))
    }

    /// Create with an existing dispatcher (custom providers, shared cache)
    pub fn with_dispatcher(
        config: AppConfig,
        dispatcher: Arc<TranslationDispatcher>,
        capturer: Arc<dyn ScreenCapturer>,
        extractor: Arc<dyn TextExtractor>,
        events: mpsc::UnboundedSender<MonitorEvent>,
    ) -> Self {
        let monitor = RegionMonitor::new(&config, capturer, extractor, Arc::clone(&dispatcher), events);
        Self {
            dispatcher,
            monitor,
            config,
        }
    }

    /// Warm up providers and record how long it took
    pub async fn initialize(&self) {
        self.dispatcher.initialize().await;
    }

    pub async fn add_region(&self, bounds: Bounds) -> Result<RegionId> {
        self.monitor.add_region(bounds).await
    }

    pub async fn add_region_on_display(&self, bounds: Bounds, display_id: DisplayId) -> Result<RegionId> {
        self.monitor.add_region_on_display(bounds, display_id).await
    }

    pub async fn set_active(&self, id: RegionId, active: bool) -> bool {
        self.monitor.set_active(id, active).await
    }

    pub async fn delete_region(&self, id: RegionId) -> bool {
        self.monitor.delete_region(id).await
    }

    pub async fn list_regions(&self) -> Vec<Region> {
        self.monitor.list_regions().await
    }

    pub fn start_monitoring(&self) -> bool {
        self.monitor.start_monitoring()
    }

    pub fn stop_monitoring(&self) -> bool {
        self.monitor.stop_monitoring()
    }

    /// Translate text directly, outside the polling loop
    pub async fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        self.dispatcher.translate(request).await
    }

    pub async fn set_provider_enabled(&self, name: &str, enabled: bool) -> bool {
        self.dispatcher.set_provider_enabled(name, enabled).await
    }

    pub fn clear_cache(&self) {
        self.dispatcher.clear_cache();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.dispatcher.cache_stats()
    }

    pub fn get_stats(&self) -> PerformanceStats {
        self.dispatcher.stats()
    }

    pub fn reset_stats(&self) {
        self.dispatcher.reset_stats();
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub const fn monitor(&self) -> &RegionMonitor {
        &self.monitor
    }

    pub const fn dispatcher(&self) -> &Arc<TranslationDispatcher> {
        &self.dispatcher
    }
}

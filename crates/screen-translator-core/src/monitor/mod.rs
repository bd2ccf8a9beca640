//! Region monitor: the change-detection polling loop.
//!
//! Every tick, each active and idle region is captured and fingerprinted.
//! Unchanged regions stop there. Changed regions go through OCR, the
//! classifier and the dispatcher, and a [`MonitorEvent::RegionChanged`] is
//! emitted with the result.
//!
//! Checks run as separate tokio tasks so a slow region never delays the
//! others. A region marked `Checking` is skipped by later ticks until its
//! check finishes, which bounds the work in flight to one check per region.

mod events;

pub use events::MonitorEvent;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

use crate::capture::{ScreenCapturer, TextExtractor};
use crate::classifier::{self, SubtitleClassification};
use crate::config::{AppConfig, ClassifierConfig, Lang, MonitorConfig};
use crate::dispatcher::TranslationDispatcher;
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::region::{Bounds, DisplayId, Region, RegionId, RegionState};
use crate::translator::{TranslationRequest, TranslationResult};
use crate::util::truncate_text;

struct RegionSlot {
    region: Region,
    state: RegionState,
}

/// What a single region check produced
enum CheckOutcome {
    Unchanged,
    /// Capture or extraction failed, already logged
    Failed,
    /// Changed, but the text was too short or not subtitle-like
    Skipped,
    Translated {
        text: String,
        classification: SubtitleClassification,
        result: TranslationResult,
    },
}

/// Handles to the checks started by one [`RegionMonitor::tick`]
#[derive(Debug)]
pub struct TickReport {
    /// Active regions seen by the tick, including ones still checking
    pub active_regions: usize,
    handles: Vec<JoinHandle<()>>,
}

impl TickReport {
    /// Number of checks started by this tick
    pub fn scheduled(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every check started by this tick to finish
    pub async fn wait(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("Region check task failed: {}", e);
            }
        }
    }
}

struct Inner {
    regions: RwLock<Vec<RegionSlot>>,
    capturer: Arc<dyn ScreenCapturer>,
    extractor: Arc<dyn TextExtractor>,
    dispatcher: Arc<TranslationDispatcher>,
    events: mpsc::UnboundedSender<MonitorEvent>,
    config: MonitorConfig,
    classifier: ClassifierConfig,
    source_lang: Option<Lang>,
    target_lang: Lang,
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Bumped on every stop; checks started in an older epoch emit nothing
    epoch: AtomicU64,
}

/// Owns the watched regions and drives the capture → translate pipeline.
///
/// Cloning is cheap and yields a handle to the same monitor.
#[derive(Clone)]
pub struct RegionMonitor {
    inner: Arc<Inner>,
}

impl RegionMonitor {
    pub fn new(
        config: &AppConfig,
        capturer: Arc<dyn ScreenCapturer>,
        extractor: Arc<dyn TextExtractor>,
        dispatcher: Arc<TranslationDispatcher>,
        events: mpsc::UnboundedSender<MonitorEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                regions: RwLock::new(Vec::new()),
                capturer,
                extractor,
                dispatcher,
                events,
                config: config.monitor.clone(),
                classifier: config.classifier,
                source_lang: config.source_lang.clone(),
                target_lang: config.target_lang.clone(),
                timer: Mutex::new(None),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    // =========================================================================
    // Region lifecycle
    // =========================================================================

    /// Start watching `bounds` on the primary display
    pub async fn add_region(&self, bounds: Bounds) -> Result<RegionId> {
        self.add_region_on_display(bounds, 0).await
    }

    /// Start watching `bounds` on a given display. New regions are active.
    pub async fn add_region_on_display(&self, bounds: Bounds, display_id: DisplayId) -> Result<RegionId> {
        let region = Region::new(bounds, display_id)?;
        let id = region.id;

        self.inner.regions.write().await.push(RegionSlot {
            region: region.clone(),
            state: RegionState::Idle,
        });
        info!(
            "Watching region {} at ({}, {}) {}x{} on display {}",
            id, bounds.x, bounds.y, bounds.width, bounds.height, display_id
        );
        self.inner.emit(MonitorEvent::RegionAdded(region));

        if self.inner.config.auto_start {
            self.start_monitoring();
        }
        Ok(id)
    }

    /// Activate or deactivate a region. Returns `false` if the id is unknown.
    pub async fn set_active(&self, id: RegionId, active: bool) -> bool {
        let region = {
            let mut regions = self.inner.regions.write().await;
            let Some(slot) = regions.iter_mut().find(|slot| slot.region.id == id) else {
                return false;
            };
            slot.region.is_active = active;
            slot.region.clone()
        };

        debug!("Region {} {}", id, if active { "activated" } else { "deactivated" });
        self.inner.emit(MonitorEvent::RegionToggled(region));

        // Deactivating never stops the loop; idle ticks just find nothing to do
        if active && self.inner.config.auto_start {
            self.start_monitoring();
        }
        true
    }

    /// Stop watching a region and forget it. Returns `false` if unknown.
    ///
    /// A check already running for the region finishes, but its result is
    /// dropped because the region is gone by then.
    pub async fn delete_region(&self, id: RegionId) -> bool {
        let removed = {
            let mut regions = self.inner.regions.write().await;
            let Some(index) = regions.iter().position(|slot| slot.region.id == id) else {
                return false;
            };
            regions[index].region.is_active = false;
            regions.remove(index).region
        };

        info!("Stopped watching region {}", id);
        self.inner.emit(MonitorEvent::RegionDeleted(removed));
        true
    }

    /// Snapshot of all regions in creation order
    pub async fn list_regions(&self) -> Vec<Region> {
        self.inner
            .regions
            .read()
            .await
            .iter()
            .map(|slot| slot.region.clone())
            .collect()
    }

    pub async fn region(&self, id: RegionId) -> Option<Region> {
        self.inner
            .regions
            .read()
            .await
            .iter()
            .find(|slot| slot.region.id == id)
            .map(|slot| slot.region.clone())
    }

    pub async fn region_state(&self, id: RegionId) -> Option<RegionState> {
        self.inner
            .regions
            .read()
            .await
            .iter()
            .find(|slot| slot.region.id == id)
            .map(|slot| slot.state)
    }

    // =========================================================================
    // Polling loop
    // =========================================================================

    /// Start the polling loop. Returns `false` if it was already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_monitoring(&self) -> bool {
        let mut timer = self.inner.timer.lock();
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        info!("Starting region monitor ({} ms interval)", self.inner.config.interval_ms);
        *timer = Some(tokio::spawn(self.clone().run()));
        true
    }

    /// Cancel the polling loop. Returns `false` if it was not running.
    ///
    /// Checks already in flight are not cancelled; they finish and their
    /// results are discarded.
    pub fn stop_monitoring(&self) -> bool {
        let mut timer = self.inner.timer.lock();
        let Some(handle) = timer.take() else {
            return false;
        };
        // Bumped under the timer lock so no result can be emitted after this returns
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        drop(timer);

        let was_running = !handle.is_finished();
        handle.abort();
        if was_running {
            info!("Stopped region monitor");
        }
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .timer
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    async fn run(self) {
        let mut interval = tokio::time::interval(Duration::from_millis(self.inner.config.interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            // Checks are detached; the next tick skips regions still checking
            let report = self.tick().await;

            if report.active_regions == 0 && self.inner.config.stop_when_idle {
                info!("No active regions, region monitor going idle");
                break;
            }
        }
    }

    /// Run one polling pass.
    ///
    /// Every active region that is not already being checked is marked
    /// `Checking` and checked in its own task. The returned report can be
    /// awaited to wait for those checks.
    pub async fn tick(&self) -> TickReport {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let mut active_regions = 0;
        let mut handles = Vec::new();

        let mut regions = self.inner.regions.write().await;
        for slot in regions.iter_mut().filter(|slot| slot.region.is_active) {
            active_regions += 1;
            if slot.state == RegionState::Checking {
                trace!("Region {} still checking, skipping", slot.region.id);
                continue;
            }

            slot.state = RegionState::Checking;
            let region = slot.region.clone();
            let inner = Arc::clone(&self.inner);
            handles.push(tokio::spawn(async move { inner.check_region(region, epoch).await }));
        }
        drop(regions);

        TickReport {
            active_regions,
            handles,
        }
    }
}

impl Inner {
    fn emit(&self, event: MonitorEvent) {
        if self.events.send(event).is_err() {
            trace!("No event listener, dropping monitor event");
        }
    }

    async fn check_region(&self, region: Region, epoch: u64) {
        let id = region.id;
        let outcome = AssertUnwindSafe(self.run_check(region))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                error!("Check of region {} panicked", id);
                CheckOutcome::Failed
            });
        self.finish_check(id, outcome, epoch).await;
    }

    async fn run_check(&self, region: Region) -> CheckOutcome {
        let image = match self.capturer.capture(&region.bounds, region.display_id).await {
            Ok(image) => image,
            Err(e) => {
                warn!("Capture of region {} failed: {}", region.id, e);
                return CheckOutcome::Failed;
            }
        };

        let fingerprint = Fingerprint::compute(&image, self.config.fingerprint);
        if region.last_fingerprint.as_ref() == Some(&fingerprint) {
            trace!("Region {} unchanged", region.id);
            return CheckOutcome::Unchanged;
        }
        self.store_fingerprint(region.id, fingerprint).await;

        let extracted = match self.extractor.extract(&image).await {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("Text extraction for region {} failed: {}", region.id, e);
                return CheckOutcome::Failed;
            }
        };

        let text = extracted.text.trim();
        if text.is_empty() || text.chars().count() < self.config.min_text_length {
            debug!("Region {} changed but has no usable text", region.id);
            return CheckOutcome::Skipped;
        }

        let classification = classifier::classify_with(text, &self.classifier);
        if self.config.subtitles_only && !classification.is_subtitle {
            debug!(
                "Region {} text '{}' does not look like a subtitle, skipping",
                region.id,
                truncate_text(text, 30)
            );
            return CheckOutcome::Skipped;
        }

        let request = TranslationRequest::new(text, self.source_lang.clone(), self.target_lang.clone());
        let result = self.dispatcher.translate(&request).await;

        CheckOutcome::Translated {
            text: request.text,
            classification,
            result,
        }
    }

    async fn store_fingerprint(&self, id: RegionId, fingerprint: Fingerprint) {
        let mut regions = self.regions.write().await;
        if let Some(slot) = regions.iter_mut().find(|slot| slot.region.id == id) {
            slot.region.last_fingerprint = Some(fingerprint);
        }
    }

    async fn finish_check(&self, id: RegionId, outcome: CheckOutcome, epoch: u64) {
        let mut regions = self.regions.write().await;
        let Some(slot) = regions.iter_mut().find(|slot| slot.region.id == id) else {
            debug!("Region {} was deleted during its check, discarding result", id);
            return;
        };
        slot.state = RegionState::Idle;

        let CheckOutcome::Translated {
            text,
            classification,
            result,
        } = outcome
        else {
            return;
        };

        // Held until the event is sent; stop_monitoring bumps the epoch under it
        let timer = self.timer.lock();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Monitor stopped during check of region {}, discarding result", id);
            return;
        }

        if result.confidence > 0.0 {
            slot.region.last_translation = Some(result.clone());
        }
        let region = slot.region.clone();
        drop(regions);

        self.emit(MonitorEvent::RegionChanged {
            region,
            text,
            classification,
            result,
        });
        drop(timer);
    }
}

use serde::{Deserialize, Serialize};

use crate::classifier::SubtitleClassification;
use crate::region::Region;
use crate::translator::TranslationResult;

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    RegionAdded(Region),
    /// New text appeared in a region and went through the dispatcher.
    ///
    /// Emitted for zero-confidence fallback results too, so stale
    /// translations are never shown silently.
    RegionChanged {
        region: Region,
        text: String,
        classification: SubtitleClassification,
        result: TranslationResult,
    },
    RegionDeleted(Region),
    RegionToggled(Region),
}

impl MonitorEvent {
    pub const fn region(&self) -> &Region {
        match self {
            Self::RegionAdded(region)
            | Self::RegionDeleted(region)
            | Self::RegionToggled(region)
            | Self::RegionChanged { region, .. } => region,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Bounds;

    #[test]
    fn test_event_wire_format() {
        let region = Region::new(Bounds::new(0, 900, 1920, 120), 0).unwrap();
        let event = MonitorEvent::RegionToggled(region.clone());

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "region_toggled");
        assert_eq!(json["is_active"], true);

        let back: MonitorEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.region(), &region);
    }
}

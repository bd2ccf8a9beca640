//! Watched screen regions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use crate::translator::TranslationResult;

/// Display identifier
pub type DisplayId = u32;

/// Opaque region identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(Uuid);

impl RegionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RegionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RegionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| Error::InvalidRegion(format!("bad region id '{s}': {e}")))
    }
}

/// Rectangle in display coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidRegion(format!(
                "bounds must have a positive size, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// A rectangular screen area being watched for content changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub bounds: Bounds,
    pub display_id: DisplayId,
    pub is_active: bool,
    /// Fingerprint of the last captured image
    pub last_fingerprint: Option<Fingerprint>,
    /// Last result that actually carried a translation
    pub last_translation: Option<TranslationResult>,
}

impl Region {
    pub fn new(bounds: Bounds, display_id: DisplayId) -> Result<Self> {
        bounds.validate()?;
        Ok(Self {
            id: RegionId::new(),
            bounds,
            display_id,
            is_active: true,
            last_fingerprint: None,
            last_translation: None,
        })
    }
}

/// Per-region check state. A region is never checked twice at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegionState {
    #[default]
    Idle,
    Checking,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_region_is_active_and_blank() {
        let region = Region::new(Bounds::new(0, 900, 1920, 120), 1).unwrap();
        assert!(region.is_active);
        assert!(region.last_fingerprint.is_none());
        assert_eq!(region.display_id, 1);
    }

    #[test]
    fn test_zero_sized_bounds_rejected() {
        assert!(matches!(
            Region::new(Bounds::new(0, 0, 0, 10), 0),
            Err(Error::InvalidRegion(_))
        ));
        assert!(Bounds::new(-10, -10, 5, 5).validate().is_ok());
    }

    #[test]
    fn test_region_id_roundtrips_through_string() {
        let id = RegionId::new();
        let parsed: RegionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<RegionId>().is_err());
    }
}

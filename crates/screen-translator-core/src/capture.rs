//! Collaborator contracts for screen capture and text extraction.
//!
//! The monitor only depends on these traits; platform capture backends and
//! OCR engines live outside this crate.

use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::region::{Bounds, DisplayId};

/// Grabs the pixels of a screen rectangle
#[async_trait]
pub trait ScreenCapturer: Send + Sync {
    /// Capture `bounds` on `display`. Errors should be
    /// [`Error::CaptureFailure`](crate::Error::CaptureFailure).
    async fn capture(&self, bounds: &Bounds, display: DisplayId) -> Result<DynamicImage>;
}

/// Text recognized in a captured image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    /// Recognizer's own confidence in `[0, 1]`
    pub confidence: f32,
}

impl ExtractedText {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Recognizes text in a captured image (OCR)
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Errors should be
    /// [`Error::ExtractionFailure`](crate::Error::ExtractionFailure).
    async fn extract(&self, image: &DynamicImage) -> Result<ExtractedText>;
}

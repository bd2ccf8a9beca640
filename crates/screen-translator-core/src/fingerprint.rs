//! Content fingerprints for captured region images.
//!
//! A fingerprint is a cheap, deterministic summary of an image. The monitor
//! compares it with the previous one to decide whether the expensive part of
//! the pipeline (OCR and translation) has to run at all.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Side length of the thumbnail used by the average hash (8x8 = 64 bits)
const HASH_SIZE: u32 = 8;

/// How fingerprints are computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintStrategy {
    /// Digest of the raw pixels; any pixel change is a change
    #[default]
    Exact,
    /// Average hash of a grayscale thumbnail; tolerates encoder noise
    Average,
}

/// Opaque content signature. Equal fingerprints mean "no meaningful change".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(image: &DynamicImage, strategy: FingerprintStrategy) -> Self {
        match strategy {
            FingerprintStrategy::Exact => Self::exact(image),
            FingerprintStrategy::Average => Self::average(image),
        }
    }

    /// MD5 over dimensions and pixel bytes.
    ///
    /// Dimensions are part of the digest so that two images with the same
    /// buffer but a different shape never compare equal.
    pub fn exact(image: &DynamicImage) -> Self {
        let mut context = md5::Context::new();
        context.consume(image.width().to_le_bytes());
        context.consume(image.height().to_le_bytes());
        context.consume(image.as_bytes());
        Self(format!("{:x}", context.compute()))
    }

    /// Average hash (aHash)
    ///
    /// Algorithm:
    /// 1. Resize to 8x8
    /// 2. Convert to grayscale
    /// 3. Calculate average brightness
    /// 4. Generate 64-bit hash: bit=1 if pixel > average, else 0
    pub fn average(image: &DynamicImage) -> Self {
        let resized =
            image.resize_exact(HASH_SIZE, HASH_SIZE, image::imageops::FilterType::Triangle);
        let gray = resized.to_luma8();

        let sum: u32 = gray.pixels().map(|p| u32::from(p.0[0])).sum();
        let avg = sum / (HASH_SIZE * HASH_SIZE);

        let mut hash: u64 = 0;
        for (i, pixel) in gray.pixels().enumerate() {
            if u32::from(pixel.0[0]) > avg {
                hash |= 1 << i;
            }
        }

        Self(format!("{hash:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

use thiserror::Error;

/// Unified error type for screen-translator-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Capture operations (grabbing the pixels of a watched region)
/// - Extraction operations (OCR on a captured image)
/// - Translation operations (provider requests, responses, timeouts)
/// - Region bookkeeping
/// - Configuration operations (loading, validation)
///
/// None of these are fatal: the monitor loop and the dispatcher log them and
/// keep running.
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Capture / Extraction Errors
    // ==========================================================================
    /// Failed to capture the pixels of a region
    #[error("failed to capture region: {0}")]
    CaptureFailure(String),

    /// Failed to extract text from a captured image
    #[error("failed to extract text: {0}")]
    ExtractionFailure(String),

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// A provider attempt failed
    #[error("provider '{provider}' failed: {reason}")]
    ProviderFailure { provider: String, reason: String },

    /// A provider attempt did not finish within its timeout
    #[error("provider '{provider}' timed out after {timeout_ms} ms")]
    ProviderTimeout { provider: String, timeout_ms: u64 },

    /// Invalid response from a provider backend
    #[error("invalid provider response: {0}")]
    ProviderInvalidResponse(String),

    /// Rate limited by a provider backend
    #[error("provider rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    ProviderRateLimited { retry_after: Option<u64> },

    /// API key not configured for a provider that needs one
    #[error("provider API key not configured")]
    ProviderMissingApiKey,

    /// No enabled provider could be tried
    #[error("no translation provider available")]
    NoProviderAvailable,

    // ==========================================================================
    // Region Errors
    // ==========================================================================
    /// Region bounds cannot be watched
    #[error("invalid region: {0}")]
    InvalidRegion(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },
}

impl Error {
    pub fn provider(provider: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ProviderFailure {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Error types for provider access and resource analysis

/// Failures reported by a cloud provider collaborator
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Provider API could not be reached
    #[error("{provider} API unavailable: {message}")]
    Unavailable { provider: String, message: String },

    /// Request was throttled; callers may retry after backoff
    #[error("{provider} API rate limited")]
    RateLimited { provider: String },

    /// API answered but reported a logical error
    #[error("{provider} API error: code={code}, message={message}")]
    Api {
        provider: String,
        code: String,
        message: String,
    },

    #[error("Resource not known to provider: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of an on-demand recommendation request
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// A metric series could not be fetched; no partial snapshot is produced
    #[error("failed to get {metric} metric: {source}")]
    MetricQuery {
        metric: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Requested window is longer than the supported maximum
    #[error("invalid window of {days} days (at most {max} allowed)")]
    InvalidWindow { days: u32, max: u32 },
}

impl AnalysisError {
    /// Reject windows longer than [`MAX_WINDOW_DAYS`](crate::models::MAX_WINDOW_DAYS)
    pub fn check_window(days: u32) -> Result<u32, AnalysisError> {
        let max = crate::models::MAX_WINDOW_DAYS;
        if days > max {
            return Err(AnalysisError::InvalidWindow { days, max });
        }
        Ok(days)
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

use reqwest::StatusCode;
use thiserror::Error;

use crate::models::ServiceMode;

/// Classified provider failure. The gateway never lets one of these escape
/// to the caller; every variant maps to a degraded-but-usable result.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parsing error: {0}")]
    Parsing(String),

    #[error("api error: {0}")]
    Api(String),
}

impl ProviderError {
    /// Stable machine-readable kind string for logs and callers.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::QuotaExceeded(_) => "quota_exceeded",
            ProviderError::Network(_) => "network_error",
            ProviderError::Config(_) => "config_error",
            ProviderError::Parsing(_) => "parsing_error",
            ProviderError::Api(_) => "api_error",
        }
    }

    /// Whether a later re-invocation of the same call may succeed.
    pub fn can_retry(&self) -> bool {
        match self {
            ProviderError::QuotaExceeded(_) | ProviderError::Config(_) => false,
            ProviderError::Network(_) | ProviderError::Parsing(_) | ProviderError::Api(_) => true,
        }
    }

    /// The mode the current call degrades to. Broken configuration falls
    /// back to mock so the breakage stays visible instead of silently
    /// degrading forever; everything else uses the offline path.
    pub fn fallback_mode(&self) -> ServiceMode {
        match self {
            ProviderError::Config(_) => ServiceMode::Mock,
            _ => ServiceMode::Offline,
        }
    }

    /// Classify a failed HTTP response from a provider.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::Config(format!("provider rejected credentials ({}): {}", status, body))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                ProviderError::QuotaExceeded(format!("provider rate limit: {}", body))
            }
            s if s.is_server_error() => ProviderError::Api(format!("provider error ({}): {}", s, body)),
            s => ProviderError::Api(format!("unexpected status ({}): {}", s, body)),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            ProviderError::Network(err.to_string())
        } else if err.is_decode() {
            ProviderError::Parsing(err.to_string())
        } else {
            ProviderError::Api(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parsing(err.to_string())
    }
}

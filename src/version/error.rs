use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cache lock poisoned")]
    LockPoisoned,

    #[error("Cache file is corrupt: {0}")]
    Corrupt(String),

    #[error("Invalid cached value for {key}: {reason}")]
    InvalidEntry { key: String, reason: String },
}

/// Errors from registry lookups
///
/// Cloneable so that one lookup result can be handed to every component
/// sharing the same cache key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Registry for '{0}' is disabled")]
    Disabled(String),
}

impl RegistryError {
    /// Whether another attempt may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RegistryError::Network(_) | RegistryError::Timeout(_) | RegistryError::RateLimited { .. }
        )
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RegistryError::Timeout(e.to_string())
        } else if e.is_decode() {
            RegistryError::InvalidResponse(e.to_string())
        } else {
            RegistryError::Network(e.to_string())
        }
    }
}

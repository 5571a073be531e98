//! Registry trait for resolving package releases from upstream sources

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use tracing::{debug, warn};

use crate::config::{DEFAULT_MAX_ATTEMPTS, MAX_RETRY_DELAY_MS, RETRY_BASE_DELAY_MS};
use crate::purl::PackageIdentifier;
use crate::version::error::RegistryError;
use crate::version::types::ResolutionResult;

/// Trait for looking up package releases in a registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Resolves the newest release of the package
    ///
    /// # Returns
    /// * `Ok(ResolutionResult)` - Latest version, its release date and the endpoint label
    /// * `Err(RegistryError)` - If the lookup fails
    async fn resolve_latest(
        &self,
        package: &PackageIdentifier,
    ) -> Result<ResolutionResult, RegistryError>;

    /// Fetches the publication time of the pinned version (`package.version`)
    ///
    /// `Ok(result)` with `release_date: None` means the registry knows the
    /// version but does not publish a timestamp for it.
    async fn release_date(
        &self,
        package: &PackageIdentifier,
    ) -> Result<ResolutionResult, RegistryError>;
}

/// Bounded retry with exponential backoff for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_millis(MAX_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without sleeping
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32, error: &RegistryError) -> Duration {
        let backoff = self.base_delay.saturating_mul(2u32.saturating_pow(attempt - 1));
        let wanted = match error {
            RegistryError::RateLimited {
                retry_after_secs: Some(secs),
            } => backoff.max(Duration::from_secs(*secs)),
            _ => backoff,
        };
        wanted.min(self.max_delay)
    }

    /// Runs `operation` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T, RegistryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RegistryError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt, &e);
                    debug!(
                        "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                        attempt, max_attempts, what, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!("Giving up on {} after {} attempts: {}", what, attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Maps a response status to the registry error taxonomy
///
/// Returns `Ok(())` for success statuses.
pub(crate) fn check_status(
    response: &reqwest::Response,
    package_name: &str,
) -> Result<(), RegistryError> {
    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
        return Err(RegistryError::NotFound(package_name.to_string()));
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(RegistryError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    if status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status == reqwest::StatusCode::GATEWAY_TIMEOUT
    {
        return Err(RegistryError::Timeout(format!(
            "{} returned {}",
            response.url(),
            status
        )));
    }

    if status.is_server_error() {
        return Err(RegistryError::Network(format!(
            "{} returned {}",
            response.url(),
            status
        )));
    }

    if !status.is_success() {
        warn!("Registry returned status {}: {}", status, response.url());
        return Err(RegistryError::InvalidResponse(format!(
            "Unexpected status: {}",
            status
        )));
    }

    Ok(())
}

/// Parses an RFC 3339 timestamp, as used by npm, PyPI, crates.io and CocoaPods
pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
        .or_else(|| {
            // CocoaPods trunk uses "2021-01-08 10:19:42 UTC"
            chrono::NaiveDateTime::parse_from_str(value.trim_end_matches(" UTC"), "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Builds the shared HTTP client for registry implementations
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn run_retries_transient_errors_up_to_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let result: Result<(), _> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(RegistryError::RateLimited {
                        retry_after_secs: Some(60),
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result, Err(RegistryError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn run_does_not_retry_not_found() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let result: Result<(), _> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RegistryError::NotFound("serde".to_string())) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result, Err(RegistryError::NotFound("serde".to_string())));
    }

    #[tokio::test]
    async fn run_returns_first_success_after_timeout() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let result = policy
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(RegistryError::Timeout("slow".to_string()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(1));
    }

    #[test]
    fn delay_for_honours_retry_after_within_cap() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        };

        assert_eq!(
            policy.delay_for(2, &RegistryError::Timeout(String::new())),
            Duration::from_millis(200)
        );
        assert_eq!(
            policy.delay_for(
                1,
                &RegistryError::RateLimited {
                    retry_after_secs: Some(60)
                }
            ),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn parse_timestamp_accepts_rfc3339_and_trunk_format() {
        let expected = chrono::NaiveDate::from_ymd_opt(2021, 1, 8)
            .unwrap()
            .and_hms_opt(10, 19, 42)
            .unwrap()
            .and_utc();

        assert_eq!(parse_timestamp("2021-01-08T10:19:42.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2021-01-08 10:19:42 UTC"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}

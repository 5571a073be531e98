//! crates.io registry API implementation

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::purl::PackageIdentifier;
use crate::version::error::RegistryError;
use crate::version::registry::{Registry, RetryPolicy, check_status, http_client, parse_timestamp};
use crate::version::resolver::LatestVersionResolver;
use crate::version::resolvers::CratesLatestResolver;
use crate::version::types::{PackageVersions, ResolutionResult};

/// Default base URL for crates.io
pub const DEFAULT_BASE_URL: &str = "https://crates.io";

/// Source label recorded on results from this registry
pub const SOURCE: &str = "crates.io";

/// Response from the crates.io crate endpoint
#[derive(Debug, Deserialize)]
struct CrateResponse {
    versions: Vec<CrateVersion>,
}

#[derive(Debug, Deserialize)]
struct CrateVersion {
    num: String,
    #[serde(default)]
    yanked: bool,
    #[serde(default)]
    created_at: Option<String>,
}

/// Registry implementation for the crates.io API
pub struct CratesIoRegistry {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl CratesIoRegistry {
    /// Creates a new CratesIoRegistry with a custom base URL
    pub fn new(base_url: &str) -> Self {
        Self::with_http(
            base_url,
            Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            RetryPolicy::default(),
        )
    }

    pub fn with_http(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            client: http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    /// Fetches all versions of a crate; yanked versions keep their dates but
    /// are left out of the version list
    async fn fetch_versions(&self, crate_name: &str) -> Result<PackageVersions, RegistryError> {
        let url = format!("{}/api/v1/crates/{}", self.base_url, crate_name);
        debug!("Fetching crates.io crate: {}", url);

        let response = self.client.get(&url).send().await?;
        check_status(&response, crate_name)?;

        let crate_info: CrateResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse crates.io response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        let mut release_dates = HashMap::new();
        let mut versions = Vec::new();
        for version in crate_info.versions {
            if let Some(date) = version.created_at.as_deref().and_then(parse_timestamp) {
                release_dates.insert(version.num.clone(), date);
            }
            if !version.yanked {
                versions.push(version.num);
            }
        }
        // The API lists newest first
        versions.reverse();

        Ok(PackageVersions::new(versions).with_release_dates(release_dates))
    }
}

impl Default for CratesIoRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl Registry for CratesIoRegistry {
    async fn resolve_latest(
        &self,
        package: &PackageIdentifier,
    ) -> Result<ResolutionResult, RegistryError> {
        let versions = self
            .retry
            .run(&package.name, || self.fetch_versions(&package.name))
            .await?;

        let latest = CratesLatestResolver
            .resolve_latest(&versions.versions, None)
            .ok_or_else(|| RegistryError::NotFound(package.name.clone()))?;
        let release_date = versions.release_date(&latest);

        Ok(ResolutionResult::new(latest, release_date, SOURCE))
    }

    async fn release_date(
        &self,
        package: &PackageIdentifier,
    ) -> Result<ResolutionResult, RegistryError> {
        let versions = self
            .retry
            .run(&package.name, || self.fetch_versions(&package.name))
            .await?;

        let date = versions
            .release_date(&package.version)
            .ok_or_else(|| RegistryError::NotFound(package.to_purl()))?;

        Ok(ResolutionResult::new(&package.version, Some(date), SOURCE))
    }
}

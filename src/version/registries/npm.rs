//! npm registry API implementation

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::purl::PackageIdentifier;
use crate::version::error::RegistryError;
use crate::version::registry::{Registry, RetryPolicy, check_status, http_client, parse_timestamp};
use crate::version::resolver::LatestVersionResolver;
use crate::version::resolvers::NpmLatestResolver;
use crate::version::semver::parse_version;
use crate::version::types::{PackageVersions, ResolutionResult};

/// Default base URL for npm registry
pub const DEFAULT_BASE_URL: &str = "https://registry.npmjs.org";

pub const SOURCE: &str = "npm";

/// Response from npm registry API
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    #[serde(default)]
    versions: HashMap<String, serde_json::Value>,
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    /// Version to publish time, plus the `created` and `modified` bookkeeping keys
    #[serde(default)]
    time: HashMap<String, String>,
}

/// Registry implementation for npm registry API
pub struct NpmRegistry {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl NpmRegistry {
    /// Creates a new NpmRegistry with a custom base URL
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

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replacen('/', "%2F", 1)
        } else {
            package_name.to_string()
        }
    }

    async fn fetch_versions(&self, package_name: &str) -> Result<PackageVersions, RegistryError> {
        let url = format!(
            "{}/{}",
            self.base_url,
            Self::encode_package_name(package_name)
        );
        debug!("Fetching npm package: {}", url);

        let response = self.client.get(&url).send().await?;
        check_status(&response, package_name)?;

        let package_info: NpmPackageResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse npm registry response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        // Sort versions by semver (lowest first, highest last)
        let mut versions: Vec<(String, semver::Version)> = package_info
            .versions
            .into_keys()
            .filter_map(|v| parse_version(&v).map(|parsed| (v, parsed)))
            .collect();
        versions.sort_by(|(_, a), (_, b)| a.cmp_precedence(b));
        let versions: Vec<String> = versions.into_iter().map(|(v, _)| v).collect();

        let release_dates = package_info
            .time
            .into_iter()
            .filter(|(version, _)| version != "created" && version != "modified")
            .filter_map(|(version, time)| parse_timestamp(&time).map(|date| (version, date)))
            .collect();

        Ok(PackageVersions::with_dist_tags(versions, package_info.dist_tags)
            .with_release_dates(release_dates))
    }
}

impl Default for NpmRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl Registry for NpmRegistry {
    async fn resolve_latest(
        &self,
        package: &PackageIdentifier,
    ) -> Result<ResolutionResult, RegistryError> {
        let versions = self
            .retry
            .run(&package.name, || self.fetch_versions(&package.name))
            .await?;

        let latest = NpmLatestResolver
            .resolve_latest(&versions.versions, Some(&versions.dist_tags))
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

        let known = versions.versions.contains(&package.version)
            || versions.release_dates.contains_key(&package.version);
        if !known {
            return Err(RegistryError::NotFound(package.to_purl()));
        }

        Ok(ResolutionResult::new(
            &package.version,
            versions.release_date(&package.version),
            SOURCE,
        ))
    }
}

//! CocoaPods trunk API implementation

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::purl::PackageIdentifier;
use crate::version::error::RegistryError;
use crate::version::registry::{Registry, RetryPolicy, check_status, http_client, parse_timestamp};
use crate::version::resolver::LatestVersionResolver;
use crate::version::resolvers::CocoaPodsLatestResolver;
use crate::version::types::{PackageVersions, ResolutionResult};

pub const DEFAULT_BASE_URL: &str = "https://trunk.cocoapods.org";

pub const SOURCE: &str = "cocoapods-trunk";

#[derive(Debug, Deserialize)]
struct PodResponse {
    #[serde(default)]
    versions: Vec<PodVersion>,
}

#[derive(Debug, Deserialize)]
struct PodVersion {
    name: String,
    #[serde(default)]
    created_at: Option<String>,
}

pub struct CocoaPodsRegistry {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl CocoaPodsRegistry {
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

    async fn fetch_versions(&self, pod: &str) -> Result<PackageVersions, RegistryError> {
        let url = format!("{}/api/v1/pods/{}", self.base_url, urlencoding::encode(pod));
        debug!("Fetching CocoaPods pod: {}", url);

        let response = self.client.get(&url).send().await?;
        check_status(&response, pod)?;

        let pod_info: PodResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse CocoaPods trunk response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        let release_dates = pod_info
            .versions
            .iter()
            .filter_map(|v| {
                let date = v.created_at.as_deref().and_then(parse_timestamp)?;
                Some((v.name.clone(), date))
            })
            .collect();
        let versions = pod_info.versions.into_iter().map(|v| v.name).collect();

        Ok(PackageVersions::new(versions).with_release_dates(release_dates))
    }
}

impl Default for CocoaPodsRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[async_trait::async_trait]
impl Registry for CocoaPodsRegistry {
    async fn resolve_latest(
        &self,
        package: &PackageIdentifier,
    ) -> Result<ResolutionResult, RegistryError> {
        let versions = self
            .retry
            .run(&package.name, || self.fetch_versions(&package.name))
            .await?;

        let latest = CocoaPodsLatestResolver
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

        if !versions.versions.contains(&package.version) {
            return Err(RegistryError::NotFound(package.to_purl()));
        }

        Ok(ResolutionResult::new(
            &package.version,
            versions.release_date(&package.version),
            SOURCE,
        ))
    }
}

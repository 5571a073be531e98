//! PyPI registry client for fetching Python package releases

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pep508_rs::pep440_rs::Version;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::purl::PackageIdentifier;
use crate::version::error::RegistryError;
use crate::version::registry::{Registry, RetryPolicy, check_status, http_client, parse_timestamp};
use crate::version::resolver::LatestVersionResolver;
use crate::version::resolvers::PypiLatestResolver;
use crate::version::types::{PackageVersions, ResolutionResult};

pub const DEFAULT_PYPI_REGISTRY: &str = "https://pypi.org";

pub const SOURCE: &str = "pypi";

/// PyPI registry client
pub struct PypiRegistry {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl Default for PypiRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_PYPI_REGISTRY)
    }
}

impl PypiRegistry {
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

    async fn fetch_versions(&self, package_name: &str) -> Result<PackageVersions, RegistryError> {
        let url = format!("{}/pypi/{}/json", self.base_url, package_name);
        debug!("Fetching PyPI package: {}", url);

        let response = self.client.get(&url).send().await?;
        check_status(&response, package_name)?;

        let pypi_response: PypiResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse PyPI response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        let mut release_dates = HashMap::new();
        for (version, files) in &pypi_response.releases {
            if let Some(date) = earliest_upload(files) {
                release_dates.insert(version.clone(), date);
            }
        }

        // `info.version` only counts when the release list agrees it exists
        let mut dist_tags = HashMap::new();
        if pypi_response
            .releases
            .contains_key(&pypi_response.info.version)
        {
            dist_tags.insert("latest".to_string(), pypi_response.info.version);
        } else {
            warn!(
                "PyPI info.version {} of {} is not among its releases",
                pypi_response.info.version, package_name
            );
        }

        let versions: Vec<String> = pypi_response.releases.into_keys().collect();
        debug!(
            "Found {} versions for package {}",
            versions.len(),
            package_name
        );

        Ok(PackageVersions::with_dist_tags(versions, dist_tags).with_release_dates(release_dates))
    }
}

/// PyPI JSON API response structure
#[derive(Debug, Deserialize)]
struct PypiResponse {
    info: PypiInfo,
    #[serde(default)]
    releases: HashMap<String, Vec<PypiFile>>,
}

/// Package information from PyPI
#[derive(Debug, Deserialize)]
struct PypiInfo {
    /// Latest version (according to PyPI)
    version: String,
}

#[derive(Debug, Deserialize)]
struct PypiFile {
    #[serde(default)]
    upload_time_iso_8601: Option<String>,
}

/// A release is as old as its first uploaded file
fn earliest_upload(files: &[PypiFile]) -> Option<DateTime<Utc>> {
    files
        .iter()
        .filter_map(|f| f.upload_time_iso_8601.as_deref())
        .filter_map(parse_timestamp)
        .min()
}

/// Looks the pinned version up, tolerating spellings that are equal under
/// PEP 440 (`2.0` vs `2.0.0`)
fn find_pinned<'a>(versions: &'a PackageVersions, pinned: &str) -> Option<&'a str> {
    if let Some(found) = versions.versions.iter().find(|v| *v == pinned) {
        return Some(found);
    }
    let wanted = Version::from_str(pinned).ok()?;
    versions
        .versions
        .iter()
        .find(|v| Version::from_str(v).is_ok_and(|parsed| parsed == wanted))
        .map(String::as_str)
}

#[async_trait]
impl Registry for PypiRegistry {
    async fn resolve_latest(
        &self,
        package: &PackageIdentifier,
    ) -> Result<ResolutionResult, RegistryError> {
        let versions = self
            .retry
            .run(&package.name, || self.fetch_versions(&package.name))
            .await?;

        let latest = PypiLatestResolver
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

        let pinned = find_pinned(&versions, &package.version)
            .ok_or_else(|| RegistryError::NotFound(package.to_purl()))?;

        Ok(ResolutionResult::new(
            &package.version,
            versions.release_date(pinned),
            SOURCE,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purl::Ecosystem;
    use mockito::Server;

    const REQUESTS_BODY: &str = r#"{
        "info": {"name": "requests", "version": "2.31.0"},
        "releases": {
            "2.30.0": [
                {"filename": "requests-2.30.0.tar.gz", "upload_time_iso_8601": "2023-05-03T15:00:00.000000Z"}
            ],
            "2.31.0": [
                {"filename": "requests-2.31.0-py3-none-any.whl", "upload_time_iso_8601": "2023-05-22T15:12:44.175000Z"},
                {"filename": "requests-2.31.0.tar.gz", "upload_time_iso_8601": "2023-05-22T15:12:42.313000Z"}
            ],
            "3.0.0b1": [
                {"filename": "requests-3.0.0b1.tar.gz", "upload_time_iso_8601": "2024-01-01T00:00:00Z"}
            ],
            "0.0.1": []
        }
    }"#;

    fn requests(version: &str) -> PackageIdentifier {
        PackageIdentifier::new(Ecosystem::PyPI, None, "requests", version)
    }

    fn registry(url: &str) -> PypiRegistry {
        PypiRegistry::with_http(url, Duration::from_secs(5), RetryPolicy::immediate(3))
    }

    async fn serve(server: &mut mockito::ServerGuard, body: &str) -> mockito::Mock {
        server
            .mock("GET", "/pypi/requests/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn resolve_latest_uses_info_version_with_earliest_file_date() {
        let mut server = Server::new_async().await;
        let mock = serve(&mut server, REQUESTS_BODY).await;

        let result = registry(&server.url())
            .resolve_latest(&requests("2.30.0"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.latest_version, "2.31.0");
        assert_eq!(result.source, "pypi");
        assert_eq!(
            result.release_date,
            parse_timestamp("2023-05-22T15:12:42.313000Z")
        );
    }

    #[tokio::test]
    async fn resolve_latest_ignores_info_version_missing_from_releases() {
        let mut server = Server::new_async().await;
        let _mock = serve(
            &mut server,
            r#"{
                "info": {"version": "9.9.9"},
                "releases": {"1.0.0": [], "1.1.0": [], "2.0.0rc1": []}
            }"#,
        )
        .await;

        let result = registry(&server.url())
            .resolve_latest(&requests("1.0.0"))
            .await
            .unwrap();

        assert_eq!(result.latest_version, "1.1.0");
        assert_eq!(result.release_date, None);
    }

    #[tokio::test]
    async fn release_date_matches_pep440_equivalent_spelling() {
        let mut server = Server::new_async().await;
        let _mock = serve(&mut server, REQUESTS_BODY).await;

        let result = registry(&server.url())
            .release_date(&requests("2.30"))
            .await
            .unwrap();

        assert_eq!(result.latest_version, "2.30");
        assert_eq!(
            result.release_date,
            parse_timestamp("2023-05-03T15:00:00Z")
        );
    }

    #[tokio::test]
    async fn release_date_is_none_for_release_without_files() {
        let mut server = Server::new_async().await;
        let _mock = serve(&mut server, REQUESTS_BODY).await;

        let result = registry(&server.url())
            .release_date(&requests("0.0.1"))
            .await
            .unwrap();

        assert_eq!(result.release_date, None);
    }

    #[tokio::test]
    async fn release_date_returns_not_found_for_unknown_version() {
        let mut server = Server::new_async().await;
        let _mock = serve(&mut server, REQUESTS_BODY).await;

        let result = registry(&server.url())
            .release_date(&requests("1.0.0"))
            .await;

        assert!(matches!(result, Err(RegistryError::NotFound(_))));
    }

    #[tokio::test]
    async fn resolve_latest_returns_not_found_for_nonexistent_package() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/pypi/nonexistent-package-xyz/json")
            .with_status(404)
            .create_async()
            .await;

        let result = registry(&server.url())
            .resolve_latest(&PackageIdentifier::new(
                Ecosystem::PyPI,
                None,
                "nonexistent-package-xyz",
                "1.0.0",
            ))
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
    }
}

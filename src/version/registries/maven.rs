//! Maven Central and Google Maven registry implementation
//!
//! Latest versions come from `maven-metadata.xml`: Google Maven first for
//! Google-owned groups, then Maven Central (repo1), then the Central search
//! API. Pinned-version release dates come from the search API's `timestamp`,
//! falling back to the `Last-Modified` header of the version's POM.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::purl::PackageIdentifier;
use crate::version::error::RegistryError;
use crate::version::registry::{Registry, RetryPolicy, check_status, http_client};
use crate::version::resolver::LatestVersionResolver;
use crate::version::resolvers::MavenLatestResolver;
use crate::version::types::{PackageVersions, ResolutionResult};

pub const DEFAULT_CENTRAL_URL: &str = "https://repo1.maven.org/maven2";
pub const DEFAULT_GOOGLE_URL: &str = "https://dl.google.com/dl/android/maven2";
pub const DEFAULT_SEARCH_URL: &str = "https://search.maven.org";

pub const SOURCE_GOOGLE: &str = "google-meta";
pub const SOURCE_CENTRAL: &str = "repo1";
pub const SOURCE_SEARCH: &str = "central-fallback";

/// Groups published to Google Maven rather than (or before) Maven Central
pub fn prefers_google_maven(group: &str) -> bool {
    group.starts_with("com.google") || group.starts_with("androidx")
}

/// Whether a version starts with a purely numeric release component
///
/// `33.5.0-jre` qualifies, `momo5.1f.medialive` and `main` do not.
pub fn is_numeric_version_shape(version: &str) -> bool {
    version
        .split(['.', '-'])
        .next()
        .is_some_and(|first| !first.is_empty() && first.chars().all(|c| c.is_ascii_digit()))
}

#[derive(Debug, Deserialize)]
struct MavenMetadata {
    versioning: Option<Versioning>,
}

#[derive(Debug, Deserialize)]
struct Versioning {
    latest: Option<String>,
    release: Option<String>,
    versions: Option<Versions>,
    #[serde(rename = "lastUpdated")]
    last_updated: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Versions {
    #[serde(default)]
    version: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    #[serde(rename = "latestVersion")]
    latest_version: Option<String>,
    /// Milliseconds since the epoch
    timestamp: Option<i64>,
}

/// Registry implementation for Maven repositories
pub struct MavenRegistry {
    client: reqwest::Client,
    central_url: String,
    google_url: String,
    search_url: String,
    retry: RetryPolicy,
}

impl MavenRegistry {
    pub fn new(central_url: &str, google_url: &str, search_url: &str) -> Self {
        Self::with_http(
            central_url,
            google_url,
            search_url,
            Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            RetryPolicy::default(),
        )
    }

    pub fn with_http(
        central_url: &str,
        google_url: &str,
        search_url: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client: http_client(timeout),
            central_url: central_url.trim_end_matches('/').to_string(),
            google_url: google_url.trim_end_matches('/').to_string(),
            search_url: search_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    /// Reads `maven-metadata.xml` of an artifact from one repository
    async fn fetch_metadata(
        &self,
        repository: &str,
        group: &str,
        artifact: &str,
    ) -> Result<PackageVersions, RegistryError> {
        let url = format!(
            "{}/{}/{}/maven-metadata.xml",
            repository,
            group.replace('.', "/"),
            artifact
        );
        debug!("Fetching Maven metadata: {}", url);

        let response = self.client.get(&url).send().await?;
        check_status(&response, &format!("{}:{}", group, artifact))?;
        let body = response.text().await?;

        let metadata: MavenMetadata = quick_xml::de::from_str(&body).map_err(|e| {
            warn!("Failed to parse maven-metadata.xml from {}: {}", url, e);
            RegistryError::InvalidResponse(e.to_string())
        })?;
        let versioning = metadata
            .versioning
            .ok_or_else(|| RegistryError::InvalidResponse(format!("{} has no versioning", url)))?;

        let mut dist_tags = HashMap::new();
        for (tag, value) in [("release", &versioning.release), ("latest", &versioning.latest)] {
            if let Some(version) = value {
                dist_tags.insert(tag.to_string(), version.clone());
            }
        }
        let versions = versioning.versions.unwrap_or_default().version;
        let latest = MavenLatestResolver.resolve_latest(&versions, Some(&dist_tags));

        // lastUpdated marks the last deploy, which is the newest version's
        let mut release_dates = HashMap::new();
        if let (Some(latest), Some(date)) = (
            latest,
            versioning.last_updated.as_deref().and_then(parse_last_updated),
        ) {
            release_dates.insert(latest, date);
        }

        Ok(PackageVersions::with_dist_tags(versions, dist_tags).with_release_dates(release_dates))
    }

    async fn metadata_latest(
        &self,
        repository: &str,
        group: &str,
        artifact: &str,
        source: &str,
    ) -> Result<ResolutionResult, RegistryError> {
        let what = format!("{}:{}", group, artifact);
        let versions = self
            .retry
            .run(&what, || self.fetch_metadata(repository, group, artifact))
            .await?;

        let latest = MavenLatestResolver
            .resolve_latest(&versions.versions, Some(&versions.dist_tags))
            .ok_or_else(|| RegistryError::NotFound(what.clone()))?;
        let release_date = versions.release_date(&latest);

        Ok(ResolutionResult::new(latest, release_date, source))
    }

    async fn search(&self, query: &str, gav: bool) -> Result<Option<SearchDoc>, RegistryError> {
        let mut url = format!(
            "{}/solrsearch/select?q={}&rows=1&wt=json",
            self.search_url,
            urlencoding::encode(query)
        );
        if gav {
            url.push_str("&core=gav");
        }
        debug!("Querying Maven Central search: {}", url);

        let response = self.client.get(&url).send().await?;
        check_status(&response, query)?;
        let body: SearchResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse Maven Central search response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        Ok(body.response.docs.into_iter().next())
    }

    async fn search_latest(
        &self,
        group: &str,
        artifact: &str,
    ) -> Result<ResolutionResult, RegistryError> {
        let query = format!("g:\"{}\" AND a:\"{}\"", group, artifact);
        let doc = self
            .retry
            .run(&query, || self.search(&query, false))
            .await?;

        let Some(SearchDoc {
            latest_version: Some(latest),
            timestamp,
        }) = doc
        else {
            return Err(RegistryError::NotFound(format!("{}:{}", group, artifact)));
        };

        Ok(ResolutionResult::new(
            latest,
            timestamp.and_then(DateTime::from_timestamp_millis),
            SOURCE_SEARCH,
        ))
    }

    /// Pinned version timestamp from the search API; `Ok(None)` when the
    /// index has no record for the coordinates
    async fn search_release_date(
        &self,
        package: &PackageIdentifier,
        group: &str,
    ) -> Result<Option<DateTime<Utc>>, RegistryError> {
        let query = format!(
            "g:\"{}\" AND a:\"{}\" AND v:\"{}\"",
            group, package.name, package.version
        );
        let doc = self
            .retry
            .run(&query, || self.search(&query, true))
            .await?;

        Ok(doc
            .and_then(|d| d.timestamp)
            .and_then(DateTime::from_timestamp_millis))
    }

    /// `Last-Modified` of the version's POM; `Ok(None)` when the POM exists
    /// without the header
    async fn pom_last_modified(
        &self,
        repository: &str,
        package: &PackageIdentifier,
        group: &str,
    ) -> Result<Option<DateTime<Utc>>, RegistryError> {
        let url = format!(
            "{}/{}/{}/{}/{}-{}.pom",
            repository,
            group.replace('.', "/"),
            package.name,
            package.version,
            package.name,
            package.version
        );

        self.retry
            .run(&url, || async {
                debug!("Checking POM: {}", url);
                let response = self.client.head(&url).send().await?;
                check_status(&response, &url)?;
                Ok(response
                    .headers()
                    .get(reqwest::header::LAST_MODIFIED)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
                    .map(|d| d.with_timezone(&Utc)))
            })
            .await
    }
}

impl Default for MavenRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CENTRAL_URL, DEFAULT_GOOGLE_URL, DEFAULT_SEARCH_URL)
    }
}

/// Parses `lastUpdated` values such as `20240115093000`
fn parse_last_updated(value: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(value.trim(), "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn group_of(package: &PackageIdentifier) -> Result<&str, RegistryError> {
    package
        .group
        .as_deref()
        .ok_or_else(|| RegistryError::NotFound(format!("{} has no group", package.to_purl())))
}

/// Keeps the most informative failure: anything beats NotFound
fn worse(current: Option<RegistryError>, next: RegistryError) -> Option<RegistryError> {
    match current {
        Some(existing) if !matches!(existing, RegistryError::NotFound(_)) => Some(existing),
        _ => Some(next),
    }
}

#[async_trait::async_trait]
impl Registry for MavenRegistry {
    async fn resolve_latest(
        &self,
        package: &PackageIdentifier,
    ) -> Result<ResolutionResult, RegistryError> {
        let group = group_of(package)?;
        let artifact = package.name.as_str();

        if prefers_google_maven(group) {
            match self
                .metadata_latest(&self.google_url, group, artifact, SOURCE_GOOGLE)
                .await
            {
                Ok(result) if is_numeric_version_shape(&result.latest_version) => {
                    return Ok(result);
                }
                Ok(result) => debug!(
                    "Google Maven latest {} for {}:{} is not numeric, trying Central",
                    result.latest_version, group, artifact
                ),
                Err(e) => debug!("Google Maven lookup for {}:{} failed: {}", group, artifact, e),
            }
        }

        match self
            .metadata_latest(&self.central_url, group, artifact, SOURCE_CENTRAL)
            .await
        {
            Ok(result) => return Ok(result),
            Err(e) => debug!("repo1 lookup for {}:{} failed: {}", group, artifact, e),
        }

        self.search_latest(group, artifact)
            .await
            .inspect_err(|e| warn!("Maven lookup for {}:{} failed: {}", group, artifact, e))
    }

    async fn release_date(
        &self,
        package: &PackageIdentifier,
    ) -> Result<ResolutionResult, RegistryError> {
        let group = group_of(package)?;
        let mut failure: Option<RegistryError> = None;
        let mut exists = false;

        match self.search_release_date(package, group).await {
            Ok(Some(date)) => {
                return Ok(ResolutionResult::new(
                    &package.version,
                    Some(date),
                    SOURCE_SEARCH,
                ));
            }
            Ok(None) => {}
            Err(e) => failure = worse(failure, e),
        }

        let mut repositories = [
            (self.central_url.as_str(), SOURCE_CENTRAL),
            (self.google_url.as_str(), SOURCE_GOOGLE),
        ];
        if prefers_google_maven(group) {
            repositories.reverse();
        }

        for (repository, source) in repositories {
            match self.pom_last_modified(repository, package, group).await {
                Ok(Some(date)) => {
                    return Ok(ResolutionResult::new(&package.version, Some(date), source));
                }
                Ok(None) => exists = true,
                Err(e) => failure = worse(failure, e),
            }
        }

        if exists {
            return Ok(ResolutionResult::new(&package.version, None, SOURCE_CENTRAL));
        }
        Err(failure.unwrap_or_else(|| RegistryError::NotFound(package.to_purl())))
    }
}

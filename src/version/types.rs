//! Common types shared by registries, cache and coordinator

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a successful registry lookup
///
/// For `latest:` lookups `latest_version` is the newest release; for
/// `release:` lookups it is the pinned version the date belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub latest_version: String,
    pub release_date: Option<DateTime<Utc>>,
    /// Upstream endpoint that produced the answer (e.g. "repo1", "google-meta")
    pub source: String,
    pub resolved_at: DateTime<Utc>,
}

impl ResolutionResult {
    pub fn new(
        latest_version: impl Into<String>,
        release_date: Option<DateTime<Utc>>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            latest_version: latest_version.into(),
            release_date,
            source: source.into(),
            resolved_at: Utc::now(),
        }
    }
}

/// Versions of a package as published by a registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageVersions {
    /// All known (non-yanked) versions, oldest first
    pub versions: Vec<String>,
    /// Registry-provided tags such as npm's `latest`
    pub dist_tags: HashMap<String, String>,
    /// Publication time per version, when the registry exposes it
    pub release_dates: HashMap<String, DateTime<Utc>>,
}

impl PackageVersions {
    pub fn new(versions: Vec<String>) -> Self {
        Self {
            versions,
            ..Default::default()
        }
    }

    pub fn with_dist_tags(versions: Vec<String>, dist_tags: HashMap<String, String>) -> Self {
        Self {
            versions,
            dist_tags,
            ..Default::default()
        }
    }

    pub fn with_release_dates(mut self, release_dates: HashMap<String, DateTime<Utc>>) -> Self {
        self.release_dates = release_dates;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn release_date(&self, version: &str) -> Option<DateTime<Utc>> {
        self.release_dates.get(version).copied()
    }
}

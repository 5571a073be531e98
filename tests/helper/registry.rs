//! Registry test utilities

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use sbom_age_check::purl::PackageIdentifier;
use sbom_age_check::version::error::RegistryError;
use sbom_age_check::version::registry::Registry;
use sbom_age_check::version::types::ResolutionResult;

/// Fixed evaluation instant so ages are deterministic
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    fixed_now() - Duration::days(days)
}

/// In-memory registry that counts the lookups it serves
#[derive(Default)]
pub struct FakeRegistry {
    /// base purl -> newest release
    latest: HashMap<String, ResolutionResult>,
    /// full purl -> release date of that version
    releases: HashMap<String, Option<DateTime<Utc>>>,
    latest_calls: AtomicUsize,
    release_calls: AtomicUsize,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latest(
        mut self,
        base_purl: &str,
        version: &str,
        released: Option<DateTime<Utc>>,
        source: &str,
    ) -> Self {
        self.latest.insert(
            base_purl.to_string(),
            ResolutionResult::new(version, released, source),
        );
        self
    }

    pub fn with_release(mut self, purl: &str, released: Option<DateTime<Utc>>) -> Self {
        self.releases.insert(purl.to_string(), released);
        self
    }

    pub fn latest_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.latest_calls() + self.release_calls()
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn resolve_latest(
        &self,
        package: &PackageIdentifier,
    ) -> Result<ResolutionResult, RegistryError> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        self.latest
            .get(&package.base_purl())
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(package.base_purl()))
    }

    async fn release_date(
        &self,
        package: &PackageIdentifier,
    ) -> Result<ResolutionResult, RegistryError> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        self.releases
            .get(&package.to_purl())
            .map(|released| ResolutionResult::new(&package.version, *released, "fake"))
            .ok_or_else(|| RegistryError::NotFound(package.to_purl()))
    }
}

/// Writes a CycloneDX document listing the given purls
pub fn write_sbom(dir: &TempDir, purls: &[&str]) -> PathBuf {
    let components: Vec<serde_json::Value> = purls
        .iter()
        .map(|purl| serde_json::json!({ "type": "library", "name": purl, "purl": purl }))
        .collect();
    let document = serde_json::json!({
        "bomFormat": "CycloneDX",
        "specVersion": "1.5",
        "components": components,
    });
    let path = dir.path().join("bom.json");
    std::fs::write(&path, serde_json::to_string_pretty(&document).unwrap()).unwrap();
    path
}

//! Bounded concurrent lookups with per-key deduplication
//!
//! Identifiers are grouped by cache key before anything is dispatched, so a
//! key is fetched at most once per run no matter how many components share
//! it. Cache hits never reach the registry; fresh results are written back as
//! each lookup completes.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use tracing::{debug, error, info, warn};

use crate::purl::PackageIdentifier;
use crate::version::cache::{Cache, latest_key, release_key};
use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::types::ResolutionResult;

pub type LookupResults = HashMap<PackageIdentifier, Result<ResolutionResult, RegistryError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Latest,
    ReleaseDate,
}

impl Lookup {
    fn key(self, package: &PackageIdentifier) -> String {
        match self {
            Lookup::Latest => latest_key(package),
            Lookup::ReleaseDate => release_key(package),
        }
    }
}

pub struct Coordinator<R: Registry> {
    registry: Arc<R>,
    cache: Arc<Cache>,
    max_workers: usize,
}

impl<R: Registry> Coordinator<R> {
    pub fn new(registry: Arc<R>, cache: Arc<Cache>, max_workers: usize) -> Self {
        Self {
            registry,
            cache,
            max_workers: max_workers.max(1),
        }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Newest release of every identifier
    pub async fn resolve_many(&self, packages: &[PackageIdentifier]) -> LookupResults {
        self.lookup_many(packages, Lookup::Latest).await
    }

    /// Release date of every identifier's pinned version
    pub async fn release_dates_many(&self, packages: &[PackageIdentifier]) -> LookupResults {
        self.lookup_many(packages, Lookup::ReleaseDate).await
    }

    async fn lookup_many(&self, packages: &[PackageIdentifier], lookup: Lookup) -> LookupResults {
        let mut by_key: IndexMap<String, Vec<&PackageIdentifier>> = IndexMap::new();
        for package in packages {
            by_key.entry(lookup.key(package)).or_default().push(package);
        }

        let mut resolved: HashMap<String, Result<ResolutionResult, RegistryError>> =
            HashMap::new();
        let mut misses = Vec::new();
        for (key, group) in &by_key {
            match self.cache_lookup(key) {
                Some(hit) => {
                    resolved.insert(key.clone(), Ok(hit));
                }
                None => misses.push((key.clone(), group[0])),
            }
        }
        debug!(
            "{:?}: {} keys, {} cached, {} to fetch with {} workers",
            lookup,
            by_key.len(),
            resolved.len(),
            misses.len(),
            self.max_workers
        );

        let fetched: Vec<_> = stream::iter(misses)
            .map(|(key, package)| async move {
                let result = self.fetch_and_cache(&key, package, lookup).await;
                (key, result)
            })
            .buffer_unordered(self.max_workers)
            .collect()
            .await;
        resolved.extend(fetched);

        let mut results = HashMap::with_capacity(packages.len());
        for (key, group) in by_key {
            let Some(result) = resolved.get(&key) else {
                continue;
            };
            for package in group {
                results.insert(package.clone(), result.clone());
            }
        }
        results
    }

    fn cache_lookup(&self, key: &str) -> Option<ResolutionResult> {
        self.cache
            .get(key)
            .inspect_err(|e| warn!("Ignoring unreadable cache entry {}: {}", key, e))
            .ok()
            .flatten()
    }

    async fn fetch_and_cache(
        &self,
        key: &str,
        package: &PackageIdentifier,
        lookup: Lookup,
    ) -> Result<ResolutionResult, RegistryError> {
        let result = match lookup {
            Lookup::Latest => self.registry.resolve_latest(package).await,
            Lookup::ReleaseDate => self.registry.release_date(package).await,
        };

        match &result {
            Ok(resolved) => {
                info!(
                    "Resolved {} -> {} [{}]",
                    key, resolved.latest_version, resolved.source
                );
                let _ = self
                    .cache
                    .put(key, resolved)
                    .inspect_err(|e| error!("Failed to cache {}: {}", key, e));
            }
            Err(RegistryError::NotFound(_)) | Err(RegistryError::Disabled(_)) => {
                debug!("Lookup {} failed: {:?}", key, result);
            }
            Err(e) => warn!("Lookup {} failed: {}", key, e),
        }

        result
    }
}

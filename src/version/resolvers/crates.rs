//! Crates.io latest version resolver

use std::collections::HashMap;

use crate::version::resolver::LatestVersionResolver;
use crate::version::resolvers::{find_semantic_max, find_stable_max};

/// Crates.io latest version resolver
///
/// Picks the highest stable version, the way cargo treats pre-releases as
/// opt-in. Only when a crate has published nothing but pre-releases is the
/// highest pre-release returned. Yanked versions are filtered by the registry.
pub struct CratesLatestResolver;

impl LatestVersionResolver for CratesLatestResolver {
    fn resolve_latest(
        &self,
        versions: &[String],
        _dist_tags: Option<&HashMap<String, String>>,
    ) -> Option<String> {
        find_stable_max(versions).or_else(|| find_semantic_max(versions))
    }
}

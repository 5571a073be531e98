//! Registry-specific latest version resolvers

mod cocoapods;
mod crates;
mod maven;
mod npm;
mod pypi;

pub use cocoapods::CocoaPodsLatestResolver;
pub use crates::CratesLatestResolver;
pub use maven::MavenLatestResolver;
pub use npm::NpmLatestResolver;
pub use pypi::PypiLatestResolver;

use crate::version::semver::parse_version;

/// Find the semantically maximum version from a list
///
/// Handles `v`-prefixed (e.g., "v1.0.0") and partial (e.g., "4.1") versions.
/// Invalid versions are skipped.
pub fn find_semantic_max(versions: &[String]) -> Option<String> {
    versions
        .iter()
        .filter_map(|v| parse_version(v).map(|parsed| (v, parsed)))
        .max_by(|(_, a), (_, b)| a.cmp_precedence(b))
        .map(|(original, _)| original.clone())
}

/// Like [`find_semantic_max`], but skips pre-release versions
pub fn find_stable_max(versions: &[String]) -> Option<String> {
    versions
        .iter()
        .filter_map(|v| parse_version(v).map(|parsed| (v, parsed)))
        .filter(|(_, parsed)| parsed.pre.is_empty())
        .max_by(|(_, a), (_, b)| a.cmp_precedence(b))
        .map(|(original, _)| original.clone())
}

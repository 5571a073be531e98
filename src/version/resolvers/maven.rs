//! Maven latest version resolver

use std::collections::HashMap;

use crate::version::resolver::LatestVersionResolver;
use crate::version::resolvers::find_semantic_max;

/// Maven latest version resolver
///
/// `maven-metadata.xml` carries `<release>` and `<latest>` markers which the
/// registry exposes as dist-tags of the same names. `<release>` excludes
/// snapshots and wins over `<latest>`.
pub struct MavenLatestResolver;

impl LatestVersionResolver for MavenLatestResolver {
    fn resolve_latest(
        &self,
        versions: &[String],
        dist_tags: Option<&HashMap<String, String>>,
    ) -> Option<String> {
        if let Some(tags) = dist_tags {
            for tag in ["release", "latest"] {
                if let Some(version) = tags.get(tag).filter(|v| !v.is_empty()) {
                    return Some(version.clone());
                }
            }
        }

        find_semantic_max(versions).or_else(|| versions.last().cloned())
    }
}

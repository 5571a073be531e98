//! npm latest version resolver

use std::collections::HashMap;

use crate::version::resolver::LatestVersionResolver;
use crate::version::resolvers::{find_semantic_max, find_stable_max};

/// npm latest version resolver
///
/// The `latest` dist-tag is authoritative even when it points below the
/// numeric maximum (staged rollouts, deprecated majors). Without a tag the
/// highest stable version is used.
pub struct NpmLatestResolver;

impl LatestVersionResolver for NpmLatestResolver {
    fn resolve_latest(
        &self,
        versions: &[String],
        dist_tags: Option<&HashMap<String, String>>,
    ) -> Option<String> {
        if let Some(tags) = dist_tags
            && let Some(latest) = tags.get("latest")
        {
            return Some(latest.clone());
        }

        find_stable_max(versions).or_else(|| find_semantic_max(versions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prioritizes_dist_tag_latest_over_higher_versions() {
        let versions = vec![
            "1.0.0".to_string(),
            "2.0.0".to_string(),
            "3.0.0".to_string(),
        ];
        let dist_tags = HashMap::from([("latest".to_string(), "2.0.0".to_string())]);

        assert_eq!(
            NpmLatestResolver.resolve_latest(&versions, Some(&dist_tags)),
            Some("2.0.0".to_string())
        );
    }

    #[test]
    fn falls_back_to_stable_max_without_dist_tag() {
        let versions = vec![
            "1.0.0".to_string(),
            "2.0.0".to_string(),
            "3.0.0-next.1".to_string(),
        ];

        assert_eq!(
            NpmLatestResolver.resolve_latest(&versions, Some(&HashMap::new())),
            Some("2.0.0".to_string())
        );
    }

    #[test]
    fn returns_none_for_empty_versions_and_no_dist_tag() {
        let versions: Vec<String> = vec![];

        assert_eq!(NpmLatestResolver.resolve_latest(&versions, None), None);
    }
}

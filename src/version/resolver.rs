//! Choice of the version reported as "latest" for a package
//!
//! Registries hand back every published version plus whatever markers they
//! keep (npm dist-tags, PyPI `info.version`, Maven `<release>`/`<latest>`).
//! A resolver turns that listing into the single candidate that the engine
//! later validates and compares against the pinned version.

use std::collections::HashMap;

use crate::version::resolvers::find_semantic_max;

/// Per-ecosystem policy for picking the latest release
///
/// | Ecosystem | Policy |
/// |-----------|--------|
/// | crates.io | highest stable version, highest pre-release if nothing else exists |
/// | npm       | `latest` dist-tag, even below the numeric maximum |
/// | PyPI      | `info.version`, then the PEP 440 maximum of final releases |
/// | Maven     | `<release>`, then `<latest>`, then the highest parseable version |
/// | CocoaPods | highest version, two-component versions padded |
///
/// The candidate is not trusted as is: the validator may still reject it.
pub trait LatestVersionResolver: Send + Sync {
    /// `markers` maps registry marker names to versions. Registries without
    /// markers pass `None`.
    fn resolve_latest(
        &self,
        versions: &[String],
        _markers: Option<&HashMap<String, String>>,
    ) -> Option<String> {
        find_semantic_max(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct HighestVersion;

    impl LatestVersionResolver for HighestVersion {}

    #[rstest]
    #[case(&["4.0", "4.0.1", "3.2"], Some("4.0.1"))]
    #[case(&["5.8.0", "5.10.0", "5.9.1"], Some("5.10.0"))]
    #[case(&["trunk", "HEAD"], None)]
    #[case(&[], None)]
    fn default_policy_picks_highest_parseable_version(
        #[case] versions: &[&str],
        #[case] expected: Option<&str>,
    ) {
        let versions: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(
            HighestVersion.resolve_latest(&versions, None),
            expected.map(String::from)
        );
    }

    #[test]
    fn default_policy_disregards_registry_markers() {
        let versions = vec!["1.0.0".to_string(), "2.0.0".to_string()];
        let markers = HashMap::from([("latest".to_string(), "1.0.0".to_string())]);

        assert_eq!(
            HighestVersion.resolve_latest(&versions, Some(&markers)),
            Some("2.0.0".to_string())
        );
    }
}

//! PyPI latest version resolver

use std::collections::HashMap;
use std::str::FromStr;

use pep508_rs::pep440_rs::Version;

use crate::version::resolver::LatestVersionResolver;

/// PyPI latest version resolver
///
/// PyPI reports its own notion of latest in `info.version`, which the registry
/// exposes as the `latest` dist-tag. Without it the PEP 440 maximum among
/// final releases is used.
pub struct PypiLatestResolver;

impl LatestVersionResolver for PypiLatestResolver {
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

        versions
            .iter()
            .filter_map(|v| Version::from_str(v).ok().map(|parsed| (v, parsed)))
            .filter(|(_, parsed)| !parsed.is_pre() && !parsed.is_dev())
            .max_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(original, _)| original.clone())
    }
}

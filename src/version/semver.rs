use std::cmp::Ordering;
use std::str::FromStr;

use semver::Version;

use crate::purl::Ecosystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    Latest,
    Outdated,
    Newer,
    Invalid,
}

impl From<Ordering> for CompareResult {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => CompareResult::Outdated,
            Ordering::Equal => CompareResult::Latest,
            Ordering::Greater => CompareResult::Newer,
        }
    }
}

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Handles partial versions like "1" or "1.2" by padding with zeros and
/// tolerates a leading `v`.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "1.2" -> Version(1, 2, 0)
/// - "v1.2.3" -> Version(1, 2, 3)
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version.strip_prefix('v').unwrap_or(version);
    let (core, suffix) = match version.find(['-', '+']) {
        Some(pos) => version.split_at(pos),
        None => (version, ""),
    };
    let parts: Vec<&str> = core.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0{}", parts[0], suffix),
        2 => format!("{}.{}.0{}", parts[0], parts[1], suffix),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Compare the pinned version against the latest one using the ordering
/// rules of the ecosystem
pub fn compare_versions(ecosystem: Ecosystem, current: &str, latest: &str) -> CompareResult {
    match ecosystem {
        Ecosystem::PyPI => {
            use pep508_rs::pep440_rs::Version as Pep440Version;

            match (
                Pep440Version::from_str(current),
                Pep440Version::from_str(latest),
            ) {
                (Ok(current), Ok(latest)) => current.cmp(&latest).into(),
                _ => CompareResult::Invalid,
            }
        }
        _ => match (parse_version(current), parse_version(latest)) {
            (Some(current), Some(latest)) => current.cmp_precedence(&latest).into(),
            _ => CompareResult::Invalid,
        },
    }
}

/// Whether `latest` names a different release than `current`
///
/// Equivalent spellings such as `1.0` and `1.0.0` count as the same release.
/// A registry may tag an older number as latest, so direction is not checked.
/// Falls back to plain string inequality when either side cannot be parsed.
pub fn is_different_version(ecosystem: Ecosystem, current: &str, latest: &str) -> bool {
    match compare_versions(ecosystem, current, latest) {
        CompareResult::Latest => false,
        CompareResult::Outdated | CompareResult::Newer => true,
        CompareResult::Invalid => current != latest,
    }
}

//! Screening of "latest version" candidates before they are reported
//!
//! Registries occasionally advertise tokens that are not releases at all:
//! vendor forks (`momo5.1f.medialive.20210427105401`), branch names, or
//! snapshot and pre-release builds. Such candidates are only trusted when
//! they were published strictly after the pinned version.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use crate::version::types::ResolutionResult;

/// Optional `v`, a leading number, dotted numeric parts and an optional
/// qualifier (`33.5.0-jre`, `1.0.0+build.1`, `2.1.Final`)
static RELEASE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[vV]?\d+(\.\d+)*([-+._]?[0-9A-Za-z][0-9A-Za-z.+_-]*)?$")
        .expect("valid release shape regex")
});

/// Channel markers, matched as whole tokens between separators or digits
static CHANNEL_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(^|[^a-z])(snapshot|nightly|canary|dev|rc|alpha|beta|preview|experimental|a|b)([^a-z]|$)",
    )
    .expect("valid channel marker regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Accepted,
    Rejected(String),
}

impl Validation {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Validation::Accepted)
    }
}

/// Whether a version string looks like a regular release
pub fn is_release_shaped(version: &str) -> bool {
    RELEASE_SHAPE.is_match(version) && !CHANNEL_MARKER.is_match(version)
}

/// Whether the candidate was published strictly after the pinned version
pub fn is_strictly_newer(
    candidate_date: Option<DateTime<Utc>>,
    current_date: Option<DateTime<Utc>>,
) -> bool {
    matches!((candidate_date, current_date), (Some(candidate), Some(current)) if candidate > current)
}

/// Decides whether `candidate` may be reported as the latest release
///
/// A badly shaped candidate is still accepted when it is strictly newer than
/// the best known release date of the current version.
pub fn validate(
    candidate: &ResolutionResult,
    current_version: &str,
    current_release_date: Option<DateTime<Utc>>,
) -> Validation {
    if is_release_shaped(&candidate.latest_version) {
        return Validation::Accepted;
    }

    if is_strictly_newer(candidate.release_date, current_release_date) {
        debug!(
            "Accepting irregular version {} over {}: published later",
            candidate.latest_version, current_version
        );
        return Validation::Accepted;
    }

    Validation::Rejected(format!(
        "{} is not a release version and is not newer than {}",
        candidate.latest_version, current_version
    ))
}

//! Per-component analysis outcome

use std::fmt;

use chrono::{DateTime, Utc};

use crate::purl::{PackageIdentifier, PurlError};
use crate::version::error::RegistryError;

/// Why a component could not be classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    InvalidIdentifier(String),
    UnsupportedEcosystem(String),
    NotFound,
    LookupFailed(String),
    UnknownReleaseDate,
}

impl From<&PurlError> for UnresolvedReason {
    fn from(e: &PurlError) -> Self {
        match e {
            PurlError::InvalidIdentifier { reason, .. } => {
                UnresolvedReason::InvalidIdentifier(reason.clone())
            }
            PurlError::UnsupportedEcosystem(ecosystem) => {
                UnresolvedReason::UnsupportedEcosystem(ecosystem.clone())
            }
        }
    }
}

impl From<&RegistryError> for UnresolvedReason {
    fn from(e: &RegistryError) -> Self {
        match e {
            RegistryError::NotFound(_) => UnresolvedReason::NotFound,
            RegistryError::Disabled(ecosystem) => {
                UnresolvedReason::UnsupportedEcosystem(ecosystem.clone())
            }
            other => UnresolvedReason::LookupFailed(other.to_string()),
        }
    }
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::InvalidIdentifier(reason) => {
                write!(f, "invalid identifier ({})", reason)
            }
            UnresolvedReason::UnsupportedEcosystem(ecosystem) => {
                write!(f, "unsupported ecosystem ({})", ecosystem)
            }
            UnresolvedReason::NotFound => f.write_str("not found in registry"),
            UnresolvedReason::LookupFailed(reason) => write!(f, "lookup failed ({})", reason),
            UnresolvedReason::UnknownReleaseDate => f.write_str("release date unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Ok,
    Alarm,
    Ignored { reason: Option<String> },
    Unresolved(UnresolvedReason),
}

/// Newer release reported alongside an alarm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub latest_version: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    /// The purl exactly as listed in the SBOM
    pub purl: String,
    /// `None` when the purl could not be parsed
    pub identifier: Option<PackageIdentifier>,
    pub release_date: Option<DateTime<Utc>>,
    pub age_days: Option<i64>,
    pub classification: Classification,
    pub update: Option<Update>,
}

impl Finding {
    pub fn unresolved(
        purl: &str,
        identifier: Option<PackageIdentifier>,
        reason: UnresolvedReason,
    ) -> Self {
        Self {
            purl: purl.to_string(),
            identifier,
            release_date: None,
            age_days: None,
            classification: Classification::Unresolved(reason),
            update: None,
        }
    }

    pub fn is_alarm(&self) -> bool {
        self.classification == Classification::Alarm
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self.classification, Classification::Ignored { .. })
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self.classification, Classification::Unresolved(_))
    }

    /// `<purl>@<version>` with the canonical base purl when available
    pub fn display_purl(&self) -> String {
        match &self.identifier {
            Some(id) => id.to_purl(),
            None => self.purl.clone(),
        }
    }
}

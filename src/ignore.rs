//! Suppression rules for findings
//!
//! An ignore file is a YAML list. Each entry is either a bare purl or a map:
//!
//! ```yaml
//! - pkg:maven/com.example/lib-example@1.0.0
//! - purl: pkg:npm/left-pad
//!   reason: vendored copy
//! - purl_regex: '^pkg:maven/com\.google\.android\.gms/.*'
//!   reason: tracked by platform team
//!   until: 2026-12-31
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum IgnoreError {
    #[error("Failed to read ignore file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Ignore file is not a YAML list: {0}")]
    Document(String),

    #[error("Ignore rule #{index} rejected: {reason}")]
    InvalidRule { index: usize, reason: String },
}

#[derive(Debug, Clone)]
pub enum RuleMatcher {
    /// Matches the purl with or without its version
    Exact(String),
    Regex(Regex),
}

#[derive(Debug, Clone)]
pub struct IgnoreRule {
    pub matcher: RuleMatcher,
    pub reason: Option<String>,
    /// Last day the rule applies
    pub until: Option<NaiveDate>,
}

impl IgnoreRule {
    pub fn exact(purl: &str) -> Self {
        Self {
            matcher: RuleMatcher::Exact(purl.to_string()),
            reason: None,
            until: None,
        }
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }

    pub fn with_until(mut self, until: NaiveDate) -> Self {
        self.until = Some(until);
        self
    }

    fn is_expired(&self, as_of: NaiveDate) -> bool {
        self.until.is_some_and(|until| until < as_of)
    }

    fn matches(&self, candidates: &[&str]) -> bool {
        match &self.matcher {
            RuleMatcher::Exact(purl) => candidates.iter().any(|c| c == purl),
            RuleMatcher::Regex(regex) => candidates.iter().any(|c| regex.is_match(c)),
        }
    }
}

/// Entry shape in the ignore file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRule {
    Bare(String),
    Full {
        purl: Option<String>,
        purl_regex: Option<String>,
        reason: Option<String>,
        until: Option<String>,
    },
}

impl TryFrom<RawRule> for IgnoreRule {
    type Error = String;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        let (purl, purl_regex, reason, until) = match raw {
            RawRule::Bare(purl) => (Some(purl), None, None, None),
            RawRule::Full {
                purl,
                purl_regex,
                reason,
                until,
            } => (purl, purl_regex, reason, until),
        };

        let matcher = match (purl, purl_regex) {
            (Some(purl), None) if !purl.trim().is_empty() => {
                RuleMatcher::Exact(purl.trim().to_string())
            }
            (None, Some(pattern)) => Regex::new(&pattern)
                .map(RuleMatcher::Regex)
                .map_err(|e| format!("invalid purl_regex '{}': {}", pattern, e))?,
            (Some(_), Some(_)) => return Err("both purl and purl_regex given".to_string()),
            _ => return Err("one of purl or purl_regex is required".to_string()),
        };

        let until = until
            .map(|value| {
                NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                    .map_err(|e| format!("invalid until '{}': {}", value, e))
            })
            .transpose()?;

        Ok(IgnoreRule {
            matcher,
            reason,
            until,
        })
    }
}

/// Ordered rule set; exact rules are consulted before regex rules
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    exact: Vec<IgnoreRule>,
    regex: Vec<IgnoreRule>,
}

impl IgnoreRules {
    pub fn new(rules: Vec<IgnoreRule>) -> Self {
        let (exact, regex) = rules
            .into_iter()
            .partition(|rule| matches!(rule.matcher, RuleMatcher::Exact(_)));
        Self { exact, regex }
    }

    /// Loads rules from a file; malformed entries are returned alongside
    /// the rules that did load
    pub fn load(path: &Path) -> Result<(Self, Vec<IgnoreError>), IgnoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| IgnoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Loads rules from a file, falling back to an empty rule set when the
    /// file cannot be read or is not a list
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok((rules, rejected)) => {
                if !rejected.is_empty() {
                    warn!("{} ignore rules were rejected", rejected.len());
                }
                rules
            }
            Err(e) => {
                warn!("{}; continuing without ignore rules", e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<(Self, Vec<IgnoreError>), IgnoreError> {
        if content.trim().is_empty() {
            return Ok((Self::default(), Vec::new()));
        }
        let entries: Option<Vec<serde_yaml_ng::Value>> =
            serde_yaml_ng::from_str(content).map_err(|e| IgnoreError::Document(e.to_string()))?;

        let mut rules = Vec::new();
        let mut rejected = Vec::new();
        for (index, entry) in entries.unwrap_or_default().into_iter().enumerate() {
            let rule = serde_yaml_ng::from_value::<RawRule>(entry)
                .map_err(|e| e.to_string())
                .and_then(IgnoreRule::try_from);
            match rule {
                Ok(rule) => rules.push(rule),
                Err(reason) => {
                    let error = IgnoreError::InvalidRule { index, reason };
                    warn!("{}", error);
                    rejected.push(error);
                }
            }
        }
        debug!(
            "Loaded {} ignore rules ({} rejected)",
            rules.len(),
            rejected.len()
        );

        Ok((Self::new(rules), rejected))
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.regex.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the first live rule matching any of the given spellings of a
    /// component's purl
    pub fn evaluate(&self, purls: &[&str], as_of: NaiveDate) -> Option<&IgnoreRule> {
        self.exact
            .iter()
            .chain(self.regex.iter())
            .filter(|rule| !rule.is_expired(as_of))
            .find(|rule| rule.matches(purls))
    }
}

//! Package-URL (purl) identifiers for the ecosystems this tool can resolve
//!
//! Only the parts needed for a registry lookup are kept: the ecosystem, an
//! optional group (Maven group id, npm scope), the package name and the
//! pinned version. Qualifiers and subpaths are dropped.

use std::fmt;

use thiserror::Error;

/// Package ecosystem (purl type) backed by one upstream registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ecosystem {
    /// crates.io
    Cargo,
    /// npm registry
    Npm,
    /// Python Package Index
    PyPI,
    /// Maven Central and Google Maven
    Maven,
    /// CocoaPods trunk
    CocoaPods,
}

impl Ecosystem {
    pub const ALL: [Ecosystem; 5] = [
        Ecosystem::Cargo,
        Ecosystem::Npm,
        Ecosystem::PyPI,
        Ecosystem::Maven,
        Ecosystem::CocoaPods,
    ];

    /// Returns the purl type string of the ecosystem
    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Cargo => "cargo",
            Ecosystem::Npm => "npm",
            Ecosystem::PyPI => "pypi",
            Ecosystem::Maven => "maven",
            Ecosystem::CocoaPods => "cocoapods",
        }
    }
}

impl std::str::FromStr for Ecosystem {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cargo" => Ok(Ecosystem::Cargo),
            "npm" => Ok(Ecosystem::Npm),
            "pypi" => Ok(Ecosystem::PyPI),
            "maven" => Ok(Ecosystem::Maven),
            "cocoapods" => Ok(Ecosystem::CocoaPods),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurlError {
    #[error("Invalid package identifier '{purl}': {reason}")]
    InvalidIdentifier { purl: String, reason: String },

    #[error("Unsupported ecosystem '{0}'")]
    UnsupportedEcosystem(String),
}

impl PurlError {
    fn invalid(purl: &str, reason: impl Into<String>) -> Self {
        PurlError::InvalidIdentifier {
            purl: purl.to_string(),
            reason: reason.into(),
        }
    }
}

/// A parsed package identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageIdentifier {
    pub ecosystem: Ecosystem,
    /// Maven group id or npm scope (without the leading `@`)
    pub group: Option<String>,
    /// Registry name; npm scoped packages keep the scope (`@types/node`)
    pub name: String,
    /// Version currently pinned by the SBOM
    pub version: String,
}

impl PackageIdentifier {
    pub fn new(
        ecosystem: Ecosystem,
        group: Option<&str>,
        name: &str,
        version: &str,
    ) -> Self {
        Self {
            ecosystem,
            group: group.map(|g| g.to_string()),
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    /// Parse a purl such as `pkg:maven/com.google.guava/guava@31.0.1`
    pub fn parse(raw: &str) -> Result<Self, PurlError> {
        let raw = raw.trim();
        let Some(rest) = raw.strip_prefix("pkg:") else {
            return Err(PurlError::invalid(raw, "missing 'pkg:' scheme"));
        };

        // Subpath and qualifiers never take part in the lookup
        let rest = rest.split('#').next().unwrap_or_default();
        let rest = rest.split('?').next().unwrap_or_default();

        let Some((path, version)) = rest.rsplit_once('@') else {
            return Err(PurlError::invalid(raw, "missing version"));
        };
        let version = decode(raw, version)?;
        if version.is_empty() {
            return Err(PurlError::invalid(raw, "empty version"));
        }

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let Some(purl_type) = segments.next() else {
            return Err(PurlError::invalid(raw, "missing package type"));
        };
        let ecosystem: Ecosystem = purl_type
            .parse()
            .map_err(|_| PurlError::UnsupportedEcosystem(purl_type.to_string()))?;

        let segments = segments
            .map(|s| decode(raw, s))
            .collect::<Result<Vec<_>, _>>()?;
        if segments.is_empty() {
            return Err(PurlError::invalid(raw, "missing package name"));
        }

        match ecosystem {
            Ecosystem::Maven => {
                let [group, artifact] = segments.as_slice() else {
                    return Err(PurlError::invalid(
                        raw,
                        "maven identifiers need exactly a group and an artifact",
                    ));
                };
                if version.eq_ignore_ascii_case("unspecified") {
                    return Err(PurlError::invalid(raw, "placeholder version 'unspecified'"));
                }
                Ok(Self::new(ecosystem, Some(group), artifact, &version))
            }
            Ecosystem::Npm => {
                // The scope may arrive as its own segment or already joined
                // with the name (`%40scope%2Fname`)
                let name = segments.join("/");
                let group = name
                    .strip_prefix('@')
                    .and_then(|scoped| scoped.split_once('/'))
                    .map(|(scope, _)| scope.to_string());
                Ok(Self {
                    ecosystem,
                    group,
                    name,
                    version,
                })
            }
            Ecosystem::PyPI => {
                let name = normalize_pypi_name(&segments.join("/"));
                Ok(Self::new(ecosystem, None, &name, &version))
            }
            Ecosystem::Cargo | Ecosystem::CocoaPods => {
                Ok(Self::new(ecosystem, None, &segments.join("/"), &version))
            }
        }
    }

    /// The purl without version, e.g. `pkg:npm/%40types/node`
    pub fn base_purl(&self) -> String {
        match (&self.ecosystem, &self.group) {
            (Ecosystem::Maven, Some(group)) => {
                format!("pkg:maven/{}/{}", group, self.name)
            }
            (Ecosystem::Npm, Some(_)) => {
                let encoded = self
                    .name
                    .split('/')
                    .map(|s| urlencoding::encode(s).into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                format!("pkg:npm/{}", encoded)
            }
            _ => format!("pkg:{}/{}", self.ecosystem, self.name),
        }
    }

    /// The canonical purl including the pinned version
    pub fn to_purl(&self) -> String {
        format!("{}@{}", self.base_purl(), self.version)
    }

    /// Group component of cache keys; empty when the ecosystem has none
    pub fn group_or_empty(&self) -> &str {
        self.group.as_deref().unwrap_or("")
    }
}

impl fmt::Display for PackageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_purl())
    }
}

fn decode(raw: &str, segment: &str) -> Result<String, PurlError> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|e| PurlError::invalid(raw, format!("bad percent-encoding: {}", e)))
}

/// PEP 503 name normalization: lowercase, runs of `-`, `_`, `.` become `-`
pub fn normalize_pypi_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut last_was_separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !last_was_separator {
                normalized.push('-');
            }
            last_was_separator = true;
        } else {
            normalized.push(c.to_ascii_lowercase());
            last_was_separator = false;
        }
    }
    normalized
}

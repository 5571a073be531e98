//! CycloneDX JSON component reader

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::purl::{PackageIdentifier, PurlError};

#[derive(Debug, Error)]
pub enum SbomError {
    #[error("Failed to read SBOM {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("SBOM {path} is not valid CycloneDX JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// One SBOM entry as handed to the analyzer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbomComponent {
    pub purl: String,
    /// The component's `version` field, used when the purl carries none
    pub version: Option<String>,
}

impl SbomComponent {
    pub fn new(purl: &str, version: Option<&str>) -> Self {
        Self {
            purl: purl.to_string(),
            version: version.map(|v| v.to_string()),
        }
    }

    pub fn identifier(&self) -> Result<PackageIdentifier, PurlError> {
        let base = self.purl.split(['?', '#']).next().unwrap_or_default();
        if !base.contains('@')
            && let Some(version) = self.version.as_deref().filter(|v| !v.is_empty())
        {
            return PackageIdentifier::parse(&format!(
                "{}@{}",
                base,
                urlencoding::encode(version)
            ));
        }
        PackageIdentifier::parse(&self.purl)
    }
}

#[derive(Debug, Deserialize)]
struct CycloneDxBom {
    components: Option<Vec<CdxComponent>>,
}

#[derive(Debug, Deserialize)]
struct CdxComponent {
    #[serde(default)]
    name: Option<String>,
    version: Option<String>,
    purl: Option<String>,
    #[serde(default)]
    components: Vec<CdxComponent>,
}

pub fn load(path: &Path) -> Result<Vec<SbomComponent>, SbomError> {
    let content = std::fs::read_to_string(path).map_err(|source| SbomError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content).map_err(|source| SbomError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Flattens all components, nested ones included, in document order
pub fn parse(content: &str) -> Result<Vec<SbomComponent>, serde_json::Error> {
    let bom: CycloneDxBom = serde_json::from_str(content)?;

    let Some(components) = bom.components else {
        warn!("SBOM has no top-level 'components' entry");
        return Ok(Vec::new());
    };

    let mut flattened = Vec::new();
    collect(components, &mut flattened);
    debug!("Read {} components with a purl", flattened.len());
    Ok(flattened)
}

fn collect(components: Vec<CdxComponent>, out: &mut Vec<SbomComponent>) {
    for component in components {
        match component.purl {
            Some(purl) if !purl.trim().is_empty() => out.push(SbomComponent {
                purl,
                version: component.version,
            }),
            _ => debug!(
                "Skipping component without purl: {}",
                component.name.as_deref().unwrap_or("<unnamed>")
            ),
        }
        collect(component.components, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purl::Ecosystem;
    use tempfile::TempDir;

    #[test]
    fn parse_flattens_nested_components_in_document_order() {
        let components = parse(
            r#"{
                "bomFormat": "CycloneDX",
                "specVersion": "1.5",
                "components": [
                    {
                        "type": "library",
                        "name": "app",
                        "purl": "pkg:maven/com.example/app@1.0.0",
                        "components": [
                            {"type": "library", "name": "inner", "version": "2.0.0", "purl": "pkg:npm/inner@2.0.0"}
                        ]
                    },
                    {"type": "library", "name": "no-purl", "version": "1.0"},
                    {"type": "library", "name": "serde", "version": "1.0.100", "purl": "pkg:cargo/serde@1.0.100"}
                ]
            }"#,
        )
        .unwrap();

        let purls: Vec<&str> = components.iter().map(|c| c.purl.as_str()).collect();
        assert_eq!(
            purls,
            vec![
                "pkg:maven/com.example/app@1.0.0",
                "pkg:npm/inner@2.0.0",
                "pkg:cargo/serde@1.0.100",
            ]
        );
    }

    #[test]
    fn parse_without_components_yields_empty_list() {
        assert_eq!(parse(r#"{"bomFormat": "CycloneDX"}"#).unwrap(), vec![]);
    }

    #[test]
    fn parse_rejects_malformed_json() {
        assert!(parse("{not json").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = load(&temp_dir.path().join("missing.json"));
        assert!(matches!(result, Err(SbomError::Read { .. })));
    }

    #[test]
    fn identifier_uses_declared_version_when_purl_has_none() {
        let component = SbomComponent::new("pkg:pypi/requests?repository_url=x", Some("2.31.0"));

        let id = component.identifier().unwrap();

        assert_eq!(id.ecosystem, Ecosystem::PyPI);
        assert_eq!(id.version, "2.31.0");
    }

    #[test]
    fn identifier_prefers_purl_version() {
        let component = SbomComponent::new("pkg:cargo/serde@1.0.100", Some("9.9.9"));
        assert_eq!(component.identifier().unwrap().version, "1.0.100");
    }
}

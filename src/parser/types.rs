//! Common types for manifest parsers

use std::path::Path;

use crate::purl::{Ecosystem, PackageIdentifier, normalize_pypi_name};

/// Kind of manifest file, detected from its file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestKind {
    /// Cargo.toml
    CargoToml,
    /// package.json
    PackageJson,
    /// pyproject.toml
    PyprojectToml,
    /// requirements.txt, requirements-dev.txt, ...
    RequirementsTxt,
    /// Podfile.lock
    PodfileLock,
    /// build.gradle / build.gradle.kts
    BuildGradle,
}

impl ManifestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestKind::CargoToml => "Cargo.toml",
            ManifestKind::PackageJson => "package.json",
            ManifestKind::PyprojectToml => "pyproject.toml",
            ManifestKind::RequirementsTxt => "requirements.txt",
            ManifestKind::PodfileLock => "Podfile.lock",
            ManifestKind::BuildGradle => "build.gradle",
        }
    }
}

/// Detect the manifest kind from a path's file name
pub fn detect_manifest_kind(path: &Path) -> Option<ManifestKind> {
    let file_name = path.file_name()?.to_str()?;
    match file_name {
        "Cargo.toml" => Some(ManifestKind::CargoToml),
        "package.json" => Some(ManifestKind::PackageJson),
        "pyproject.toml" => Some(ManifestKind::PyprojectToml),
        "Podfile.lock" => Some(ManifestKind::PodfileLock),
        "build.gradle" | "build.gradle.kts" => Some(ManifestKind::BuildGradle),
        name if name.starts_with("requirements") && name.ends_with(".txt") => {
            Some(ManifestKind::RequirementsTxt)
        }
        _ => None,
    }
}

/// A dependency declared directly by a project manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectDependency {
    pub ecosystem: Ecosystem,
    /// Maven group id or npm scope (without `@`)
    pub group: Option<String>,
    /// Registry name; npm scoped packages keep the scope (`@types/node`)
    pub name: String,
}

impl DirectDependency {
    pub fn new(ecosystem: Ecosystem, group: Option<&str>, name: &str) -> Self {
        Self {
            ecosystem,
            group: group.map(|g| g.to_string()),
            name: name.to_string(),
        }
    }

    /// npm dependency; the scope of `@scope/name` becomes the group
    pub fn npm(name: &str) -> Self {
        let group = name
            .strip_prefix('@')
            .and_then(|scoped| scoped.split_once('/'))
            .map(|(scope, _)| scope);
        Self::new(Ecosystem::Npm, group, name)
    }

    /// Key used to match dependencies against SBOM identifiers
    pub fn match_key(&self) -> (Ecosystem, String, String) {
        match_key(self.ecosystem, self.group.as_deref(), &self.name)
    }
}

/// Match key of a parsed SBOM identifier
pub fn identifier_match_key(id: &PackageIdentifier) -> (Ecosystem, String, String) {
    match_key(id.ecosystem, id.group.as_deref(), &id.name)
}

fn match_key(ecosystem: Ecosystem, group: Option<&str>, name: &str) -> (Ecosystem, String, String) {
    let group = group.unwrap_or("").trim().to_ascii_lowercase();
    let name = match ecosystem {
        Ecosystem::PyPI => normalize_pypi_name(name),
        // crates.io treats `-` and `_` as the same name
        Ecosystem::Cargo => name.to_ascii_lowercase().replace('_', "-"),
        Ecosystem::CocoaPods => root_pod(name).to_ascii_lowercase(),
        Ecosystem::Npm | Ecosystem::Maven => name.to_ascii_lowercase(),
    };
    (ecosystem, group, name)
}

/// `Firebase/Analytics` belongs to the `Firebase` pod
pub fn root_pod(name: &str) -> &str {
    name.split('/').next().unwrap_or(name).trim()
}

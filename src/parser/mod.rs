//! Manifest parsers for the direct-dependency overlay
//! - traits.rs: Parser trait definition
//! - types.rs: Common types (DirectDependency, ManifestKind)
//! - cargo_toml.rs: Cargo.toml parser
//! - package_json.rs: package.json parser
//! - pyproject_toml.rs: pyproject.toml parser
//! - requirements_txt.rs: requirements.txt parser
//! - podfile_lock.rs: Podfile.lock parser
//! - build_gradle.rs: build.gradle(.kts) parser

pub mod build_gradle;
pub mod cargo_toml;
pub mod package_json;
pub mod podfile_lock;
pub mod pyproject_toml;
pub mod requirements_txt;
pub mod traits;
pub mod types;

pub use build_gradle::BuildGradleParser;
pub use cargo_toml::CargoTomlParser;
pub use package_json::PackageJsonParser;
pub use podfile_lock::PodfileLockParser;
pub use pyproject_toml::PyprojectTomlParser;
pub use requirements_txt::RequirementsTxtParser;
pub use traits::{ParseError, Parser};
pub use types::{DirectDependency, ManifestKind, detect_manifest_kind};

/// Parser responsible for a manifest kind
pub fn parser_for(kind: ManifestKind) -> Box<dyn Parser + Send + Sync> {
    match kind {
        ManifestKind::CargoToml => Box::new(CargoTomlParser::new()),
        ManifestKind::PackageJson => Box::new(PackageJsonParser::new()),
        ManifestKind::PyprojectToml => Box::new(PyprojectTomlParser::new()),
        ManifestKind::RequirementsTxt => Box::new(RequirementsTxtParser::new()),
        ManifestKind::PodfileLock => Box::new(PodfileLockParser::new()),
        ManifestKind::BuildGradle => Box::new(BuildGradleParser::new()),
    }
}

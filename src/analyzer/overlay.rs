//! Direct-dependency allow-list built from project manifests

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::parser::types::identifier_match_key;
use crate::parser::{DirectDependency, ParseError, detect_manifest_kind, parser_for};
use crate::purl::Ecosystem;
use crate::sbom::SbomComponent;

#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("Unrecognized manifest file: {0}")]
    UnknownKind(PathBuf),

    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse manifest {path}: {source}")]
    Parse { path: PathBuf, source: ParseError },
}

#[derive(Debug, Clone, Default)]
pub struct Overlay {
    keys: HashSet<(Ecosystem, String, String)>,
}

impl Overlay {
    pub fn new(dependencies: impl IntoIterator<Item = DirectDependency>) -> Self {
        Self {
            keys: dependencies.into_iter().map(|d| d.match_key()).collect(),
        }
    }

    /// Union of all readable manifests
    ///
    /// Returns `None` when no manifest could be read, in which case every
    /// component is evaluated.
    pub fn from_manifests(paths: &[PathBuf]) -> Option<Self> {
        let mut dependencies = Vec::new();
        let mut readable = 0;
        for path in paths {
            match load_manifest(path) {
                Ok(found) => {
                    info!("{}: {} direct dependencies", path.display(), found.len());
                    readable += 1;
                    dependencies.extend(found);
                }
                Err(e) => warn!("{}", e),
            }
        }

        if readable == 0 {
            if !paths.is_empty() {
                warn!("No manifest could be read; evaluating all components");
            }
            return None;
        }
        Some(Self::new(dependencies))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keeps components declared in a manifest
    ///
    /// Components whose purl cannot be parsed are kept so that they still
    /// surface as unresolved.
    pub fn filter(&self, components: Vec<SbomComponent>) -> Vec<SbomComponent> {
        let before = components.len();
        let kept: Vec<SbomComponent> = components
            .into_iter()
            .filter(|component| match component.identifier() {
                Ok(id) => self.keys.contains(&identifier_match_key(&id)),
                Err(_) => true,
            })
            .collect();
        debug!(
            "Overlay kept {} of {} components",
            kept.len(),
            before
        );
        kept
    }
}

pub fn load_manifest(path: &Path) -> Result<Vec<DirectDependency>, OverlayError> {
    let kind =
        detect_manifest_kind(path).ok_or_else(|| OverlayError::UnknownKind(path.to_path_buf()))?;
    let content = std::fs::read_to_string(path).map_err(|source| OverlayError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parser_for(kind)
        .parse(&content)
        .map_err(|source| OverlayError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

//! Podfile.lock parser
//!
//! Only the top-level `DEPENDENCIES` list names what the Podfile asked for;
//! `PODS` also contains everything pulled in transitively.
//!
//! ```yaml
//! DEPENDENCIES:
//!   - Alamofire (~> 5.8)
//!   - Firebase/Analytics
//! ```

use serde::Deserialize;
use tracing::warn;

use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::{DirectDependency, root_pod};
use crate::purl::Ecosystem;

#[derive(Debug, Deserialize)]
struct PodfileLock {
    #[serde(rename = "DEPENDENCIES", default)]
    dependencies: Vec<String>,
}

/// Parser for Podfile.lock files
pub struct PodfileLockParser;

impl PodfileLockParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PodfileLockParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for PodfileLockParser {
    fn parse(&self, content: &str) -> Result<Vec<DirectDependency>, ParseError> {
        let lock: PodfileLock = serde_yaml_ng::from_str(content).map_err(|e| {
            warn!("Failed to parse Podfile.lock: {}", e);
            ParseError::InvalidSyntax(e.to_string())
        })?;

        let mut results = Vec::new();
        for entry in &lock.dependencies {
            // `Name (constraint)` or `Name (from `path`)`
            let name = entry.split(" (").next().unwrap_or(entry);
            let pod = root_pod(name);
            if pod.is_empty() {
                continue;
            }
            let dependency = DirectDependency::new(Ecosystem::CocoaPods, None, pod);
            if !results.contains(&dependency) {
                results.push(dependency);
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_extracts_root_pods_of_dependencies() {
        let content = r#"PODS:
  - Alamofire (5.8.1)
  - Firebase/Analytics (10.0.0):
    - Firebase/Core
  - Firebase/Core (10.0.0)

DEPENDENCIES:
  - Alamofire (~> 5.8)
  - Firebase/Analytics
  - Firebase/Crashlytics (= 10.0.0)
  - "LocalKit (from `../LocalKit`)"

SPEC REPOS:
  trunk:
    - Alamofire
    - Firebase

COCOAPODS: 1.15.2
"#;
        let result = PodfileLockParser::new().parse(content).unwrap();
        let names: Vec<&str> = result.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Alamofire", "Firebase", "LocalKit"]);
        assert!(result.iter().all(|d| d.ecosystem == Ecosystem::CocoaPods));
    }

    #[test]
    fn parse_without_dependencies_section_is_empty() {
        let result = PodfileLockParser::new()
            .parse("PODS:\n  - Alamofire (5.8.1)\n")
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn parse_rejects_invalid_yaml() {
        assert!(PodfileLockParser::new().parse("DEPENDENCIES: [unclosed").is_err());
    }
}

//! pyproject.toml parser for Python dependencies (PEP 508)
//!
//! Supports the following sections:
//! - `[project].dependencies` - Main project dependencies
//! - `[build-system].requires` - Build system requirements
//! - `[project.optional-dependencies]` - Optional dependencies
//!
//! URL dependencies (e.g., `pkg @ git+https://...`) are skipped
//! as they don't exist on PyPI.

use std::str::FromStr;

use pep508_rs::{Requirement, VerbatimUrl, VersionOrUrl};
use tracing::warn;

use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::DirectDependency;
use crate::purl::Ecosystem;

/// Parser for pyproject.toml files
pub struct PyprojectTomlParser;

impl PyprojectTomlParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PyprojectTomlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for PyprojectTomlParser {
    fn parse(&self, content: &str) -> Result<Vec<DirectDependency>, ParseError> {
        let mut parser = tree_sitter::Parser::new();
        let language = tree_sitter_toml_ng::LANGUAGE;
        parser.set_language(&language.into()).map_err(|e| {
            warn!("Failed to set TOML language for tree-sitter: {}", e);
            ParseError::TreeSitter(e.to_string())
        })?;

        let tree = parser.parse(content, None).ok_or_else(|| {
            warn!("Failed to parse TOML content");
            ParseError::ParseFailed("Failed to parse TOML".to_string())
        })?;

        let root = tree.root_node();
        let mut results = Vec::new();

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            if child.kind() == "table" {
                self.process_table(child, content, &mut results);
            }
        }

        Ok(results)
    }
}

impl PyprojectTomlParser {
    fn process_table(
        &self,
        table_node: tree_sitter::Node,
        content: &str,
        results: &mut Vec<DirectDependency>,
    ) {
        let Some(header) = table_node.child(0) else {
            return;
        };

        if header.kind() != "[" {
            return;
        }

        let mut cursor = table_node.walk();
        let mut table_name: Option<String> = None;

        for child in table_node.children(&mut cursor) {
            if child.kind() == "bare_key" || child.kind() == "dotted_key" {
                table_name = Some(content[child.byte_range()].to_string());
                break;
            }
        }

        let Some(name) = table_name else {
            return;
        };

        match name.as_str() {
            "project" => self.extract_key_array(table_node, content, Some("dependencies"), results),
            "build-system" => self.extract_key_array(table_node, content, Some("requires"), results),
            // every key holds an array of requirements
            "project.optional-dependencies" => {
                self.extract_key_array(table_node, content, None, results)
            }
            _ => {}
        }
    }

    /// Requirements from the array under `key_name`, or under every key when `None`
    fn extract_key_array(
        &self,
        table_node: tree_sitter::Node,
        content: &str,
        key_name: Option<&str>,
        results: &mut Vec<DirectDependency>,
    ) {
        let mut cursor = table_node.walk();

        for child in table_node.children(&mut cursor) {
            if child.kind() != "pair" {
                continue;
            }
            let mut pair_cursor = child.walk();
            let mut is_target_key = false;

            for pair_child in child.children(&mut pair_cursor) {
                match pair_child.kind() {
                    "bare_key" => {
                        let key = &content[pair_child.byte_range()];
                        is_target_key = key_name.is_none_or(|target| key == target);
                    }
                    "array" if is_target_key => {
                        self.extract_from_array(pair_child, content, results);
                    }
                    _ => {}
                }
            }
        }
    }

    fn extract_from_array(
        &self,
        array_node: tree_sitter::Node,
        content: &str,
        results: &mut Vec<DirectDependency>,
    ) {
        let mut cursor = array_node.walk();

        for child in array_node.children(&mut cursor) {
            if child.kind() != "string" {
                continue;
            }
            // TOML strings are either "..." or '...' (literal string)
            let trimmed = content[child.byte_range()].trim();
            let dep_str = if (trimmed.starts_with('"') && trimmed.ends_with('"'))
                || (trimmed.starts_with('\'') && trimmed.ends_with('\''))
            {
                &trimmed[1..trimmed.len() - 1]
            } else {
                trimmed
            };

            if let Some(dependency) = pep508_dependency(dep_str)
                && !results.contains(&dependency)
            {
                results.push(dependency);
            }
        }
    }
}

/// PyPI dependency named by a PEP 508 requirement; URL requirements yield `None`
pub(crate) fn pep508_dependency(requirement: &str) -> Option<DirectDependency> {
    let req = Requirement::<VerbatimUrl>::from_str(requirement)
        .inspect_err(|e| warn!("Failed to parse dependency '{}': {}", requirement, e))
        .ok()?;

    if matches!(req.version_or_url, Some(VersionOrUrl::Url(_))) {
        return None;
    }

    Some(DirectDependency::new(
        Ecosystem::PyPI,
        None,
        &req.name.to_string(),
    ))
}

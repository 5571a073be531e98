//! package.json parser

use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::DirectDependency;
use tracing::warn;

/// Parser for package.json files
pub struct PackageJsonParser;

impl PackageJsonParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PackageJsonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for PackageJsonParser {
    fn parse(&self, content: &str) -> Result<Vec<DirectDependency>, ParseError> {
        let mut parser = tree_sitter::Parser::new();
        let language = tree_sitter_json::LANGUAGE;
        parser.set_language(&language.into()).map_err(|e| {
            warn!("Failed to set JSON language for tree-sitter: {}", e);
            ParseError::TreeSitter(e.to_string())
        })?;

        let tree = parser.parse(content, None).ok_or_else(|| {
            warn!("Failed to parse JSON content");
            ParseError::ParseFailed("Failed to parse JSON".to_string())
        })?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(ParseError::InvalidSyntax(
                "package.json is not valid JSON".to_string(),
            ));
        }

        let mut results = Vec::new();
        if let Some(document) = root.child(0)
            && document.kind() == "object"
        {
            self.extract_dependencies(document, content, &mut results);
        }

        Ok(results)
    }
}

impl PackageJsonParser {
    /// Dependency field names to extract
    const DEPENDENCY_FIELDS: [&'static str; 4] = [
        "dependencies",
        "devDependencies",
        "peerDependencies",
        "optionalDependencies",
    ];

    /// Package behind an alias such as `npm:pkg@1.0` or `npm:@scope/pkg@^1`
    fn npm_alias_target(value: &str) -> Option<&str> {
        let rest = value.strip_prefix("npm:")?;
        // The version separator is the first `@` after the optional scope
        let search_from = if rest.starts_with('@') {
            rest.find('/')? + 1
        } else {
            0
        };
        let name = match rest[search_from..].find('@') {
            Some(at) => &rest[..search_from + at],
            None => rest,
        };
        Some(name)
    }

    fn extract_dependencies(
        &self,
        object_node: tree_sitter::Node,
        content: &str,
        results: &mut Vec<DirectDependency>,
    ) {
        let mut cursor = object_node.walk();

        for child in object_node.children(&mut cursor) {
            if child.kind() != "pair" {
                continue;
            }

            let Some(key_node) = child.child_by_field_name("key") else {
                continue;
            };

            let key_text = self.get_string_value(key_node, content);

            if !Self::DEPENDENCY_FIELDS.contains(&key_text.as_str()) {
                continue;
            }

            let Some(value_node) = child.child_by_field_name("value") else {
                continue;
            };

            if value_node.kind() == "object" {
                self.extract_packages_from_object(value_node, content, results);
            }
        }
    }

    /// Extract packages from a dependency object (e.g., "dependencies": { ... })
    fn extract_packages_from_object(
        &self,
        object_node: tree_sitter::Node,
        content: &str,
        results: &mut Vec<DirectDependency>,
    ) {
        let mut cursor = object_node.walk();

        for child in object_node.children(&mut cursor) {
            if child.kind() != "pair" {
                continue;
            }

            let Some(key_node) = child.child_by_field_name("key") else {
                continue;
            };
            let key_name = self.get_string_value(key_node, content);

            let spec = child
                .child_by_field_name("value")
                .filter(|value| value.kind() == "string")
                .map(|value| self.get_string_value(value, content))
                .unwrap_or_default();

            let name = Self::npm_alias_target(&spec).unwrap_or(&key_name);
            let dependency = DirectDependency::npm(name);
            if !results.contains(&dependency) {
                results.push(dependency);
            }
        }
    }

    /// Get the string value from a string node (removes quotes)
    fn get_string_value(&self, node: tree_sitter::Node, content: &str) -> String {
        let text = &content[node.byte_range()];
        text.trim()
            .trim_start_matches('"')
            .trim_end_matches('"')
            .to_string()
    }
}

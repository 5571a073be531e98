//! Cargo.toml parser

use indexmap::IndexMap;
use tracing::warn;

use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::DirectDependency;
use crate::purl::Ecosystem;

/// Parser for Cargo.toml files
pub struct CargoTomlParser;

impl CargoTomlParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CargoTomlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for CargoTomlParser {
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

        let mut entries: IndexMap<String, CrateEntry> = IndexMap::new();
        let root = tree.root_node();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            if child.kind() == "table" {
                self.process_table(child, content, &mut entries);
            }
        }

        Ok(entries
            .into_iter()
            .filter(|(_, entry)| !entry.skip)
            .map(|(key, entry)| {
                let name = entry.package.unwrap_or(key);
                DirectDependency::new(Ecosystem::Cargo, None, &name)
            })
            .collect())
    }
}

/// Attributes collected for one dependency key
#[derive(Debug, Default)]
struct CrateEntry {
    /// `package = "..."` rename target
    package: Option<String>,
    /// Not a crates.io dependency
    skip: bool,
}

impl CrateEntry {
    fn apply(&mut self, key: &str, value: Option<String>) {
        match key {
            "package" => self.package = value,
            k if CargoTomlParser::SKIP_KEYS.contains(&k) => self.skip = true,
            _ => {}
        }
    }
}

impl CargoTomlParser {
    /// Dependency table names to extract
    const DEPENDENCY_TABLES: [&'static str; 4] = [
        "dependencies",
        "dev-dependencies",
        "build-dependencies",
        "workspace.dependencies",
    ];

    /// Keys marking dependencies that do not come from crates.io
    const SKIP_KEYS: [&'static str; 3] = ["path", "git", "registry"];

    fn process_table(
        &self,
        table_node: tree_sitter::Node,
        content: &str,
        entries: &mut IndexMap<String, CrateEntry>,
    ) {
        let Some(header) = table_node.child(0) else {
            return;
        };
        if header.kind() != "[" {
            return;
        }

        let mut cursor = table_node.walk();
        let table_name = table_node
            .children(&mut cursor)
            .find(|child| matches!(child.kind(), "bare_key" | "dotted_key" | "quoted_key"))
            .map(|child| key_text(child, content));
        let Some(name) = table_name else {
            return;
        };

        if Self::DEPENDENCY_TABLES.contains(&name.as_str()) {
            let mut cursor = table_node.walk();
            for child in table_node.children(&mut cursor) {
                if child.kind() == "pair" {
                    self.process_dependency_pair(child, content, entries);
                }
            }
            return;
        }

        // [dependencies.serde] style tables describe a single crate
        let Some((table, crate_name)) = Self::DEPENDENCY_TABLES
            .iter()
            .find_map(|t| name.strip_prefix(t)?.strip_prefix('.').map(|c| (t, c)))
        else {
            return;
        };
        let crate_name = crate_name.trim_matches('"').to_string();
        if crate_name.is_empty() {
            warn!("Ignoring malformed [{}] table", table);
            return;
        }
        let entry = entries.entry(crate_name).or_default();
        let mut cursor = table_node.walk();
        for child in table_node.children(&mut cursor) {
            if child.kind() == "pair"
                && let Some((key, value)) = pair_key_value(child, content)
            {
                entry.apply(&key, value);
            }
        }
    }

    /// `serde = "1"`, `serde = { ... }` or dotted `serde.version = "1"`
    fn process_dependency_pair(
        &self,
        pair_node: tree_sitter::Node,
        content: &str,
        entries: &mut IndexMap<String, CrateEntry>,
    ) {
        let mut cursor = pair_node.walk();
        let mut crate_name: Option<String> = None;
        let mut dotted_suffix: Option<String> = None;

        for child in pair_node.children(&mut cursor) {
            match child.kind() {
                "bare_key" | "quoted_key" => {
                    crate_name = Some(key_text(child, content));
                }
                "dotted_key" => {
                    let key = key_text(child, content);
                    if let Some((name, suffix)) = key.split_once('.') {
                        crate_name = Some(name.to_string());
                        dotted_suffix = Some(suffix.to_string());
                    }
                }
                "string" => {
                    if let (Some(name), Some(suffix)) = (&crate_name, &dotted_suffix) {
                        entries
                            .entry(name.clone())
                            .or_default()
                            .apply(suffix, Some(string_value(child, content)));
                    }
                }
                "inline_table" => {
                    if let Some(name) = &crate_name {
                        let entry = entries.entry(name.clone()).or_default();
                        let mut table_cursor = child.walk();
                        for pair in child.children(&mut table_cursor) {
                            if pair.kind() == "pair"
                                && let Some((key, value)) = pair_key_value(pair, content)
                            {
                                entry.apply(&key, value);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        // Plain `serde = "1.0"` or a dotted key with a non-string value
        if let Some(name) = crate_name {
            let entry = entries.entry(name).or_default();
            if let Some(suffix) = dotted_suffix
                && suffix != "package"
            {
                entry.apply(&suffix, None);
            }
        }
    }
}

fn key_text(node: tree_sitter::Node, content: &str) -> String {
    content[node.byte_range()]
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string()
}

fn string_value(node: tree_sitter::Node, content: &str) -> String {
    content[node.byte_range()]
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string()
}

/// Key of a `key = value` pair and its string value, if it has one
fn pair_key_value(pair_node: tree_sitter::Node, content: &str) -> Option<(String, Option<String>)> {
    let mut cursor = pair_node.walk();
    let mut key = None;
    let mut value = None;
    for child in pair_node.children(&mut cursor) {
        match child.kind() {
            "bare_key" | "quoted_key" | "dotted_key" => {
                key = Some(key_text(child, content));
            }
            "string" => value = Some(string_value(child, content)),
            _ => {}
        }
    }
    key.map(|k| (k, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(content: &str) -> Vec<String> {
        CargoTomlParser::new()
            .parse(content)
            .unwrap()
            .into_iter()
            .map(|dep| dep.name)
            .collect()
    }

    #[test]
    fn parse_extracts_dependencies() {
        let content = r#"[package]
name = "my-app"
version = "0.1.0"

[dependencies]
serde = "1.0.0"
"#;
        let result = CargoTomlParser::new().parse(content).unwrap();
        assert_eq!(
            result,
            vec![DirectDependency::new(Ecosystem::Cargo, None, "serde")]
        );
    }

    #[test]
    fn parse_extracts_all_dependency_types() {
        let content = r#"[package]
name = "my-app"

[dependencies]
serde = "1.0"

[dev-dependencies]
mockall = "0.14"

[build-dependencies]
cc = "1.0"
"#;
        assert_eq!(names(content), vec!["serde", "mockall", "cc"]);
    }

    #[test]
    fn parse_extracts_inline_table_dependency() {
        let content = r#"[dependencies]
serde = { version = "1.0", features = ["derive"] }
"#;
        assert_eq!(names(content), vec!["serde"]);
    }

    #[test]
    fn parse_ignores_package_metadata() {
        let content = r#"[package]
name = "my-app"
version = "0.1.0"
"#;
        assert!(names(content).is_empty());
    }

    #[test]
    fn parse_skips_path_git_and_registry_dependencies() {
        let content = r#"[dependencies]
serde = "1.0"
local-crate = { path = "../local-crate" }
forked = { git = "https://github.com/example/forked" }
private-crate = { version = "1.0", registry = "my-registry" }
local.path = "../local"
tokio = "1.0"
"#;
        assert_eq!(names(content), vec!["serde", "tokio"]);
    }

    #[test]
    fn parse_keeps_workspace_inherited_dependencies() {
        let content = r#"[dependencies]
shared = { workspace = true }
tokio.workspace = true
"#;
        assert_eq!(names(content), vec!["shared", "tokio"]);
    }

    #[test]
    fn parse_merges_dotted_keys_of_one_crate() {
        let content = r#"[dependencies]
serde.version = "1.0"
serde.features = ["derive"]
"#;
        assert_eq!(names(content), vec!["serde"]);
    }

    #[test]
    fn parse_respects_package_renames() {
        let content = r#"[dependencies]
json = { package = "serde_json", version = "1.0" }
yaml.package = "serde_yaml_ng"
yaml.version = "0.10"
"#;
        assert_eq!(names(content), vec!["serde_json", "serde_yaml_ng"]);
    }

    #[test]
    fn parse_reads_single_crate_tables() {
        let content = r#"[dependencies.tokio]
version = "1"
features = ["full"]

[dev-dependencies.helper]
path = "../helper"
"#;
        assert_eq!(names(content), vec!["tokio"]);
    }

    #[test]
    fn parse_extracts_workspace_dependencies() {
        let content = r#"[workspace]
members = ["crates/*"]

[workspace.dependencies]
prost = "0.13"
serde = { version = "1.0", features = ["derive"] }
"#;
        assert_eq!(names(content), vec!["prost", "serde"]);
    }

    #[test]
    fn parse_deduplicates_across_tables() {
        let content = r#"[dependencies]
serde = "1.0"

[dev-dependencies]
serde = { version = "1.0", features = ["derive"] }
"#;
        assert_eq!(names(content), vec!["serde"]);
    }
}

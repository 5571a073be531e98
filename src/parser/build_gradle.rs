//! build.gradle / build.gradle.kts parser
//!
//! Extracts Maven coordinates declared in dependency configurations.
//!
//! Format examples:
//! - Groovy: `implementation 'com.squareup.okhttp3:okhttp:4.12.0'`
//! - Kotlin: `implementation("androidx.core:core-ktx:1.12.0")`
//! - BOM: `implementation(platform("com.google.firebase:firebase-bom:32.7.0"))`
//! - Map: `implementation group: 'com.google.guava', name: 'guava', version: '33.0.0-jre'`
//!
//! Project and file dependencies (`project(':lib')`, `files(...)`) are skipped.

use regex::Regex;

use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::DirectDependency;
use crate::purl::Ecosystem;

/// Parser for Gradle build scripts
pub struct BuildGradleParser {
    /// Regex for string notation: `<configuration> ["(] [platform(] "group:artifact[:version]"`
    coordinate_re: Regex,
    /// Regex for map notation: `group: 'g', name: 'a'`
    map_notation_re: Regex,
}

impl BuildGradleParser {
    /// Configurations that are not named `*Implementation`, `*Api`, `*CompileOnly`
    /// or `*RuntimeOnly`
    const EXTRA_CONFIGURATIONS: [&'static str; 7] = [
        "api",
        "kapt",
        "ksp",
        "annotationProcessor",
        "classpath",
        "compile",
        "testCompile",
    ];

    pub fn new() -> Self {
        Self {
            coordinate_re: Regex::new(
                r#"^\s*([A-Za-z]+)\s*\(?\s*(?:(?:enforcedPlatform|platform)\s*\(\s*)?["']([^:"'\s]+):([^:"'\s]+)(?::[^"'\s]*)?["']"#,
            )
            .expect("valid coordinate regex"),
            map_notation_re: Regex::new(
                r#"^\s*([A-Za-z]+)\s*\(?\s*group\s*[:=]\s*["']([^"']+)["']\s*,\s*name\s*[:=]\s*["']([^"']+)["']"#,
            )
            .expect("valid map notation regex"),
        }
    }

    fn is_dependency_configuration(name: &str) -> bool {
        Self::EXTRA_CONFIGURATIONS.contains(&name)
            || ["Implementation", "Api", "CompileOnly", "RuntimeOnly"]
                .iter()
                .any(|suffix| name.ends_with(suffix))
            || matches!(name, "implementation" | "compileOnly" | "runtimeOnly")
    }
}

impl Default for BuildGradleParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for BuildGradleParser {
    fn parse(&self, content: &str) -> Result<Vec<DirectDependency>, ParseError> {
        let mut results = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim();

            // Skip empty lines and comments
            if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with('*') {
                continue;
            }

            let Some(caps) = self
                .coordinate_re
                .captures(trimmed)
                .or_else(|| self.map_notation_re.captures(trimmed))
            else {
                continue;
            };

            if !Self::is_dependency_configuration(&caps[1]) {
                continue;
            }

            let dependency = DirectDependency::new(Ecosystem::Maven, Some(&caps[2]), &caps[3]);
            if !results.contains(&dependency) {
                results.push(dependency);
            }
        }

        Ok(results)
    }
}

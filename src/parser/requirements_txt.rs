//! requirements.txt parser
//!
//! One PEP 508 requirement per logical line. Comments, blank lines and pip
//! options (`-r other.txt`, `-e .`, `--index-url ...`) are skipped, as are
//! trailing per-requirement options such as `--hash=...`.

use crate::parser::pyproject_toml::pep508_dependency;
use crate::parser::traits::{ParseError, Parser};
use crate::parser::types::DirectDependency;

/// Parser for requirements*.txt files
pub struct RequirementsTxtParser;

impl RequirementsTxtParser {
    pub fn new() -> Self {
        Self
    }

    /// Joins `\` continuations into logical lines
    fn logical_lines(content: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();
        for line in content.lines() {
            match line.trim_end().strip_suffix('\\') {
                Some(continued) => {
                    current.push_str(continued);
                    current.push(' ');
                }
                None => {
                    current.push_str(line);
                    lines.push(std::mem::take(&mut current));
                }
            }
        }
        if !current.trim().is_empty() {
            lines.push(current);
        }
        lines
    }
}

impl Default for RequirementsTxtParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for RequirementsTxtParser {
    fn parse(&self, content: &str) -> Result<Vec<DirectDependency>, ParseError> {
        let mut results = Vec::new();

        for line in Self::logical_lines(content) {
            // `#` only starts a comment at line start or after whitespace
            let without_comment = match line.find(" #") {
                Some(pos) => &line[..pos],
                None if line.trim_start().starts_with('#') => "",
                None => line.as_str(),
            };
            let requirement = match without_comment.find(" --") {
                Some(pos) => &without_comment[..pos],
                None => without_comment,
            }
            .trim();

            if requirement.is_empty() || requirement.starts_with('-') {
                continue;
            }

            if let Some(dependency) = pep508_dependency(requirement)
                && !results.contains(&dependency)
            {
                results.push(dependency);
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(content: &str) -> Vec<String> {
        RequirementsTxtParser::new()
            .parse(content)
            .unwrap()
            .into_iter()
            .map(|dep| dep.name)
            .collect()
    }

    #[test]
    fn parse_extracts_requirements() {
        let content = r#"# runtime
requests==2.31.0
Django>=4.2,<5  # web framework

flask[async]>=2.0; python_version >= "3.8"
"#;
        assert_eq!(names(content), vec!["requests", "django", "flask"]);
    }

    #[test]
    fn parse_skips_pip_options_and_includes() {
        let content = r#"--index-url https://pypi.org/simple
-r base.txt
-e .
-c constraints.txt
numpy==1.26.0
"#;
        assert_eq!(names(content), vec!["numpy"]);
    }

    #[test]
    fn parse_handles_hashes_on_continuation_lines() {
        let content = "certifi==2024.2.2 \\\n    --hash=sha256:0569859f95fc761b18b45ef421b1290a0f65f147e92a1e5eb3e635f9a5e4e66f\nidna==3.6\n";
        assert_eq!(names(content), vec!["certifi", "idna"]);
    }

    #[test]
    fn parse_skips_url_requirements() {
        let content = "mypkg @ git+https://github.com/example/mypkg.git\nurllib3==2.2.0\n";
        assert_eq!(names(content), vec!["urllib3"]);
    }
}

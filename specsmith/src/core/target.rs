//! Rendering targets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SpecsmithError;

/// A `<language>:<framework>` pair naming what tests are rendered for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Target language, lower-case.
    pub language: String,
    /// Test framework, lower-case.
    pub framework: String,
}

impl TargetSpec {
    /// Creates a target, normalizing case and whitespace.
    #[must_use]
    pub fn new(language: impl AsRef<str>, framework: impl AsRef<str>) -> Self {
        Self {
            language: language.as_ref().trim().to_lowercase(),
            framework: framework.as_ref().trim().to_lowercase(),
        }
    }

    /// Parses `<language>:<framework>`.
    pub fn parse(descriptor: &str) -> Result<Self, SpecsmithError> {
        let (language, framework) = descriptor
            .split_once(':')
            .ok_or_else(|| SpecsmithError::InvalidTarget(descriptor.to_string()))?;

        let target = Self::new(language, framework);
        if target.language.is_empty() || target.framework.is_empty() {
            return Err(SpecsmithError::InvalidTarget(descriptor.to_string()));
        }
        Ok(target)
    }

    /// The conventional target for a source language, if there is one.
    #[must_use]
    pub fn default_for_language(language: &str) -> Option<Self> {
        let framework = match language.trim().to_lowercase().as_str() {
            "python" => "pytest",
            "javascript" | "typescript" => "jest",
            "go" => "testing",
            "java" => "junit5",
            "rust" => "cargo",
            _ => return None,
        };
        Some(Self::new(language, framework))
    }

    /// File name of a rendered test for the given safe id.
    #[must_use]
    pub fn file_name(&self, safe_id: &str) -> String {
        let base = format!("test_{safe_id}");
        match (self.language.as_str(), self.framework.as_str()) {
            ("python", "pytest") => format!("{base}.py"),
            ("javascript", "jest") => format!("{base}.test.js"),
            ("typescript", "jest") => format!("{base}.test.ts"),
            ("go", "testing") => format!("{base}_test.go"),
            ("java", fw) if fw.starts_with("junit") => format!("{base}.java"),
            ("rust", "cargo") => format!("{base}.rs"),
            _ => format!("{base}.txt"),
        }
    }
}

impl FromStr for TargetSpec {
    type Err = SpecsmithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.language, self.framework)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_normalizes() {
        let target: TargetSpec = " Python : PyTest ".parse().unwrap();
        assert_eq!(target, TargetSpec::new("python", "pytest"));
        assert_eq!(target.to_string(), "python:pytest");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            TargetSpec::parse("python"),
            Err(SpecsmithError::InvalidTarget(_))
        ));
        assert!(TargetSpec::parse("python:").is_err());
        assert!(TargetSpec::parse(":jest").is_err());
    }

    #[test]
    fn test_file_names() {
        let cases = [
            ("python:pytest", "test_m__f.py"),
            ("javascript:jest", "test_m__f.test.js"),
            ("typescript:jest", "test_m__f.test.ts"),
            ("go:testing", "test_m__f_test.go"),
            ("java:junit4", "test_m__f.java"),
            ("java:junit5", "test_m__f.java"),
            ("rust:cargo", "test_m__f.rs"),
            ("python:unittest", "test_m__f.txt"),
            ("kotlin:kotest", "test_m__f.txt"),
        ];
        for (descriptor, expected) in cases {
            let target = TargetSpec::parse(descriptor).unwrap();
            assert_eq!(target.file_name("m__f"), expected, "{descriptor}");
        }
    }

    #[test]
    fn test_default_targets() {
        assert_eq!(
            TargetSpec::default_for_language("TypeScript"),
            Some(TargetSpec::new("typescript", "jest"))
        );
        assert_eq!(
            TargetSpec::default_for_language("java"),
            Some(TargetSpec::new("java", "junit5"))
        );
        assert_eq!(TargetSpec::default_for_language("cobol"), None);
    }
}

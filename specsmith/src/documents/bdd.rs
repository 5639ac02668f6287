//! BDD survey and feature documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::StructuredDocument;
use crate::core::{WorkItem, WorkKey};

/// One Gherkin step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BddStep {
    /// `Given`, `When`, `Then`, `And` or `But`.
    pub keyword: String,
    /// Step text.
    pub text: String,
    /// Optional data table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_table: Option<Vec<Vec<String>>>,
    /// Optional doc string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_string: Option<String>,
}

/// A scenario or scenario outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BddScenario {
    /// Scenario name.
    pub name: String,
    /// Tags such as `@happy`.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Steps in order.
    #[serde(default)]
    pub steps: Vec<BddStep>,
    /// Example rows for outlines.
    #[serde(default)]
    pub examples: Option<Vec<Map<String, Value>>>,
    /// Whether this is a scenario outline.
    #[serde(default, alias = "isOutline")]
    pub is_outline: bool,
}

/// A feature with its scenarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BddFeature {
    /// Feature name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Feature tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Background steps shared by every scenario.
    #[serde(default)]
    pub background: Vec<BddStep>,
    /// Scenarios.
    #[serde(default)]
    pub scenarios: Vec<BddScenario>,
}

impl BddFeature {
    /// File name of the `.feature` file for this feature.
    ///
    /// Always a single path component, whatever the name contains.
    #[must_use]
    pub fn file_name(&self) -> String {
        let slug = slugify(&self.name);
        if slug.is_empty() {
            "feature.feature".to_string()
        } else {
            format!("{slug}.feature")
        }
    }

    /// Renders the feature as Gherkin text.
    #[must_use]
    pub fn to_gherkin(&self) -> String {
        let mut lines = Vec::new();
        if !self.tags.is_empty() {
            lines.push(self.tags.join(" "));
        }
        lines.push(format!("Feature: {}", self.name));
        if !self.description.is_empty() {
            lines.push(format!("  {}", self.description));
        }
        if !self.background.is_empty() {
            lines.push("  Background:".to_string());
            for step in &self.background {
                lines.push(format!("    {} {}", step.keyword, step.text));
            }
        }
        for scenario in &self.scenarios {
            if !scenario.tags.is_empty() {
                lines.push(format!("  {}", scenario.tags.join(" ")));
            }
            let prefix = if scenario.is_outline {
                "Scenario Outline"
            } else {
                "Scenario"
            };
            lines.push(format!("  {prefix}: {}", scenario.name));
            for step in &scenario.steps {
                lines.push(format!("    {} {}", step.keyword, step.text));
            }
            if let (true, Some(rows)) = (scenario.is_outline, scenario.examples.as_ref()) {
                push_examples(&mut lines, rows);
            }
        }
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

fn push_examples(lines: &mut Vec<String>, rows: &[Map<String, Value>]) {
    if rows.is_empty() {
        return;
    }
    let headers: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();
    let headers: Vec<&str> = headers.into_iter().collect();

    lines.push("    Examples:".to_string());
    lines.push(format!("      | {} |", headers.join(" | ")));
    for row in rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| match row.get(*h) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect();
        lines.push(format!("      | {} |", cells.join(" | ")));
    }
}

/// Merged BDD output: every feature plus the overall rationale.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Coverage rationale.
    #[serde(default)]
    pub rationale: String,
    /// Features in capability order.
    #[serde(default)]
    pub features: Vec<BddFeature>,
}

impl StructuredDocument for FeatureSpec {
    const SCHEMA: &'static str = "bdd_feature";

    fn fallback() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A high-level capability found by the survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BddCapability {
    /// Capability name.
    pub name: String,
    /// What it provides.
    #[serde(default)]
    pub description: String,
    /// Tags such as `@core`.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Language-prefixed qualified names, e.g. `rust:module.Type.method`.
    #[serde(default, alias = "involvedSymbols")]
    pub involved_symbols: Vec<String>,
    /// High-level step outlines.
    #[serde(default, alias = "criticalPaths")]
    pub critical_paths: Vec<Vec<String>>,
}

impl BddCapability {
    /// Lower-case, underscore-separated form of the name.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

impl WorkItem for BddCapability {
    fn key(&self) -> WorkKey {
        WorkKey::new("capability", self.slug())
    }
}

/// Stage-one survey of the API surface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BddSurvey {
    /// Holistic coverage rationale.
    #[serde(default)]
    pub rationale: String,
    /// Capabilities found.
    #[serde(default)]
    pub capabilities: Vec<BddCapability>,
}

impl StructuredDocument for BddSurvey {
    const SCHEMA: &'static str = "bdd_survey";

    fn fallback() -> Self {
        Self {
            rationale: "LLM returned non-JSON".to_string(),
            capabilities: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn step(keyword: &str, text: &str) -> BddStep {
        BddStep {
            keyword: keyword.to_string(),
            text: text.to_string(),
            data_table: None,
            doc_string: None,
        }
    }

    #[test]
    fn test_capability_slug() {
        let capability: BddCapability =
            serde_json::from_str(r#"{"name":"  User Sign-Up & Login "}"#).unwrap();
        assert_eq!(capability.slug(), "user_sign_up_login");
        assert_eq!(capability.key().to_string(), "capability__user_sign_up_login");
    }

    #[test]
    fn test_gherkin_rendering() {
        let mut row = Map::new();
        row.insert("user".into(), Value::String("ann".into()));
        row.insert("age".into(), Value::from(30));

        let feature = BddFeature {
            name: "Account Login".into(),
            description: "Users sign in".into(),
            tags: vec!["@auth".into()],
            background: vec![step("Given", "a registered user")],
            scenarios: vec![BddScenario {
                name: "valid password".into(),
                tags: vec![],
                steps: vec![step("When", "they log in as <user>"), step("Then", "it works")],
                examples: Some(vec![row]),
                is_outline: true,
            }],
        };

        let expected = [
            "@auth",
            "Feature: Account Login",
            "  Users sign in",
            "  Background:",
            "    Given a registered user",
            "  Scenario Outline: valid password",
            "    When they log in as <user>",
            "    Then it works",
            "    Examples:",
            "      | age | user |",
            "      | 30 | ann |",
            "",
        ]
        .join("\n");

        assert_eq!(feature.to_gherkin(), expected);
        assert_eq!(feature.file_name(), "account_login.feature");
    }

    #[test]
    fn test_feature_file_name_stays_in_one_directory() {
        let named = |name: &str| BddFeature {
            name: name.to_string(),
            description: String::new(),
            tags: vec![],
            background: vec![],
            scenarios: vec![],
        };

        assert_eq!(named("Cart / Checkout").file_name(), "cart_checkout.feature");
        assert_eq!(named("../../etc/passwd").file_name(), "etc_passwd.feature");
        assert_eq!(named("Über Größe").file_name(), "über_größe.feature");
        assert_eq!(named("...").file_name(), "feature.feature");
    }

    #[test]
    fn test_survey_fallback() {
        let survey = BddSurvey::fallback();
        assert!(survey.is_empty());
        assert_eq!(survey.rationale, "LLM returned non-JSON");
    }
}

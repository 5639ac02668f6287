//! Natural-language test plans.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::StructuredDocument;
use crate::core::{ApiSymbol, WorkItem, WorkKey};

/// Category of a planned test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseCategory {
    /// Ordinary behavior.
    #[default]
    Functional,
    /// Unusual but valid inputs.
    Edge,
    /// Limits of valid ranges.
    Boundary,
    /// Error paths and invalid inputs.
    Error,
    /// Invariants that hold across inputs.
    Property,
    /// Any category the model invented.
    #[serde(other)]
    Other,
}

/// One planned test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Short title.
    pub title: String,
    /// Behavioral purpose.
    pub description: String,
    /// Setup and interaction steps.
    #[serde(default)]
    pub steps: Vec<String>,
    /// Structured inputs.
    #[serde(default)]
    pub inputs: Map<String, Value>,
    /// Observable outcomes.
    #[serde(default)]
    pub expected: Map<String, Value>,
    /// Case category.
    #[serde(default)]
    pub category: CaseCategory,
}

/// A test plan as returned by the model, before it is bound to a symbol.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TestPlanDocument {
    /// Why these cases were chosen.
    #[serde(default)]
    pub rationale: String,
    /// Boundaries and invariants worth validating.
    #[serde(default, alias = "coverageNotes")]
    pub coverage_notes: Vec<String>,
    /// The planned cases.
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

impl StructuredDocument for TestPlanDocument {
    const SCHEMA: &'static str = "test_spec";

    fn fallback() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.cases.is_empty() && self.rationale.trim().is_empty() && self.coverage_notes.is_empty()
    }
}

/// A test plan bound to the symbol it covers. This is what gets persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSpec {
    /// The symbol under test.
    pub symbol: ApiSymbol,
    /// Why these cases were chosen.
    #[serde(default)]
    pub rationale: String,
    /// Boundaries and invariants worth validating.
    #[serde(default)]
    pub coverage_notes: Vec<String>,
    /// The planned cases.
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

impl TestSpec {
    /// Binds a decoded plan to its symbol.
    #[must_use]
    pub fn from_plan(symbol: ApiSymbol, plan: TestPlanDocument) -> Self {
        Self {
            symbol,
            rationale: plan.rationale,
            coverage_notes: plan.coverage_notes,
            cases: plan.cases,
        }
    }

    /// The sentinel spec for a symbol whose planning failed.
    #[must_use]
    pub fn empty(symbol: ApiSymbol) -> Self {
        Self::from_plan(symbol, TestPlanDocument::default())
    }

    /// True when there are no cases and no notes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty() && self.rationale.trim().is_empty() && self.coverage_notes.is_empty()
    }
}

impl WorkItem for TestSpec {
    fn key(&self) -> WorkKey {
        self.symbol.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SymbolKind;

    #[test]
    fn test_unknown_category_is_other() {
        let case: TestCase = serde_json::from_str(
            r#"{"title":"t","description":"d","category":"performance"}"#,
        )
        .unwrap();
        assert_eq!(case.category, CaseCategory::Other);
        assert!(case.steps.is_empty());

        let case: TestCase = serde_json::from_str(r#"{"title":"t","description":"d"}"#).unwrap();
        assert_eq!(case.category, CaseCategory::Functional);
    }

    #[test]
    fn test_plan_emptiness() {
        assert!(TestPlanDocument::fallback().is_empty());

        let notes_only = TestPlanDocument {
            coverage_notes: vec!["overflow".into()],
            ..TestPlanDocument::default()
        };
        assert!(!notes_only.is_empty());
    }

    #[test]
    fn test_spec_keeps_symbol_key() {
        let symbol = ApiSymbol::new("f", "m.f", SymbolKind::Function, "python", "m.py");
        let spec = TestSpec::empty(symbol.clone());

        assert!(spec.is_empty());
        assert_eq!(spec.key(), symbol.key());
    }
}

//! Prompt text for every generation stage.

use serde_json::{json, Value};
use std::fmt::Write;

use crate::core::{ApiSymbol, TargetSpec};
use crate::documents::{BddCapability, TestSpec};

/// Symbols listed in the survey prompt at most.
pub const SURVEY_SYMBOL_CAP: usize = 100;

pub(crate) const PLANNER_SYSTEM: &str = "You are a test architect. You design behavioral test plans \
that are thorough and free of overlap, working from first principles, boundary analysis, \
properties and error paths. You answer with strict JSON in the requested schema and nothing else.";

pub(crate) const RENDER_SYSTEM: &str = "You are a senior engineer writing idiomatic unit tests. \
Follow the conventions of the target language and framework, keep tests isolated, structure them \
as arrange/act/assert and do not mock internal implementation details.";

pub(crate) const BDD_SYSTEM: &str = "You are a senior QA engineer designing high-level BDD \
features. Look for flows that cross modules and types, user journeys and system behaviors. Cover \
happy paths, edge cases, error paths and permissions where relevant. You answer with strict JSON \
in the requested schema and nothing else.";

/// Framework guidance for a target, empty when none is known.
#[must_use]
pub fn target_hint(target: &TargetSpec) -> &'static str {
    match (target.language.as_str(), target.framework.as_str()) {
        ("python", "pytest") => {
            "Write pytest test functions, use fixtures where they help and parametrize input partitions."
        }
        ("javascript", "jest") => {
            "Write Jest tests with describe/it blocks, async/await for asynchronous code and expect matchers."
        }
        ("typescript", "jest") => {
            "Write typed TypeScript Jest tests with imports and describe/it blocks."
        }
        ("go", "testing") => {
            "Use the standard testing package with table-driven tests and t.Run subtests."
        }
        ("java", "junit5") => {
            "Use JUnit 5 @Test methods and Assertions, assuming a Maven or Gradle layout."
        }
        ("rust", "cargo") => {
            "Use a #[cfg(test)] mod tests with #[test] functions and assert!/assert_eq!, runnable with cargo test."
        }
        _ => "",
    }
}

fn test_plan_schema() -> Value {
    json!({
        "rationale": "Why these cases give high coverage",
        "coverage_notes": ["Boundaries, invariants and properties worth validating"],
        "cases": [{
            "title": "Short and descriptive",
            "description": "Behavior the test pins down",
            "steps": ["Setup or interaction steps"],
            "inputs": {"...": "Structured inputs where applicable"},
            "expected": {"...": "Observable outcomes or assertions"},
            "category": "functional|edge|boundary|error|property"
        }]
    })
}

fn survey_schema() -> Value {
    json!({
        "rationale": "Overall coverage rationale",
        "capabilities": [{
            "name": "High-level capability",
            "description": "What the system provides to its users",
            "tags": ["@core", "@security"],
            "involved_symbols": ["rust:module.Type.method"],
            "critical_paths": [["user action", "system response"]]
        }]
    })
}

fn feature_schema() -> Value {
    json!({
        "rationale": "Why these features",
        "features": [{
            "name": "Feature name",
            "description": "Short description",
            "tags": ["@api"],
            "background": [{"keyword": "Given", "text": "shared setup"}],
            "scenarios": [{
                "name": "Scenario name",
                "tags": ["@happy"],
                "steps": [
                    {"keyword": "Given", "text": "precondition"},
                    {"keyword": "When", "text": "action"},
                    {"keyword": "Then", "text": "expected outcome"}
                ],
                "is_outline": false,
                "examples": null
            }]
        }]
    })
}

/// Prompt asking for a test plan for one symbol.
#[must_use]
pub fn planner_prompt(symbol: &ApiSymbol) -> String {
    let mut prompt = format!(
        "Target symbol: {} [{} in {}]",
        symbol.qualified_name, symbol.kind, symbol.language
    );
    if let Some(signature) = &symbol.signature {
        let _ = write!(prompt, "\nSignature: {signature}");
    }
    if let Some(docstring) = &symbol.docstring {
        let _ = write!(prompt, "\nDocumentation:\n{docstring}");
    }

    let _ = write!(
        prompt,
        "\n\nDesign natural-language test cases covering:\n\
         - the behavior decomposed from first principles\n\
         - edge and boundary conditions\n\
         - error paths and invalid inputs\n\
         - idempotence and invariants where they apply\n\
         Keep overlap between cases minimal.\n\n\
         Answer with strict JSON in this schema, without commentary or code:\n{:#}",
        test_plan_schema()
    );
    prompt
}

/// Prompt asking for executable tests from a plan.
pub fn render_prompt(spec: &TestSpec, target: &TargetSpec) -> Result<String, serde_json::Error> {
    let plan = serde_json::to_string_pretty(spec)?;
    Ok(format!(
        "Write executable unit tests for the symbol below from its natural-language test plan.\n\n\
         Target: {target}\n\
         Guidance: {hint}\n\n\
         Constraints:\n\
         - cover every planned case faithfully\n\
         - include the imports and scaffolding the tests need\n\
         - answer with test code only, no explanations\n\n\
         Test plan (JSON):\n{plan}",
        hint = target_hint(target),
    ))
}

/// Prompt asking for a capability survey of the API surface.
///
/// Only the first [`SURVEY_SYMBOL_CAP`] symbols are listed.
#[must_use]
pub fn survey_prompt(symbols: &[ApiSymbol]) -> String {
    let mut prompt = String::from("The public API surface, summarized:");
    for symbol in symbols.iter().take(SURVEY_SYMBOL_CAP) {
        let _ = write!(
            prompt,
            "\n- {}:{} [{}]",
            symbol.language, symbol.qualified_name, symbol.kind
        );
        if let Some(signature) = &symbol.signature {
            let _ = write!(prompt, " | sig: {signature}");
        }
    }

    let _ = write!(
        prompt,
        "\n\nSurvey this surface and enumerate 6-12 high-level capabilities or end-to-end flows, \
         with the symbols involved and their critical paths.\n\n\
         Answer with strict JSON in this schema, without commentary:\n{:#}",
        survey_schema()
    );
    prompt
}

/// Prompt asking to refine one capability into BDD features.
pub fn feature_prompt(capability: &BddCapability) -> Result<String, serde_json::Error> {
    let capability = serde_json::to_string_pretty(capability)?;
    Ok(format!(
        "Refine a single capability into concrete BDD features.\n\
         Capability (JSON):\n{capability}\n\n\
         Answer with strict JSON in this schema, without commentary:\n{:#}",
        feature_schema()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::function_symbol;

    #[test]
    fn test_planner_prompt_includes_symbol_context() {
        let symbol = function_symbol("python", "pkg.math.add").with_docstring("Adds two numbers.");
        let prompt = planner_prompt(&symbol);

        assert!(prompt.starts_with("Target symbol: pkg.math.add [function in python]"));
        assert!(prompt.contains("Signature: add(value)"));
        assert!(prompt.contains("Adds two numbers."));
        assert!(prompt.contains("\"coverage_notes\""));
    }

    #[test]
    fn test_survey_prompt_is_capped() {
        let symbols: Vec<_> = (0..150)
            .map(|i| function_symbol("go", &format!("pkg.F{i}")))
            .collect();
        let prompt = survey_prompt(&symbols);

        assert!(prompt.contains("- go:pkg.F99 [function] | sig: F99(value)"));
        assert!(!prompt.contains("pkg.F100 "));
        assert_eq!(prompt.matches("\n- go:").count(), SURVEY_SYMBOL_CAP);
    }

    #[test]
    fn test_render_prompt_has_target_guidance() {
        let spec = TestSpec::empty(function_symbol("rust", "crate::parse"));
        let prompt = render_prompt(&spec, &TargetSpec::new("rust", "cargo")).unwrap();

        assert!(prompt.contains("Target: rust:cargo"));
        assert!(prompt.contains("#[cfg(test)]"));
        assert!(prompt.contains("\"qualified_name\": \"crate::parse\""));
    }

    #[test]
    fn test_unknown_target_has_no_hint() {
        assert_eq!(target_hint(&TargetSpec::new("cobol", "unit")), "");
    }
}

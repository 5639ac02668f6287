//! Test planning: one structured test plan per API symbol.

use tracing::debug;

use super::flat_map::{FlatMap, FlatMapReport};
use super::prompts::{planner_prompt, PLANNER_SYSTEM};
use crate::core::{ApiSymbol, SpecFiles};
use crate::decode::decode_or_fallback;
use crate::dispatch::{DispatchObserver, Dispatcher};
use crate::documents::{TestPlanDocument, TestSpec};
use crate::errors::{GenerationFailure, SpecsmithError};
use crate::generation::{GenerationClient, GenerationRequest, DEFAULT_TEMPERATURE};
use crate::store::{ArtifactStore, ResumableStore};

/// Plans natural-language tests for API symbols.
///
/// Plans are persisted as pretty-printed JSON under `{language}__{safe_id}.json`.
#[derive(Debug, Clone)]
pub struct TestPlanner {
    client: GenerationClient,
    dispatcher: Dispatcher,
}

impl TestPlanner {
    /// Creates a planner.
    #[must_use]
    pub fn new(client: GenerationClient, dispatcher: Dispatcher) -> Self {
        Self { client, dispatcher }
    }

    /// Plans every symbol that has no persisted plan yet.
    ///
    /// Failed symbols get an empty plan and are not persisted.
    pub async fn plan<S: ArtifactStore>(
        &self,
        symbols: &[ApiSymbol],
        store: &ResumableStore<S>,
        observer: &dyn DispatchObserver<ApiSymbol, TestSpec>,
    ) -> Result<FlatMapReport<TestSpec>, SpecsmithError> {
        let stage = FlatMap {
            stage: "plan",
            dispatcher: &self.dispatcher,
            store,
            target: &SpecFiles,
        };

        Ok(stage
            .run(
                symbols,
                |symbol: &ApiSymbol| {
                    let symbol = symbol.clone();
                    async move { self.plan_symbol(symbol).await.map_err(anyhow::Error::from) }
                },
                |symbol| TestSpec::empty(symbol.clone()),
                spec_content,
                observer,
            )
            .await)
    }

    /// Plans a single symbol without touching any store.
    ///
    /// An answer that is not a usable document yields an empty plan.
    pub async fn plan_symbol(&self, symbol: ApiSymbol) -> Result<TestSpec, GenerationFailure> {
        let request = GenerationRequest::new(planner_prompt(&symbol))
            .with_system(PLANNER_SYSTEM)
            .with_temperature(DEFAULT_TEMPERATURE)
            .structured();

        let result = self.client.generate(&request).await?;
        debug!(symbol = %symbol.qualified_name, attempts = result.attempts, "Plan generated");

        let plan: TestPlanDocument = decode_or_fallback(&result.text);
        Ok(TestSpec::from_plan(symbol, plan))
    }
}

fn spec_content(spec: &TestSpec) -> anyhow::Result<Option<String>> {
    if spec.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string_pretty(spec)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::NoOpObserver;
    use crate::errors::BackendError;
    use crate::generation::RetryConfig;
    use crate::pipeline::ItemStatus;
    use crate::store::MemoryArtifactStore;
    use crate::testing::{function_symbol, ScriptedBackend};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const PLAN: &str = r#"{"rationale":"r","coverage_notes":["n"],"cases":[{"title":"adds","description":"sum"}]}"#;

    fn planner(backend: Arc<ScriptedBackend>) -> TestPlanner {
        let client = GenerationClient::new(backend).with_retry(RetryConfig::immediate(1));
        TestPlanner::new(client, Dispatcher::new(2))
    }

    #[tokio::test]
    async fn test_plan_symbol_binds_symbol() {
        let backend = Arc::new(ScriptedBackend::new().with_default_response(PLAN));
        let symbol = function_symbol("python", "pkg.add");

        let spec = planner(backend.clone()).plan_symbol(symbol.clone()).await.unwrap();

        assert_eq!(spec.symbol, symbol);
        assert_eq!(spec.cases.len(), 1);
        assert_eq!(spec.cases[0].title, "adds");

        let call = &backend.calls()[0];
        assert!(call.json_mode);
        assert_eq!(call.temperature, None);
        assert_eq!(call.system.as_deref(), Some(PLANNER_SYSTEM));
    }

    #[tokio::test]
    async fn test_prose_answer_is_empty_not_failed() {
        let backend = Arc::new(ScriptedBackend::new().with_default_response("I cannot help."));
        let store = ResumableStore::new(MemoryArtifactStore::new(), true);

        let report = planner(backend)
            .plan(&[function_symbol("python", "pkg.add")], &store, &NoOpObserver)
            .await
            .unwrap();

        assert_eq!(report.statuses, vec![ItemStatus::Empty]);
        assert!(report.failures.is_empty());
        assert!(store.inner().is_empty());
    }

    #[tokio::test]
    async fn test_failed_symbol_is_isolated() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_default_response(PLAN)
                .fail_on_prompt("pkg.broken", BackendError::rejected(400, "bad request")),
        );
        let store = ResumableStore::new(MemoryArtifactStore::new(), true);
        let symbols = vec![
            function_symbol("python", "pkg.add"),
            function_symbol("python", "pkg.broken"),
            function_symbol("python", "pkg.sub"),
        ];

        let report = planner(backend)
            .plan(&symbols, &store, &NoOpObserver)
            .await
            .unwrap();

        assert_eq!(
            report.statuses,
            vec![ItemStatus::Written, ItemStatus::Failed, ItemStatus::Written]
        );
        assert_eq!(report.results[1].as_ref().map(TestSpec::is_empty), Some(true));
        assert_eq!(report.failures[0].index, 1);
        assert!(store.inner().get("python__pkg__add.json").is_some());
        assert!(store.inner().get("python__pkg__broken.json").is_none());

        let persisted: TestSpec =
            serde_json::from_str(&store.inner().get("python__pkg__sub.json").unwrap()).unwrap();
        assert_eq!(persisted.symbol.qualified_name, "pkg.sub");
    }
}

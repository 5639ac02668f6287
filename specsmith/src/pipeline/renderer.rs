//! Test rendering: executable test source from persisted plans.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::flat_map::{FlatMap, FlatMapReport};
use super::prompts::{render_prompt, RENDER_SYSTEM};
use crate::core::{TargetSpec, TestFiles};
use crate::decode::strip_code_fence;
use crate::dispatch::{DispatchObserver, Dispatcher};
use crate::documents::TestSpec;
use crate::errors::SpecsmithError;
use crate::generation::{GenerationClient, GenerationRequest, DEFAULT_TEMPERATURE};
use crate::store::{ArtifactStore, ResumableStore};

/// Generated test source for one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedTest {
    /// The plan the tests were written from.
    pub spec: TestSpec,
    /// Language and framework of the tests.
    pub target: TargetSpec,
    /// Test source, empty when rendering failed.
    pub content: String,
}

impl RenderedTest {
    /// File name the source is stored under.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.target.file_name(&self.spec.symbol.safe_id())
    }

    /// True when there is no source.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Renders test plans into test source files.
#[derive(Debug, Clone)]
pub struct TestRenderer {
    client: GenerationClient,
    dispatcher: Dispatcher,
}

impl TestRenderer {
    /// Creates a renderer.
    #[must_use]
    pub fn new(client: GenerationClient, dispatcher: Dispatcher) -> Self {
        Self { client, dispatcher }
    }

    /// Renders every plan for one target.
    pub async fn render<S: ArtifactStore>(
        &self,
        specs: &[TestSpec],
        target: &TargetSpec,
        store: &ResumableStore<S>,
        observer: &dyn DispatchObserver<TestSpec, RenderedTest>,
    ) -> Result<FlatMapReport<RenderedTest>, SpecsmithError> {
        let files = TestFiles(target.clone());
        let stage = FlatMap {
            stage: "render",
            dispatcher: &self.dispatcher,
            store,
            target: &files,
        };

        Ok(stage
            .run(
                specs,
                |spec: &TestSpec| {
                    let spec = spec.clone();
                    let target = target.clone();
                    async move { self.render_spec(spec, target).await }
                },
                |spec| RenderedTest {
                    spec: spec.clone(),
                    target: target.clone(),
                    content: String::new(),
                },
                |test: &RenderedTest| Ok(Some(test.content.clone())),
                observer,
            )
            .await)
    }

    /// Renders plans grouped by language, each with its default target.
    ///
    /// Groups keep first-seen language order. Languages without a default
    /// target are skipped with a warning.
    pub async fn render_auto<S: ArtifactStore>(
        &self,
        specs: &[TestSpec],
        store: &ResumableStore<S>,
        observer: &dyn DispatchObserver<TestSpec, RenderedTest>,
    ) -> Result<Vec<(TargetSpec, FlatMapReport<RenderedTest>)>, SpecsmithError> {
        let mut groups: Vec<(String, Vec<TestSpec>)> = Vec::new();
        for spec in specs {
            let language = spec.symbol.language.to_lowercase();
            match groups.iter_mut().find(|(lang, _)| *lang == language) {
                Some((_, group)) => group.push(spec.clone()),
                None => groups.push((language, vec![spec.clone()])),
            }
        }

        let mut reports = Vec::with_capacity(groups.len());
        for (language, group) in groups {
            let Some(target) = TargetSpec::default_for_language(&language) else {
                warn!(language = %language, specs = group.len(), "No default test target, skipping");
                continue;
            };
            let report = self.render(&group, &target, store, observer).await?;
            reports.push((target, report));
        }
        Ok(reports)
    }

    /// Renders one plan without touching any store.
    pub async fn render_spec(
        &self,
        spec: TestSpec,
        target: TargetSpec,
    ) -> anyhow::Result<RenderedTest> {
        let request = GenerationRequest::new(render_prompt(&spec, &target)?)
            .with_system(RENDER_SYSTEM)
            .with_temperature(DEFAULT_TEMPERATURE);

        let result = self.client.generate(&request).await?;
        debug!(symbol = %spec.symbol.qualified_name, attempts = result.attempts, "Tests rendered");

        Ok(RenderedTest {
            content: strip_code_fence(&result.text),
            spec,
            target,
        })
    }
}

/// Reads every persisted test plan back from a store.
///
/// Only `*.json` artifacts are considered; ones that do not parse as a plan
/// are skipped with a warning.
pub fn load_specs<S: ArtifactStore + ?Sized>(store: &S) -> Result<Vec<TestSpec>, SpecsmithError> {
    let mut specs = Vec::new();
    for key in store.keys()? {
        if !key.as_str().ends_with(".json") {
            continue;
        }
        let Some(text) = store.load(&key)? else {
            continue;
        };
        match serde_json::from_str::<TestSpec>(&text) {
            Ok(spec) => specs.push(spec),
            Err(e) => warn!(key = %key, error = %e, "Skipping unreadable test plan"),
        }
    }
    Ok(specs)
}

//! BDD planning: survey the API surface, then expand each capability.

use chrono::Utc;
use tracing::{debug, info, warn, Instrument};

use super::prompts::{feature_prompt, survey_prompt, BDD_SYSTEM};
use super::summary::{BatchSummary, ItemStatus};
use crate::core::{ApiSymbol, Artifact, ArtifactKey};
use crate::decode::{decode, decode_or_fallback};
use crate::dispatch::{DispatchObserver, Dispatcher, ItemFailure};
use crate::documents::{BddCapability, BddSurvey, FeatureSpec, StructuredDocument};
use crate::errors::SpecsmithError;
use crate::generation::{GenerationClient, GenerationRequest};
use crate::observability::run_span;
use crate::store::{ArtifactStore, PersistOutcome, ResumableStore};

/// Store key of the persisted survey.
pub const SURVEY_KEY: &str = "survey.json";

/// Store key of the merged feature document.
pub const FEATURES_KEY: &str = "features.json";

/// Outcome of a BDD planning run.
#[derive(Debug, Clone)]
pub struct BddReport {
    /// The stage-one survey.
    pub survey: BddSurvey,
    /// Features merged in capability order.
    pub features: FeatureSpec,
    /// True when an existing feature document was reused.
    pub reused: bool,
    /// Capabilities whose expansion failed, by survey position.
    pub failures: Vec<ItemFailure>,
    /// Per-capability counts; `written` counts capabilities that contributed
    /// features.
    pub summary: BatchSummary,
}

/// Plans BDD features in two stages.
///
/// One request surveys the API surface into capabilities; each capability is
/// then expanded into features independently and the results are merged.
#[derive(Debug, Clone)]
pub struct BddPlanner {
    client: GenerationClient,
    dispatcher: Dispatcher,
}

impl BddPlanner {
    /// Creates a BDD planner.
    #[must_use]
    pub fn new(client: GenerationClient, dispatcher: Dispatcher) -> Self {
        Self { client, dispatcher }
    }

    /// Surveys `symbols`, expands every capability and persists the results.
    ///
    /// With skip-existing on, a non-empty `features.json` is loaded instead
    /// and no request is made.
    pub async fn plan<S: ArtifactStore>(
        &self,
        symbols: &[ApiSymbol],
        store: &ResumableStore<S>,
        observer: &dyn DispatchObserver<BddCapability, FeatureSpec>,
    ) -> Result<BddReport, SpecsmithError> {
        let (span, run_id) = run_span("bdd");
        let started_at = Utc::now();

        async move {
            let features_key = ArtifactKey::new(FEATURES_KEY);
            if store.should_skip_key(&features_key) {
                info!("Feature document exists, reusing it");
                let features = load_document::<FeatureSpec, S>(store, &features_key)?
                    .unwrap_or_else(FeatureSpec::fallback);
                let survey = load_document::<BddSurvey, S>(store, &ArtifactKey::new(SURVEY_KEY))?
                    .unwrap_or_default();
                return Ok(BddReport {
                    survey,
                    features,
                    reused: true,
                    failures: Vec::new(),
                    summary: BatchSummary::from_statuses("bdd", run_id, started_at, &[]),
                });
            }

            let survey = self.survey(symbols).await;
            if !survey.is_empty() {
                persist_document(store, SURVEY_KEY, &survey)?;
            }
            info!(capabilities = survey.capabilities.len(), "Survey finished");

            let report = self
                .dispatcher
                .dispatch(
                    &survey.capabilities,
                    |capability: &BddCapability| {
                        let capability = capability.clone();
                        async move { self.expand(&capability).await }
                    },
                    |_| FeatureSpec::fallback(),
                    observer,
                )
                .await;

            let statuses: Vec<ItemStatus> = report
                .results
                .iter()
                .enumerate()
                .map(|(index, spec)| {
                    if report.failure_for(index).is_some() {
                        ItemStatus::Failed
                    } else if spec.is_empty() {
                        ItemStatus::Empty
                    } else {
                        ItemStatus::Written
                    }
                })
                .collect();

            let features = FeatureSpec {
                rationale: survey.rationale.clone(),
                features: report
                    .results
                    .into_iter()
                    .flat_map(|spec| spec.features)
                    .collect(),
            };
            if !features.is_empty() {
                persist_document(store, FEATURES_KEY, &features)?;
            }

            let summary = BatchSummary::from_statuses("bdd", run_id, started_at, &statuses);
            info!(%summary, features = features.features.len(), "BDD planning finished");

            Ok(BddReport {
                survey,
                features,
                reused: false,
                failures: report.failures,
                summary,
            })
        }
        .instrument(span)
        .await
    }

    /// Stage one. Any failure yields an empty survey.
    async fn survey(&self, symbols: &[ApiSymbol]) -> BddSurvey {
        let request = GenerationRequest::new(survey_prompt(symbols))
            .with_system(BDD_SYSTEM)
            .structured();

        match self.client.generate(&request).await {
            Ok(result) => decode_or_fallback(&result.text),
            Err(failure) => {
                warn!(error = %failure, "Survey request failed, no capabilities to expand");
                BddSurvey::fallback()
            }
        }
    }

    /// Stage two for one capability.
    ///
    /// An answer that is not a usable document contributes no features.
    pub async fn expand(&self, capability: &BddCapability) -> anyhow::Result<FeatureSpec> {
        let request = GenerationRequest::new(feature_prompt(capability)?)
            .with_system(BDD_SYSTEM)
            .structured();

        let result = self.client.generate(&request).await?;
        debug!(capability = %capability.name, attempts = result.attempts, "Capability expanded");
        Ok(decode_or_fallback(&result.text))
    }
}

/// Writes one Gherkin `.feature` file per feature.
///
/// Returns the keys that were newly written. A feature whose file already
/// exists is left alone when skip-existing is on. A feature that cannot be
/// written is logged and the rest are still written.
pub fn write_feature_files<S: ArtifactStore>(
    features: &FeatureSpec,
    store: &ResumableStore<S>,
) -> Vec<ArtifactKey> {
    let mut written = Vec::new();
    for feature in &features.features {
        let key = ArtifactKey::new(feature.file_name());
        if store.should_skip_key(&key) {
            debug!(key = %key, "Feature file exists, skipping");
            continue;
        }
        let artifact = Artifact::new(key.clone(), feature.to_gherkin());
        match store.persist(&artifact) {
            Ok(PersistOutcome::Written) => written.push(key),
            Ok(_) => {}
            Err(e) => warn!(feature = %feature.name, error = %e, "Feature file not written"),
        }
    }
    written
}

fn persist_document<S, T>(
    store: &ResumableStore<S>,
    key: &str,
    document: &T,
) -> Result<(), SpecsmithError>
where
    S: ArtifactStore,
    T: StructuredDocument,
{
    let text = serde_json::to_string_pretty(document)?;
    store.persist(&Artifact::new(key, text))?;
    Ok(())
}

fn load_document<T, S>(
    store: &ResumableStore<S>,
    key: &ArtifactKey,
) -> Result<Option<T>, SpecsmithError>
where
    T: StructuredDocument,
    S: ArtifactStore,
{
    let Some(text) = store.load(key)? else {
        return Ok(None);
    };
    let document = decode::<T>(&text).unwrap_or_else(|failure| {
        warn!(key = %key, reason = %failure, "Stored document is unreadable");
        failure.into_fallback()
    });
    Ok(Some(document))
}

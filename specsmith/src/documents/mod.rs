//! Structured document schemas produced by the model.
//!
//! Every schema carries a documented fallback, which is what a malformed
//! response decodes to, and an emptiness predicate that decides whether a
//! document is worth persisting.

mod bdd;
mod test_spec;

pub use bdd::{BddCapability, BddFeature, BddScenario, BddStep, BddSurvey, FeatureSpec};
pub use test_spec::{CaseCategory, TestCase, TestPlanDocument, TestSpec};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A JSON document schema the decoder can target.
pub trait StructuredDocument: DeserializeOwned + Serialize + Send + Sized {
    /// Schema name used in logs.
    const SCHEMA: &'static str;

    /// The documented empty structure returned when decoding fails.
    fn fallback() -> Self;

    /// True when the document carries nothing worth keeping.
    fn is_empty(&self) -> bool;
}

//! Generation pipelines.
//!
//! This module provides:
//! - The flat-map shape: one generation per work item, persisted as it
//!   completes, skipping items whose artifact already exists
//! - The survey-then-expand shape used for BDD planning
//! - Concrete pipelines: test planning, test rendering and BDD planning
//! - Per-item statuses and batch summaries

mod bdd;
mod flat_map;
mod planner;
pub mod prompts;
mod renderer;
mod summary;


pub use bdd::{write_feature_files, BddPlanner, BddReport, FEATURES_KEY, SURVEY_KEY};
pub use flat_map::FlatMapReport;
pub use planner::TestPlanner;
pub use renderer::{load_specs, RenderedTest, TestRenderer};
pub use summary::{BatchSummary, ItemStatus};

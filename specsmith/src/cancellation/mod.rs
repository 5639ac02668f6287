//! Cooperative cancellation.
//!
//! A [`CancellationToken`] attached to a dispatcher stops pending work items
//! from starting. Artifacts persisted before cancellation stay on disk and the
//! next run resumes from them.

mod token;

pub use token::CancellationToken;

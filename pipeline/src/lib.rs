//! Verification job handling.
//!
//! The queue delivers each job at least once and possibly concurrently, so
//! everything here is written to be idempotent: the slow chain lookup runs
//! with no transaction held, and the state flip plus assignment batch commit
//! in one conditional write that at most one delivery wins.

mod outcome;
mod pipeline;

pub use outcome::JobOutcome;
pub use pipeline::VerificationPipeline;

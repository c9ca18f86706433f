//! Job queue collaborator.
//!
//! The queue itself is an external service with at-least-once push delivery.
//! This crate owns the publish side (enqueueing verification jobs with a
//! retry policy) and the wire schema of job payloads; consuming happens over
//! HTTP in the rpc crate.

mod client;
mod error;
mod job;

pub use client::{DeadLetter, HttpQueueClient, JobPublisher, RetryPolicy};
pub use error::QueueError;
pub use job::VerificationJob;

//! Shared utilities for the stakequiz service.

pub mod logging;
pub mod retry;

pub use logging::init_tracing;
pub use retry::{retry_with_backoff, RetryConfig};

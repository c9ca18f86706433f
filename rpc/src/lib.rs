//! HTTP API of the stakequiz service.
//!
//! Four surfaces on one router:
//! - stake submission and status polling for clients,
//! - quiz question retrieval, answering, and submission,
//! - the queue consumer endpoint that drives the verification pipeline,
//! - admin overrides (retry, reset, shadow-ban, dead letters, pause flag).

pub mod error;
pub mod handlers;
pub mod server;

pub use error::RpcError;
pub use server::{router, AppState, RpcServer};

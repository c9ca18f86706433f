//! Nullable infrastructure for deterministic testing.
//!
//! All external dependencies (storage, chain RPC, job queue) sit behind
//! traits; this crate provides in-memory implementations that return
//! programmable values and never touch the filesystem or network.
//!
//! Usage: swap real implementations for nullables in tests.

pub mod ledger;
pub mod queue;
pub mod store;

pub use ledger::{NullLedger, ScriptedLookup};
pub use queue::NullQueue;
pub use store::MemoryStore;

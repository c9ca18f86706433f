//! LMDB storage backend for the stakequiz service.
//!
//! Implements all storage traits from `stakequiz-store` using the `heed`
//! LMDB bindings. All databases live in a single environment; every
//! conditional update (`try_*`) is a read-check-write inside one LMDB write
//! transaction, which is race-free because LMDB admits a single writer at a
//! time.

mod content;
pub mod environment;
pub mod error;
mod keys;
mod secondary;
mod session;

pub use environment::LmdbStakeStore;
pub use error::LmdbError;

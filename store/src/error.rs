use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    /// A unique key (transaction signature, user session) already exists.
    /// Callers map this to an idempotent "already used" response, never to a
    /// generic server error.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// A precondition on current state failed (e.g. secondary stake created
    /// under an unverified parent, quiz submitted twice).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

//! Validation errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypeError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("invalid transaction signature: {0}")]
    InvalidSignature(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

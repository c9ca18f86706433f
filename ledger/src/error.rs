use thiserror::Error;

/// Errors from talking to the chain RPC node.
///
/// Verification outcomes (mismatched fields) are not errors; see
/// [`crate::VerifyFailure`].
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("rpc transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rpc node returned error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed rpc response: {0}")]
    Malformed(String),
}

impl LedgerError {
    /// Whether a retry against the same node could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().map_or(true, |s| s.is_server_error())
            }
            // Node-side errors (behind, overloaded) clear up on their own.
            Self::Rpc { .. } => true,
            Self::Malformed(_) => false,
        }
    }
}

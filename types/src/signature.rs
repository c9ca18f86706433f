//! Transaction signature type.

use crate::address::is_base58;
use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A base58-encoded Solana transaction signature.
///
/// This is the handle clients submit before the chain has finalized the
/// transaction; uniqueness of signatures across sessions is enforced at the
/// store level, not here.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxSignature(String);

impl TxSignature {
    /// Create a signature from a string already known to be valid.
    ///
    /// # Panics
    /// Panics on malformed input. Use [`TxSignature::parse`] for untrusted input.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(Self::is_well_formed(&s), "malformed signature: {s:?}");
        Self(s)
    }

    /// Parse and validate a signature from untrusted input.
    pub fn parse(raw: impl Into<String>) -> Result<Self, TypeError> {
        let s = raw.into();
        if Self::is_well_formed(&s) {
            Ok(Self(s))
        } else {
            Err(TypeError::InvalidSignature(s))
        }
    }

    // Base58 of a 64-byte ed25519 signature is 86-88 chars; accept a margin.
    fn is_well_formed(s: &str) -> bool {
        (64..=88).contains(&s.len()) && is_base58(s)
    }

    /// Return the raw base58 string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

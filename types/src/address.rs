//! Solana wallet address (base58-encoded ed25519 public key).

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The base58 alphabet used by Solana (Bitcoin alphabet, no 0/O/I/l).
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Check that every character of `s` belongs to the base58 alphabet.
pub(crate) fn is_base58(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| BASE58_ALPHABET.contains(c))
}

/// A Solana wallet address.
///
/// Stored as the base58 string form; the service never needs the raw key
/// bytes, only exact equality against on-chain account fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Create a wallet address from a string already known to be valid.
    ///
    /// # Panics
    /// Panics if the string is not well-formed base58 of plausible length.
    /// Use [`WalletAddress::parse`] for untrusted input.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(
            Self::is_well_formed(&s),
            "malformed wallet address: {s:?}"
        );
        Self(s)
    }

    /// Parse and validate an address from untrusted input.
    pub fn parse(raw: impl Into<String>) -> Result<Self, TypeError> {
        let s = raw.into();
        if Self::is_well_formed(&s) {
            Ok(Self(s))
        } else {
            Err(TypeError::InvalidAddress(s))
        }
    }

    fn is_well_formed(s: &str) -> bool {
        (32..=44).contains(&s.len()) && is_base58(s)
    }

    /// Return the raw base58 string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! On-chain stake verification.
//!
//! Fetches parsed transactions from a Solana JSON-RPC node and checks that a
//! claimed stake transaction actually created, initialized, and delegated a
//! stake account with the expected amount, owner, lockup, and validator.

mod client;
mod error;
mod transaction;
mod verifier;

pub use client::{LedgerClient, SolanaRpcClient};
pub use error::LedgerError;
pub use transaction::{ParsedInstruction, ParsedTransaction};
pub use verifier::{ExpectedStake, StakeVerifier, VerifiedStake, VerifyFailure};

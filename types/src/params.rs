//! Stake-program parameters the ledger verifier checks against.

use crate::WalletAddress;
use serde::{Deserialize, Serialize};

/// The Solana stake program id (fixed across all clusters).
pub const STAKE_PROGRAM_ID: &str = "Stake11111111111111111111111111111111111111";

/// Tolerance window for the lockup unlock timestamp, in seconds (±12 hours).
///
/// The client computes the unlock time from its own clock while the chain
/// records block time, so exact equality is never achievable.
pub const LOCKUP_TOLERANCE_SECS: u64 = 12 * 3600;

/// Parameters a stake transaction must match to be accepted.
///
/// Loaded from the service TOML config; defaults point at mainnet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StakeParams {
    /// The validator vote account every stake must delegate to.
    pub validator_vote_account: WalletAddress,

    /// Custodian address required in the lockup clause.
    pub lockup_custodian: WalletAddress,

    /// Whether the lockup clause is checked at all.
    ///
    /// Disabled on clusters where the client builds stakes without lockups.
    #[serde(default = "default_true")]
    pub enforce_lockup: bool,

    /// Allowed deviation of the unlock timestamp from
    /// block time + stake duration, in seconds.
    #[serde(default = "default_lockup_tolerance")]
    pub lockup_tolerance_secs: u64,

    /// Number of categories (and therefore questions) assigned per session.
    #[serde(default = "default_questions_per_session")]
    pub questions_per_session: usize,
}

fn default_true() -> bool {
    true
}

fn default_lockup_tolerance() -> u64 {
    LOCKUP_TOLERANCE_SECS
}

fn default_questions_per_session() -> usize {
    5
}

impl StakeParams {
    /// Defaults for the production validator.
    pub fn mainnet_defaults() -> Self {
        Self {
            validator_vote_account: WalletAddress::new(
                "5ZWgXcyqrrNpQHCme5SdC5hCeYb2o3fEJhF7Gok3bTVN",
            ),
            lockup_custodian: WalletAddress::new(
                "7Np41oeYqPefeNQEHSv1UDhYrehxin3NStELsSKCT4K2",
            ),
            enforce_lockup: true,
            lockup_tolerance_secs: LOCKUP_TOLERANCE_SECS,
            questions_per_session: 5,
        }
    }
}

impl Default for StakeParams {
    fn default() -> Self {
        Self::mainnet_defaults()
    }
}

//! Instruction matching against an expected stake.
//!
//! A valid stake transaction carries three linked instructions: a system
//! account creation funding the stake account, a stake `initialize` setting
//! authorities (and lockup), and a stake `delegate` pointing at the
//! validator. All three must reference the same stake account; the linkage
//! is what stops an unrelated but well-formed transaction from passing.

use thiserror::Error;

use stakequiz_types::{Lamports, StakeParams, Timestamp, WalletAddress, STAKE_PROGRAM_ID};

use crate::transaction::{ParsedInstruction, ParsedTransaction};

/// What the caller claims the transaction did.
#[derive(Clone, Debug)]
pub struct ExpectedStake {
    pub owner: WalletAddress,
    pub amount: Lamports,
    pub duration_secs: u64,
}

/// Result of a successful verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedStake {
    /// Address of the stake account the transaction created.
    pub stake_account: String,
    /// Block time of the containing block, when the node reported one.
    pub block_time: Option<Timestamp>,
}

/// One specific check that did not hold.
///
/// Every variant names the check that failed so operators can diagnose from
/// the failure alone, without re-deriving from raw chain data.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VerifyFailure {
    #[error("transaction failed on chain")]
    TransactionFailed,

    #[error("no account creation for the stake program found")]
    MissingCreateAccount,

    #[error("created account funded with {actual} instead of {expected}")]
    AmountMismatch { expected: Lamports, actual: Lamports },

    #[error("account creation funded by {actual}, expected owner {expected}")]
    SourceMismatch { expected: String, actual: String },

    #[error("no initialize instruction for stake account {stake_account}")]
    MissingInitialize { stake_account: String },

    #[error("staker authority is {actual}, expected {expected}")]
    StakerMismatch { expected: String, actual: String },

    #[error("withdrawer authority is {actual}, expected {expected}")]
    WithdrawerMismatch { expected: String, actual: String },

    #[error("initialize carries no lockup clause")]
    MissingLockup,

    #[error("lockup custodian is {actual}, expected {expected}")]
    CustodianMismatch { expected: String, actual: String },

    #[error("transaction has no block time, cannot check the unlock window")]
    MissingBlockTime,

    #[error(
        "unlock timestamp {actual} outside ±{tolerance_secs}s of expected {expected}"
    )]
    UnlockOutsideWindow {
        expected: i64,
        actual: i64,
        tolerance_secs: u64,
    },

    #[error("no delegate instruction for stake account {stake_account}")]
    MissingDelegate { stake_account: String },

    #[error("delegated to vote account {actual}, expected {expected}")]
    VoteAccountMismatch { expected: String, actual: String },
}

/// Matches parsed transactions against [`StakeParams`].
#[derive(Clone, Debug)]
pub struct StakeVerifier {
    params: StakeParams,
}

impl StakeVerifier {
    pub fn new(params: StakeParams) -> Self {
        Self { params }
    }

    /// Check that `tx` is a real stake matching `expected`.
    ///
    /// Failures are final for this transaction: retrying cannot change
    /// what the chain recorded.
    pub fn verify(
        &self,
        tx: &ParsedTransaction,
        expected: &ExpectedStake,
    ) -> Result<VerifiedStake, VerifyFailure> {
        if !tx.succeeded() {
            return Err(VerifyFailure::TransactionFailed);
        }

        let stake_account = self.check_create_account(tx, expected)?;
        self.check_initialize(tx, expected, &stake_account)?;
        self.check_delegate(tx, &stake_account)?;

        Ok(VerifiedStake {
            stake_account,
            block_time: tx.block_time.and_then(|t| u64::try_from(t).ok()).map(Timestamp::new),
        })
    }

    fn check_create_account(
        &self,
        tx: &ParsedTransaction,
        expected: &ExpectedStake,
    ) -> Result<String, VerifyFailure> {
        // Wallets create stake accounts via createAccountWithSeed; plain
        // createAccount is accepted too since the checks are identical.
        let create = tx
            .instructions_of("system", "createAccountWithSeed")
            .chain(tx.instructions_of("system", "createAccount"))
            .find(|ix| ix.info_str("owner") == Some(STAKE_PROGRAM_ID))
            .ok_or(VerifyFailure::MissingCreateAccount)?;

        let lamports = Lamports::new(create.info_u64("lamports").unwrap_or(0));
        if lamports != expected.amount {
            return Err(VerifyFailure::AmountMismatch {
                expected: expected.amount,
                actual: lamports,
            });
        }

        let source = create.info_str("source").unwrap_or_default();
        if source != expected.owner.as_str() {
            return Err(VerifyFailure::SourceMismatch {
                expected: expected.owner.as_str().to_string(),
                actual: source.to_string(),
            });
        }

        create
            .info_str("newAccount")
            .map(str::to_string)
            .ok_or(VerifyFailure::MissingCreateAccount)
    }

    fn check_initialize(
        &self,
        tx: &ParsedTransaction,
        expected: &ExpectedStake,
        stake_account: &str,
    ) -> Result<(), VerifyFailure> {
        let init = tx
            .instructions_of("stake", "initialize")
            .find(|ix| ix.info_str("stakeAccount") == Some(stake_account))
            .ok_or_else(|| VerifyFailure::MissingInitialize {
                stake_account: stake_account.to_string(),
            })?;

        let staker = nested_str(init, "authorized", "staker");
        if staker != expected.owner.as_str() {
            return Err(VerifyFailure::StakerMismatch {
                expected: expected.owner.as_str().to_string(),
                actual: staker.to_string(),
            });
        }
        let withdrawer = nested_str(init, "authorized", "withdrawer");
        if withdrawer != expected.owner.as_str() {
            return Err(VerifyFailure::WithdrawerMismatch {
                expected: expected.owner.as_str().to_string(),
                actual: withdrawer.to_string(),
            });
        }

        if self.params.enforce_lockup {
            self.check_lockup(tx, expected, init)?;
        }
        Ok(())
    }

    fn check_lockup(
        &self,
        tx: &ParsedTransaction,
        expected: &ExpectedStake,
        init: &ParsedInstruction,
    ) -> Result<(), VerifyFailure> {
        let lockup = init.info_object("lockup").ok_or(VerifyFailure::MissingLockup)?;

        let custodian = lockup
            .get("custodian")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if custodian != self.params.lockup_custodian.as_str() {
            return Err(VerifyFailure::CustodianMismatch {
                expected: self.params.lockup_custodian.as_str().to_string(),
                actual: custodian.to_string(),
            });
        }

        let block_time = tx.block_time.ok_or(VerifyFailure::MissingBlockTime)?;
        let unlock = lockup
            .get("unixTimestamp")
            .and_then(|v| v.as_i64())
            .ok_or(VerifyFailure::MissingLockup)?;
        let expected_unlock = block_time.saturating_add(expected.duration_secs as i64);
        let tolerance = self.params.lockup_tolerance_secs;
        if expected_unlock.abs_diff(unlock) > tolerance {
            return Err(VerifyFailure::UnlockOutsideWindow {
                expected: expected_unlock,
                actual: unlock,
                tolerance_secs: tolerance,
            });
        }
        Ok(())
    }

    fn check_delegate(
        &self,
        tx: &ParsedTransaction,
        stake_account: &str,
    ) -> Result<(), VerifyFailure> {
        let delegate = tx
            .instructions_of("stake", "delegate")
            .find(|ix| ix.info_str("stakeAccount") == Some(stake_account))
            .ok_or_else(|| VerifyFailure::MissingDelegate {
                stake_account: stake_account.to_string(),
            })?;

        let vote_account = delegate.info_str("voteAccount").unwrap_or_default();
        if vote_account != self.params.validator_vote_account.as_str() {
            return Err(VerifyFailure::VoteAccountMismatch {
                expected: self.params.validator_vote_account.as_str().to_string(),
                actual: vote_account.to_string(),
            });
        }
        Ok(())
    }
}

fn nested_str<'a>(ix: &'a ParsedInstruction, object: &str, field: &str) -> &'a str {
    ix.info_object(object)
        .and_then(|o| o.get(field))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
}

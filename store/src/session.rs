//! Primary stake session records and their store trait.

use crate::{QuestionAssignment, StoreError};
use serde::{Deserialize, Serialize};
use stakequiz_types::{
    AnswerId, AssignmentSource, Lamports, QuestionId, SessionId, Timestamp, TxSignature,
    VerificationState, WalletAddress,
};

/// A registered user, keyed by wallet address. Created on first stake
/// submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub wallet: WalletAddress,
    pub created_at: Timestamp,
}

/// One user's participation attempt: a staked amount awaiting (or past)
/// on-chain verification, plus the quiz bookkeeping that hangs off it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeSession {
    pub id: SessionId,
    pub wallet: WalletAddress,

    /// The primary staked amount.
    pub amount: Lamports,

    /// Lock duration in seconds.
    pub duration_secs: u64,

    /// On-chain transaction signature. Unique across all sessions.
    pub signature: TxSignature,

    pub state: VerificationState,
    pub confirmed_at: Option<Timestamp>,

    /// Primary amount plus all confirmed secondary stakes.
    pub total_stake: Lamports,

    /// Quiz score; set exactly once together with `completed_at`.
    pub score: Option<u32>,
    pub completed_at: Option<Timestamp>,

    /// Shadow-banned sessions are excluded from public rankings but behave
    /// normally from the user's point of view.
    pub shadow_banned: bool,

    /// Who created the question assignments, once they exist.
    pub assignment_source: Option<AssignmentSource>,

    pub created_at: Timestamp,
}

/// Input for creating a session. The store generates the id and starts the
/// state machine in `processing`.
#[derive(Clone, Debug)]
pub struct NewSession {
    pub wallet: WalletAddress,
    pub amount: Lamports,
    pub duration_secs: u64,
    pub signature: TxSignature,
    pub created_at: Timestamp,
}

/// Storage for users and primary stake sessions.
///
/// The two `try_*` operations are conditional updates: they apply only if
/// the row is still in `processing` at the moment of the write, and report
/// through their return value whether they won. `false` means a concurrent
/// invocation already handled the transition — callers treat that as an
/// idempotent no-op, not an error.
pub trait SessionStore {
    /// Look up a user by wallet, creating the record if absent.
    fn create_user_if_absent(
        &self,
        wallet: &WalletAddress,
        now: Timestamp,
    ) -> Result<User, StoreError>;

    fn user(&self, wallet: &WalletAddress) -> Result<Option<User>, StoreError>;

    /// Create a session in `processing`.
    ///
    /// Fails with [`StoreError::Duplicate`] if the signature was already
    /// used by any session, and with [`StoreError::Conflict`] if the user
    /// already owns a session.
    fn create_session(&self, new: NewSession) -> Result<StakeSession, StoreError>;

    fn session(&self, id: SessionId) -> Result<Option<StakeSession>, StoreError>;

    fn session_by_user(&self, wallet: &WalletAddress)
        -> Result<Option<StakeSession>, StoreError>;

    /// Atomically: flip `processing → success`, stamp `confirmed_at`, cache
    /// the total stake, and insert the full assignment batch. One write
    /// transaction; either everything lands or nothing does.
    ///
    /// Returns `false` (writing nothing) if the session is no longer in
    /// `processing`.
    fn try_complete_session(
        &self,
        id: SessionId,
        confirmed_at: Timestamp,
        source: AssignmentSource,
        assignments: &[QuestionAssignment],
    ) -> Result<bool, StoreError>;

    /// Conditionally flip `processing → failed`.
    fn try_fail_session(&self, id: SessionId) -> Result<bool, StoreError>;

    /// Record the chosen answer on an existing assignment.
    ///
    /// Fails with [`StoreError::Conflict`] once the quiz is completed.
    fn record_answer(
        &self,
        session: SessionId,
        question: QuestionId,
        answer: AnswerId,
        at: Timestamp,
    ) -> Result<(), StoreError>;

    /// Set the final score and completion timestamp, exactly once.
    fn complete_quiz(
        &self,
        session: SessionId,
        score: u32,
        at: Timestamp,
    ) -> Result<(), StoreError>;

    /// Admin override: return the session to `processing`, clearing score,
    /// completion, and any question assignments. Deliberately bypasses the
    /// state machine.
    fn reset_session(&self, id: SessionId) -> Result<(), StoreError>;

    /// Admin override: set or clear the shadow-ban flag.
    fn set_shadow_ban(&self, id: SessionId, banned: bool) -> Result<(), StoreError>;
}

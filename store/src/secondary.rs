//! Secondary stake records and their store trait.

use crate::StoreError;
use serde::{Deserialize, Serialize};
use stakequiz_types::{
    Lamports, SessionId, StakeId, Timestamp, TxSignature, VerificationState, WalletAddress,
};

/// An additional stake added after the primary session verified.
///
/// Runs the same verification state machine as the session, independently.
/// On confirmation its amount is added to the parent session's cached total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryStake {
    pub id: StakeId,
    pub session_id: SessionId,
    pub wallet: WalletAddress,
    pub amount: Lamports,
    pub signature: TxSignature,
    pub state: VerificationState,
    pub confirmed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Input for creating a secondary stake.
#[derive(Clone, Debug)]
pub struct NewSecondaryStake {
    pub session_id: SessionId,
    pub wallet: WalletAddress,
    pub amount: Lamports,
    pub signature: TxSignature,
    pub created_at: Timestamp,
}

/// Storage for secondary stakes.
pub trait SecondaryStakeStore {
    /// Create a secondary stake in `processing`.
    ///
    /// The parent session must exist and be in `success`; otherwise
    /// [`StoreError::Conflict`]. Signature reuse fails with
    /// [`StoreError::Duplicate`].
    ///
    /// The parent-state check happens inside the insert's own write
    /// transaction. A concurrent admin reset of the parent committed after
    /// this transaction can still leave a confirmed secondary under a
    /// non-`success` parent; that narrow window is accepted.
    fn create_secondary(&self, new: NewSecondaryStake) -> Result<SecondaryStake, StoreError>;

    fn secondary(&self, id: StakeId) -> Result<Option<SecondaryStake>, StoreError>;

    fn secondaries_for_session(
        &self,
        session: SessionId,
    ) -> Result<Vec<SecondaryStake>, StoreError>;

    /// Atomically: flip this stake `processing → success` and add its amount
    /// to the parent session's cached total stake. Returns `false` (writing
    /// nothing) if the stake is no longer in `processing`.
    fn try_confirm_secondary(
        &self,
        id: StakeId,
        confirmed_at: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Conditionally flip `processing → failed`.
    fn try_fail_secondary(&self, id: StakeId) -> Result<bool, StoreError>;
}

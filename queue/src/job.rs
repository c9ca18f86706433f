//! Verification job payloads.

use serde::{Deserialize, Serialize};

use stakequiz_types::{Lamports, SessionId, StakeId, TxSignature, WalletAddress};

use crate::QueueError;

/// One queued verification job.
///
/// The two variants share every field except the target id; which entity a
/// payload addresses is decided by whether it carries `sessionId` or
/// `stakeId`. Amounts travel as decimal SOL and durations as whole days,
/// matching what the submitting client knows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerificationJob {
    #[serde(rename_all = "camelCase")]
    Primary {
        signature: TxSignature,
        wallet_address: WalletAddress,
        amount: f64,
        duration: u64,
        session_id: SessionId,
    },
    #[serde(rename_all = "camelCase")]
    Secondary {
        signature: TxSignature,
        wallet_address: WalletAddress,
        amount: f64,
        duration: u64,
        stake_id: StakeId,
    },
}

impl VerificationJob {
    /// Schema validation at the consumer boundary.
    ///
    /// Serde derives on the inner newtypes do not validate their content,
    /// so well-formedness is re-checked here before any payload is acted on.
    pub fn validate(&self) -> Result<(), QueueError> {
        TxSignature::parse(self.signature().as_str())
            .map_err(|e| QueueError::InvalidJob(e.to_string()))?;
        WalletAddress::parse(self.wallet_address().as_str())
            .map_err(|e| QueueError::InvalidJob(e.to_string()))?;
        self.amount_lamports()?;
        if self.duration_days() == 0 {
            return Err(QueueError::InvalidJob("duration must be positive".into()));
        }
        Ok(())
    }

    pub fn signature(&self) -> &TxSignature {
        match self {
            Self::Primary { signature, .. } | Self::Secondary { signature, .. } => signature,
        }
    }

    pub fn wallet_address(&self) -> &WalletAddress {
        match self {
            Self::Primary { wallet_address, .. } | Self::Secondary { wallet_address, .. } => {
                wallet_address
            }
        }
    }

    pub fn amount_lamports(&self) -> Result<Lamports, QueueError> {
        let (Self::Primary { amount, .. } | Self::Secondary { amount, .. }) = self;
        Lamports::from_sol(*amount).map_err(|e| QueueError::InvalidJob(e.to_string()))
    }

    pub fn duration_days(&self) -> u64 {
        let (Self::Primary { duration, .. } | Self::Secondary { duration, .. }) = self;
        *duration
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_days().saturating_mul(86_400)
    }
}

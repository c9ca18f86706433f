//! Fundamental types for the stakequiz service.
//!
//! Everything here is a small, validated newtype. The rest of the workspace
//! depends on these instead of passing raw strings and integers around.

pub mod address;
pub mod amount;
pub mod error;
pub mod id;
pub mod params;
pub mod signature;
pub mod state;
pub mod time;

pub use address::WalletAddress;
pub use amount::{Lamports, LAMPORTS_PER_SOL};
pub use error::TypeError;
pub use id::{AnswerId, CategoryId, QuestionId, SessionId, StakeId};
pub use params::{StakeParams, STAKE_PROGRAM_ID};
pub use signature::TxSignature;
pub use state::{AssignmentSource, VerificationState};
pub use time::Timestamp;

//! Abstract storage traits for the stakequiz service.
//!
//! Every storage backend (LMDB in production, in-memory for testing)
//! implements these traits. The rest of the workspace depends only on the
//! traits, so the pipeline and HTTP layer can be exercised without touching
//! the filesystem.

pub mod assignment;
pub mod config;
pub mod content;
pub mod error;
pub mod secondary;
pub mod session;

pub use assignment::QuestionAssignment;
pub use config::ConfigStore;
pub use content::{QuizAnswer, QuizCategory, QuizContentStore, QuizQuestion};
pub use error::StoreError;
pub use secondary::{NewSecondaryStake, SecondaryStake, SecondaryStakeStore};
pub use session::{NewSession, SessionStore, StakeSession, User};

/// Convenience bound for code that needs the whole storage surface.
pub trait StakeStore:
    SessionStore + SecondaryStakeStore + QuizContentStore + ConfigStore
{
}

impl<T> StakeStore for T where
    T: SessionStore + SecondaryStakeStore + QuizContentStore + ConfigStore
{
}

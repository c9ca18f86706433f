use stakequiz_store::StoreError;
use thiserror::Error;

/// Assignment and scoring failures.
///
/// Content shortfalls are configuration errors: nothing may be committed,
/// the session stays unverified until an operator adds content.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("only {available} categories exist, {required} required")]
    NotEnoughCategories { available: usize, required: usize },

    #[error("category {name} has no questions")]
    EmptyCategory { name: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

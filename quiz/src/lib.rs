//! Question assignment and quiz scoring.

mod engine;
mod error;

pub use engine::{score_answers, AssignmentEngine};
pub use error::QuizError;

//! Per-session question assignments.

use serde::{Deserialize, Serialize};
use stakequiz_types::{AnswerId, QuestionId, SessionId, Timestamp};

/// Join record between a session and one of its assigned questions.
///
/// A `(session, question)` pair exists at most once; the batch for a session
/// is written atomically together with the verification state flip, so a
/// partial set is never observable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAssignment {
    pub session_id: SessionId,
    pub question_id: QuestionId,

    /// 1-based display position; the batch forms a permutation of 1..=N.
    pub display_order: u32,

    pub chosen_answer: Option<AnswerId>,
    pub answered_at: Option<Timestamp>,
}

impl QuestionAssignment {
    pub fn new(session_id: SessionId, question_id: QuestionId, display_order: u32) -> Self {
        Self {
            session_id,
            question_id,
            display_order,
            chosen_answer: None,
            answered_at: None,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.chosen_answer.is_some()
    }
}

//! Static quiz content: categories, questions, answers.

use crate::{QuestionAssignment, StoreError};
use serde::{Deserialize, Serialize};
use stakequiz_types::{AnswerId, CategoryId, QuestionId, SessionId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizCategory {
    pub id: CategoryId,
    pub name: String,
}

/// One answer option. Exactly one answer per question is correct.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAnswer {
    pub id: AnswerId,
    pub text: String,
    pub correct: bool,
}

/// A question with its answer options embedded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: QuestionId,
    pub category_id: CategoryId,
    pub text: String,
    pub answers: Vec<QuizAnswer>,
}

impl QuizQuestion {
    /// The single correct answer, if the question is well-formed.
    pub fn correct_answer(&self) -> Option<&QuizAnswer> {
        self.answers.iter().find(|a| a.correct)
    }

    /// Content validation applied on insert: at least two options, exactly
    /// one of them correct.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.answers.len() < 2 {
            return Err(StoreError::Conflict(format!(
                "question {} has fewer than two answers",
                self.id
            )));
        }
        let correct = self.answers.iter().filter(|a| a.correct).count();
        if correct != 1 {
            return Err(StoreError::Conflict(format!(
                "question {} has {correct} correct answers, expected exactly one",
                self.id
            )));
        }
        Ok(())
    }
}

/// Storage for quiz content and per-session question assignments.
pub trait QuizContentStore {
    fn put_category(&self, category: &QuizCategory) -> Result<(), StoreError>;

    /// Insert a question after [`QuizQuestion::validate`].
    fn put_question(&self, question: &QuizQuestion) -> Result<(), StoreError>;

    fn categories(&self) -> Result<Vec<QuizCategory>, StoreError>;

    fn questions_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<QuizQuestion>, StoreError>;

    fn question(&self, id: QuestionId) -> Result<Option<QuizQuestion>, StoreError>;

    /// All assignments for a session, sorted by display order.
    fn assignments_for_session(
        &self,
        session: SessionId,
    ) -> Result<Vec<QuestionAssignment>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(correct: bool) -> QuizAnswer {
        QuizAnswer {
            id: AnswerId::random(),
            text: "option".into(),
            correct,
        }
    }

    #[test]
    fn validate_accepts_one_correct_answer() {
        let q = QuizQuestion {
            id: QuestionId::random(),
            category_id: CategoryId::random(),
            text: "?".into(),
            answers: vec![answer(false), answer(true), answer(false)],
        };
        assert!(q.validate().is_ok());
        assert!(q.correct_answer().unwrap().correct);
    }

    #[test]
    fn validate_rejects_zero_or_multiple_correct() {
        let none = QuizQuestion {
            id: QuestionId::random(),
            category_id: CategoryId::random(),
            text: "?".into(),
            answers: vec![answer(false), answer(false)],
        };
        assert!(none.validate().is_err());

        let two = QuizQuestion {
            id: QuestionId::random(),
            category_id: CategoryId::random(),
            text: "?".into(),
            answers: vec![answer(true), answer(true)],
        };
        assert!(two.validate().is_err());
    }

    #[test]
    fn validate_rejects_single_option() {
        let q = QuizQuestion {
            id: QuestionId::random(),
            category_id: CategoryId::random(),
            text: "?".into(),
            answers: vec![answer(true)],
        };
        assert!(q.validate().is_err());
    }
}

//! Random question selection for a verified session.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use tracing::debug;

use stakequiz_store::{QuestionAssignment, QuizContentStore};
use stakequiz_types::SessionId;

use crate::QuizError;

/// Picks the question set a session answers.
///
/// One question from each of `questions_per_session` distinct random
/// categories, presented in a shuffled order. Selection is all-or-nothing:
/// any content shortfall aborts before a single assignment is produced.
#[derive(Clone, Debug)]
pub struct AssignmentEngine {
    questions_per_session: usize,
}

impl AssignmentEngine {
    pub fn new(questions_per_session: usize) -> Self {
        Self {
            questions_per_session,
        }
    }

    /// Build the assignment batch for `session`.
    ///
    /// The returned batch is not persisted here; the caller commits it
    /// together with the verification state transition.
    pub fn assign<S, R>(
        &self,
        store: &S,
        session: SessionId,
        rng: &mut R,
    ) -> Result<Vec<QuestionAssignment>, QuizError>
    where
        S: QuizContentStore,
        R: Rng + ?Sized,
    {
        let categories = store.categories()?;
        if categories.len() < self.questions_per_session {
            return Err(QuizError::NotEnoughCategories {
                available: categories.len(),
                required: self.questions_per_session,
            });
        }

        let chosen: Vec<_> = categories
            .choose_multiple(rng, self.questions_per_session)
            .collect();

        let mut question_ids = Vec::with_capacity(self.questions_per_session);
        for category in &chosen {
            let questions = store.questions_in_category(category.id)?;
            let question = questions.choose(rng).ok_or_else(|| QuizError::EmptyCategory {
                name: category.name.clone(),
            })?;
            question_ids.push(question.id);
        }

        let mut orders: Vec<u32> = (1..=self.questions_per_session as u32).collect();
        orders.shuffle(rng);

        let assignments: Vec<_> = question_ids
            .into_iter()
            .zip(orders)
            .map(|(question, order)| QuestionAssignment::new(session, question, order))
            .collect();

        debug!(
            session_id = %session,
            count = assignments.len(),
            "assigned questions"
        );
        Ok(assignments)
    }
}

/// Count correct answers among a session's assignments.
///
/// Unanswered questions score zero. A missing question record is data
/// corruption and surfaces as a store error rather than a silent miss.
pub fn score_answers<S: QuizContentStore>(
    store: &S,
    assignments: &[QuestionAssignment],
) -> Result<u32, QuizError> {
    let mut score = 0;
    for assignment in assignments {
        let Some(chosen) = assignment.chosen_answer else {
            continue;
        };
        let question = store.question(assignment.question_id)?.ok_or_else(|| {
            stakequiz_store::StoreError::Corruption(format!(
                "assignment references missing question {}",
                assignment.question_id
            ))
        })?;
        if question.correct_answer().map(|a| a.id) == Some(chosen) {
            score += 1;
        }
    }
    Ok(score)
}

//! Nullable store — thread-safe in-memory storage for testing.
//!
//! Behaves like the LMDB backend: signature uniqueness spans sessions and
//! secondary stakes, conditional updates only apply from `processing`, and
//! the assignment batch lands together with the state flip.

use std::collections::HashMap;
use std::sync::Mutex;

use stakequiz_store::{
    ConfigStore, NewSecondaryStake, NewSession, QuestionAssignment, QuizCategory,
    QuizContentStore, QuizQuestion, SecondaryStake, SecondaryStakeStore, SessionStore,
    StakeSession, StoreError, User,
};
use stakequiz_types::{
    AnswerId, AssignmentSource, CategoryId, Lamports, QuestionId, SessionId, StakeId, Timestamp,
    TxSignature, VerificationState, WalletAddress,
};

/// An in-memory implementation of every storage trait.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    sessions: HashMap<SessionId, StakeSession>,
    session_by_user: HashMap<String, SessionId>,
    secondaries: HashMap<StakeId, SecondaryStake>,
    categories: Vec<QuizCategory>,
    questions: HashMap<QuestionId, QuizQuestion>,
    assignments: HashMap<(SessionId, QuestionId), QuestionAssignment>,
    quiz_paused: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn signature_in_use(&self, signature: &TxSignature) -> bool {
        self.sessions.values().any(|s| &s.signature == signature)
            || self.secondaries.values().any(|s| &s.signature == signature)
    }

    fn session_mut(&mut self, id: SessionId) -> Result<&mut StakeSession, StoreError> {
        self.sessions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))
    }
}

impl SessionStore for MemoryStore {
    fn create_user_if_absent(
        &self,
        wallet: &WalletAddress,
        now: Timestamp,
    ) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let user = inner
            .users
            .entry(wallet.as_str().to_string())
            .or_insert_with(|| User {
                wallet: wallet.clone(),
                created_at: now,
            });
        Ok(user.clone())
    }

    fn user(&self, wallet: &WalletAddress) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().unwrap().users.get(wallet.as_str()).cloned())
    }

    fn create_session(&self, new: NewSession) -> Result<StakeSession, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.signature_in_use(&new.signature) {
            return Err(StoreError::Duplicate(format!(
                "signature {} already used",
                new.signature
            )));
        }
        if inner.session_by_user.contains_key(new.wallet.as_str()) {
            return Err(StoreError::Conflict(format!(
                "wallet {} already has a session",
                new.wallet
            )));
        }

        let session = StakeSession {
            id: SessionId::random(),
            wallet: new.wallet,
            amount: new.amount,
            duration_secs: new.duration_secs,
            signature: new.signature,
            state: VerificationState::Processing,
            confirmed_at: None,
            total_stake: Lamports::ZERO,
            score: None,
            completed_at: None,
            shadow_banned: false,
            assignment_source: None,
            created_at: new.created_at,
        };
        inner
            .session_by_user
            .insert(session.wallet.as_str().to_string(), session.id);
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    fn session(&self, id: SessionId) -> Result<Option<StakeSession>, StoreError> {
        Ok(self.inner.lock().unwrap().sessions.get(&id).cloned())
    }

    fn session_by_user(
        &self,
        wallet: &WalletAddress,
    ) -> Result<Option<StakeSession>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .session_by_user
            .get(wallet.as_str())
            .and_then(|id| inner.sessions.get(id))
            .cloned())
    }

    fn try_complete_session(
        &self,
        id: SessionId,
        confirmed_at: Timestamp,
        source: AssignmentSource,
        assignments: &[QuestionAssignment],
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner.session_mut(id)?;
        if session.state != VerificationState::Processing {
            return Ok(false);
        }
        session.state = VerificationState::Success;
        session.confirmed_at = Some(confirmed_at);
        session.total_stake = session.amount;
        session.assignment_source = Some(source);
        for assignment in assignments {
            inner
                .assignments
                .insert((id, assignment.question_id), assignment.clone());
        }
        Ok(true)
    }

    fn try_fail_session(&self, id: SessionId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner.session_mut(id)?;
        if session.state != VerificationState::Processing {
            return Ok(false);
        }
        session.state = VerificationState::Failed;
        Ok(true)
    }

    fn record_answer(
        &self,
        session_id: SessionId,
        question: QuestionId,
        answer: AnswerId,
        at: Timestamp,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner
            .sessions
            .get(&session_id)
            .ok_or_else(|| StoreError::NotFound(format!("session {session_id}")))?;
        if session.completed_at.is_some() {
            return Err(StoreError::Conflict(format!(
                "session {session_id} already completed its quiz"
            )));
        }
        let belongs = inner
            .questions
            .get(&question)
            .ok_or_else(|| StoreError::NotFound(format!("question {question}")))?
            .answers
            .iter()
            .any(|a| a.id == answer);
        if !belongs {
            return Err(StoreError::Conflict(format!(
                "answer {answer} does not belong to question {question}"
            )));
        }
        let assignment = inner
            .assignments
            .get_mut(&(session_id, question))
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "question {question} is not assigned to session {session_id}"
                ))
            })?;
        assignment.chosen_answer = Some(answer);
        assignment.answered_at = Some(at);
        Ok(())
    }

    fn complete_quiz(
        &self,
        session_id: SessionId,
        score: u32,
        at: Timestamp,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let has_assignments = inner.assignments.keys().any(|(s, _)| *s == session_id);
        let session = inner.session_mut(session_id)?;
        if session.state != VerificationState::Success {
            return Err(StoreError::Conflict(format!(
                "session {session_id} is {}, quiz not unlocked",
                session.state
            )));
        }
        if session.completed_at.is_some() {
            return Err(StoreError::Conflict(format!(
                "session {session_id} already completed its quiz"
            )));
        }
        if !has_assignments {
            return Err(StoreError::Corruption(format!(
                "session {session_id} is verified but has no assignments"
            )));
        }
        session.score = Some(score);
        session.completed_at = Some(at);
        Ok(())
    }

    fn reset_session(&self, id: SessionId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner.session_mut(id)?;
        session.state = VerificationState::Processing;
        session.confirmed_at = None;
        session.total_stake = Lamports::ZERO;
        session.score = None;
        session.completed_at = None;
        session.assignment_source = None;
        inner.assignments.retain(|(s, _), _| *s != id);
        Ok(())
    }

    fn set_shadow_ban(&self, id: SessionId, banned: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.session_mut(id)?.shadow_banned = banned;
        Ok(())
    }
}

impl SecondaryStakeStore for MemoryStore {
    fn create_secondary(&self, new: NewSecondaryStake) -> Result<SecondaryStake, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let parent = inner
            .sessions
            .get(&new.session_id)
            .ok_or_else(|| StoreError::NotFound(format!("session {}", new.session_id)))?;
        if parent.state != VerificationState::Success {
            return Err(StoreError::Conflict(format!(
                "session {} is {}, secondary stakes require a verified primary",
                parent.id, parent.state
            )));
        }
        if inner.signature_in_use(&new.signature) {
            return Err(StoreError::Duplicate(format!(
                "signature {} already used",
                new.signature
            )));
        }

        let stake = SecondaryStake {
            id: StakeId::random(),
            session_id: new.session_id,
            wallet: new.wallet,
            amount: new.amount,
            signature: new.signature,
            state: VerificationState::Processing,
            confirmed_at: None,
            created_at: new.created_at,
        };
        inner.secondaries.insert(stake.id, stake.clone());
        Ok(stake)
    }

    fn secondary(&self, id: StakeId) -> Result<Option<SecondaryStake>, StoreError> {
        Ok(self.inner.lock().unwrap().secondaries.get(&id).cloned())
    }

    fn secondaries_for_session(
        &self,
        session: SessionId,
    ) -> Result<Vec<SecondaryStake>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .secondaries
            .values()
            .filter(|s| s.session_id == session)
            .cloned()
            .collect())
    }

    fn try_confirm_secondary(
        &self,
        id: StakeId,
        confirmed_at: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let stake = inner
            .secondaries
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("secondary stake {id}")))?
            .clone();
        if stake.state != VerificationState::Processing {
            return Ok(false);
        }
        let parent = inner.session_mut(stake.session_id)?;
        parent.total_stake = parent.total_stake.saturating_add(stake.amount);
        let stake = inner.secondaries.get_mut(&id).ok_or_else(|| {
            StoreError::NotFound(format!("secondary stake {id}"))
        })?;
        stake.state = VerificationState::Success;
        stake.confirmed_at = Some(confirmed_at);
        Ok(true)
    }

    fn try_fail_secondary(&self, id: StakeId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let stake = inner
            .secondaries
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("secondary stake {id}")))?;
        if stake.state != VerificationState::Processing {
            return Ok(false);
        }
        stake.state = VerificationState::Failed;
        Ok(true)
    }
}

impl QuizContentStore for MemoryStore {
    fn put_category(&self, category: &QuizCategory) -> Result<(), StoreError> {
        self.inner.lock().unwrap().categories.push(category.clone());
        Ok(())
    }

    fn put_question(&self, question: &QuizQuestion) -> Result<(), StoreError> {
        question.validate()?;
        let mut inner = self.inner.lock().unwrap();
        if !inner.categories.iter().any(|c| c.id == question.category_id) {
            return Err(StoreError::NotFound(format!(
                "category {}",
                question.category_id
            )));
        }
        inner.questions.insert(question.id, question.clone());
        Ok(())
    }

    fn categories(&self) -> Result<Vec<QuizCategory>, StoreError> {
        Ok(self.inner.lock().unwrap().categories.clone())
    }

    fn questions_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<QuizQuestion>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .questions
            .values()
            .filter(|q| q.category_id == category)
            .cloned()
            .collect())
    }

    fn question(&self, id: QuestionId) -> Result<Option<QuizQuestion>, StoreError> {
        Ok(self.inner.lock().unwrap().questions.get(&id).cloned())
    }

    fn assignments_for_session(
        &self,
        session: SessionId,
    ) -> Result<Vec<QuestionAssignment>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut assignments: Vec<_> = inner
            .assignments
            .iter()
            .filter(|((s, _), _)| *s == session)
            .map(|(_, a)| a.clone())
            .collect();
        assignments.sort_by_key(|a| a.display_order);
        Ok(assignments)
    }
}

impl ConfigStore for MemoryStore {
    fn quiz_paused(&self) -> Result<bool, StoreError> {
        Ok(self.inner.lock().unwrap().quiz_paused)
    }

    fn set_quiz_paused(&self, paused: bool) -> Result<(), StoreError> {
        self.inner.lock().unwrap().quiz_paused = paused;
        Ok(())
    }
}

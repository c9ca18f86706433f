//! LMDB implementation of `SessionStore`.

use stakequiz_store::{
    NewSession, QuestionAssignment, SessionStore, StakeSession, StoreError, User,
};
use stakequiz_types::{
    AnswerId, AssignmentSource, Lamports, QuestionId, SessionId, Timestamp, VerificationState,
    WalletAddress,
};

use crate::keys::composite_key;
use crate::{LmdbError, LmdbStakeStore};

impl SessionStore for LmdbStakeStore {
    fn create_user_if_absent(
        &self,
        wallet: &WalletAddress,
        now: Timestamp,
    ) -> Result<User, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = wallet.as_str().as_bytes();

        if let Some(bytes) = self.users_db.get(&wtxn, key).map_err(LmdbError::from)? {
            let user: User = bincode::deserialize(bytes).map_err(LmdbError::from)?;
            return Ok(user);
        }

        let user = User {
            wallet: wallet.clone(),
            created_at: now,
        };
        let bytes = bincode::serialize(&user).map_err(LmdbError::from)?;
        self.users_db
            .put(&mut wtxn, key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(user)
    }

    fn user(&self, wallet: &WalletAddress) -> Result<Option<User>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .users_db
            .get(&rtxn, wallet.as_str().as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(
                bincode::deserialize(bytes).map_err(LmdbError::from)?,
            )),
            None => Ok(None),
        }
    }

    fn create_session(&self, new: NewSession) -> Result<StakeSession, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        if self
            .signature_in_use(&wtxn, &new.signature)
            .map_err(LmdbError::from)?
        {
            return Err(StoreError::Duplicate(format!(
                "signature {} already used",
                new.signature
            )));
        }

        let user_key = new.wallet.as_str().as_bytes();
        if self
            .session_by_user_db
            .get(&wtxn, user_key)
            .map_err(LmdbError::from)?
            .is_some()
        {
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

        self.put_session_txn(&mut wtxn, &session)
            .map_err(LmdbError::from)?;
        self.session_by_user_db
            .put(
                &mut wtxn,
                session.wallet.as_str().as_bytes(),
                session.id.as_bytes(),
            )
            .map_err(LmdbError::from)?;
        self.session_by_signature_db
            .put(
                &mut wtxn,
                session.signature.as_str().as_bytes(),
                session.id.as_bytes(),
            )
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(session)
    }

    fn session(&self, id: SessionId) -> Result<Option<StakeSession>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.session_txn(&rtxn, id).map_err(LmdbError::from)?)
    }

    fn session_by_user(
        &self,
        wallet: &WalletAddress,
    ) -> Result<Option<StakeSession>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let id_bytes = match self
            .session_by_user_db
            .get(&rtxn, wallet.as_str().as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let id_arr: [u8; 16] = id_bytes
            .try_into()
            .map_err(|_| StoreError::Corruption("malformed session id index".into()))?;
        Ok(self
            .session_txn(&rtxn, SessionId::from_bytes(id_arr))
            .map_err(LmdbError::from)?)
    }

    fn try_complete_session(
        &self,
        id: SessionId,
        confirmed_at: Timestamp,
        source: AssignmentSource,
        assignments: &[QuestionAssignment],
    ) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let mut session = self
            .session_txn(&wtxn, id)
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))?;

        // The compare-and-swap guard: another worker may have finished first.
        if session.state != VerificationState::Processing {
            return Ok(false);
        }

        session.state = VerificationState::Success;
        session.confirmed_at = Some(confirmed_at);
        session.total_stake = session.amount;
        session.assignment_source = Some(source);
        self.put_session_txn(&mut wtxn, &session)
            .map_err(LmdbError::from)?;

        for assignment in assignments {
            let key = composite_key(id.as_bytes(), assignment.question_id.as_bytes());
            let bytes = bincode::serialize(assignment).map_err(LmdbError::from)?;
            self.assignments_db
                .put(&mut wtxn, key.as_slice(), &bytes)
                .map_err(LmdbError::from)?;
        }

        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }

    fn try_fail_session(&self, id: SessionId) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let mut session = self
            .session_txn(&wtxn, id)
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))?;

        if session.state != VerificationState::Processing {
            return Ok(false);
        }

        session.state = VerificationState::Failed;
        self.put_session_txn(&mut wtxn, &session)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }

    fn record_answer(
        &self,
        session_id: SessionId,
        question: QuestionId,
        answer: AnswerId,
        at: Timestamp,
    ) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let session = self
            .session_txn(&wtxn, session_id)
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(format!("session {session_id}")))?;
        if session.completed_at.is_some() {
            return Err(StoreError::Conflict(format!(
                "session {session_id} already completed its quiz"
            )));
        }

        let key = composite_key(session_id.as_bytes(), question.as_bytes());
        let mut assignment: QuestionAssignment = match self
            .assignments_db
            .get(&wtxn, key.as_slice())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => bincode::deserialize(bytes).map_err(LmdbError::from)?,
            None => {
                return Err(StoreError::NotFound(format!(
                    "question {question} is not assigned to session {session_id}"
                )))
            }
        };

        let question_record = self
            .question_record(&wtxn, question)
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(format!("question {question}")))?;
        if !question_record.answers.iter().any(|a| a.id == answer) {
            return Err(StoreError::Conflict(format!(
                "answer {answer} does not belong to question {question}"
            )));
        }

        assignment.chosen_answer = Some(answer);
        assignment.answered_at = Some(at);
        let bytes = bincode::serialize(&assignment).map_err(LmdbError::from)?;
        self.assignments_db
            .put(&mut wtxn, key.as_slice(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn complete_quiz(
        &self,
        session_id: SessionId,
        score: u32,
        at: Timestamp,
    ) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let mut session = self
            .session_txn(&wtxn, session_id)
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(format!("session {session_id}")))?;

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
        let has_assignments = !self
            .scan_prefix(&self.assignments_db, &wtxn, session_id.as_bytes())
            .map_err(LmdbError::from)?
            .is_empty();
        if !has_assignments {
            return Err(StoreError::Corruption(format!(
                "session {session_id} is verified but has no assignments"
            )));
        }

        session.score = Some(score);
        session.completed_at = Some(at);
        self.put_session_txn(&mut wtxn, &session)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn reset_session(&self, id: SessionId) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let mut session = self
            .session_txn(&wtxn, id)
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))?;

        session.state = VerificationState::Processing;
        session.confirmed_at = None;
        session.total_stake = Lamports::ZERO;
        session.score = None;
        session.completed_at = None;
        session.assignment_source = None;
        self.put_session_txn(&mut wtxn, &session)
            .map_err(LmdbError::from)?;
        self.delete_prefix(&self.assignments_db, &mut wtxn, id.as_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;

        tracing::info!(session_id = %id, "session reset to processing by admin");
        Ok(())
    }

    fn set_shadow_ban(&self, id: SessionId, banned: bool) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let mut session = self
            .session_txn(&wtxn, id)
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))?;

        session.shadow_banned = banned;
        self.put_session_txn(&mut wtxn, &session)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

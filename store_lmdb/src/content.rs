//! LMDB implementation of `QuizContentStore` and `ConfigStore`.

use heed::RoTxn;

use stakequiz_store::{
    ConfigStore, QuestionAssignment, QuizCategory, QuizContentStore, QuizQuestion, StoreError,
};
use stakequiz_types::{CategoryId, QuestionId, SessionId};

use crate::keys::composite_key;
use crate::{LmdbError, LmdbStakeStore};

const QUIZ_PAUSED_KEY: &[u8] = b"quiz_paused";

impl LmdbStakeStore {
    pub(crate) fn question_record(
        &self,
        txn: &RoTxn,
        id: QuestionId,
    ) -> Result<Option<QuizQuestion>, LmdbError> {
        match self.questions_db.get(txn, id.as_bytes().as_slice())? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }
}

impl QuizContentStore for LmdbStakeStore {
    fn put_category(&self, category: &QuizCategory) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let bytes = bincode::serialize(category).map_err(LmdbError::from)?;
        self.categories_db
            .put(&mut wtxn, category.id.as_bytes().as_slice(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn put_question(&self, question: &QuizQuestion) -> Result<(), StoreError> {
        question.validate()?;

        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .categories_db
            .get(&wtxn, question.category_id.as_bytes().as_slice())
            .map_err(LmdbError::from)?
            .is_none()
        {
            return Err(StoreError::NotFound(format!(
                "category {}",
                question.category_id
            )));
        }

        let bytes = bincode::serialize(question).map_err(LmdbError::from)?;
        self.questions_db
            .put(&mut wtxn, question.id.as_bytes().as_slice(), &bytes)
            .map_err(LmdbError::from)?;
        let link = composite_key(question.category_id.as_bytes(), question.id.as_bytes());
        self.question_by_category_db
            .put(&mut wtxn, link.as_slice(), &[])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn categories(&self) -> Result<Vec<QuizCategory>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut categories = Vec::new();
        for entry in self.categories_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (_, bytes) = entry.map_err(LmdbError::from)?;
            categories.push(bincode::deserialize(bytes).map_err(LmdbError::from)?);
        }
        Ok(categories)
    }

    fn questions_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<QuizQuestion>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let links = self
            .scan_prefix(&self.question_by_category_db, &rtxn, category.as_bytes())
            .map_err(LmdbError::from)?;

        let mut questions = Vec::with_capacity(links.len());
        for (key, _) in links {
            let id_arr: [u8; 16] = key[16..]
                .try_into()
                .map_err(|_| StoreError::Corruption("malformed question link key".into()))?;
            let question = self
                .question_record(&rtxn, QuestionId::from_bytes(id_arr))
                .map_err(LmdbError::from)?
                .ok_or_else(|| {
                    StoreError::Corruption(format!(
                        "question link points at missing question in category {category}"
                    ))
                })?;
            questions.push(question);
        }
        Ok(questions)
    }

    fn question(&self, id: QuestionId) -> Result<Option<QuizQuestion>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.question_record(&rtxn, id).map_err(LmdbError::from)?)
    }

    fn assignments_for_session(
        &self,
        session: SessionId,
    ) -> Result<Vec<QuestionAssignment>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let entries = self
            .scan_prefix(&self.assignments_db, &rtxn, session.as_bytes())
            .map_err(LmdbError::from)?;

        let mut assignments = Vec::with_capacity(entries.len());
        for (_, bytes) in entries {
            let assignment: QuestionAssignment =
                bincode::deserialize(&bytes).map_err(LmdbError::from)?;
            assignments.push(assignment);
        }
        assignments.sort_by_key(|a| a.display_order);
        Ok(assignments)
    }
}

impl ConfigStore for LmdbStakeStore {
    fn quiz_paused(&self) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self
            .config_db
            .get(&rtxn, QUIZ_PAUSED_KEY)
            .map_err(LmdbError::from)?
            .map(|bytes| bytes == [1])
            .unwrap_or(false))
    }

    fn set_quiz_paused(&self, paused: bool) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let value: &[u8] = if paused { &[1] } else { &[0] };
        self.config_db
            .put(&mut wtxn, QUIZ_PAUSED_KEY, value)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use stakequiz_store::{
        ConfigStore, NewSecondaryStake, NewSession, QuestionAssignment, QuizAnswer,
        QuizCategory, QuizContentStore, QuizQuestion, SecondaryStakeStore, SessionStore,
        StoreError,
    };
    use stakequiz_types::{
        AnswerId, AssignmentSource, CategoryId, Lamports, QuestionId, Timestamp, TxSignature,
        VerificationState, WalletAddress,
    };

    use crate::LmdbStakeStore;

    /// Helper: open a temporary LMDB environment.
    fn temp_store() -> (tempfile::TempDir, LmdbStakeStore) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let store =
            LmdbStakeStore::open(dir.path(), 10 * 1024 * 1024).expect("failed to open env");
        (dir, store)
    }

    fn wallet(tag: u8) -> WalletAddress {
        WalletAddress::new(format!("{}", char::from(b'A' + tag)).repeat(40))
    }

    fn signature(tag: u8) -> TxSignature {
        TxSignature::new(format!("{}", char::from(b'a' + tag)).repeat(87))
    }

    fn new_session(tag: u8) -> NewSession {
        NewSession {
            wallet: wallet(tag),
            amount: Lamports::new(2_500_000_000),
            duration_secs: 90 * 86400,
            signature: signature(tag),
            created_at: Timestamp::new(1_700_000_000),
        }
    }

    fn seed_content(store: &LmdbStakeStore, categories: usize) -> Vec<QuizQuestion> {
        let mut questions = Vec::new();
        for i in 0..categories {
            let category = QuizCategory {
                id: CategoryId::random(),
                name: format!("category-{i}"),
            };
            store.put_category(&category).unwrap();
            let question = QuizQuestion {
                id: QuestionId::random(),
                category_id: category.id,
                text: format!("question-{i}"),
                answers: vec![
                    QuizAnswer {
                        id: AnswerId::random(),
                        text: "right".into(),
                        correct: true,
                    },
                    QuizAnswer {
                        id: AnswerId::random(),
                        text: "wrong".into(),
                        correct: false,
                    },
                ],
            };
            store.put_question(&question).unwrap();
            questions.push(question);
        }
        questions
    }

    fn assignments_for(
        session: stakequiz_types::SessionId,
        questions: &[QuizQuestion],
    ) -> Vec<QuestionAssignment> {
        questions
            .iter()
            .enumerate()
            .map(|(i, q)| QuestionAssignment::new(session, q.id, i as u32 + 1))
            .collect()
    }

    // ── Session lifecycle ───────────────────────────────────────────────

    #[test]
    fn create_session_starts_processing() {
        let (_dir, store) = temp_store();
        let session = store.create_session(new_session(0)).unwrap();
        assert_eq!(session.state, VerificationState::Processing);
        assert_eq!(session.total_stake, Lamports::ZERO);

        let loaded = store.session(session.id).unwrap().unwrap();
        assert_eq!(loaded, session);
        let by_user = store.session_by_user(&wallet(0)).unwrap().unwrap();
        assert_eq!(by_user.id, session.id);
    }

    #[test]
    fn duplicate_signature_is_a_distinct_conflict() {
        let (_dir, store) = temp_store();
        store.create_session(new_session(0)).unwrap();

        let mut second = new_session(1);
        second.signature = signature(0);
        let err = store.create_session(second).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)), "got {err:?}");
    }

    #[test]
    fn one_session_per_user() {
        let (_dir, store) = temp_store();
        store.create_session(new_session(0)).unwrap();

        let mut second = new_session(0);
        second.signature = signature(5);
        let err = store.create_session(second).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn try_complete_session_applies_once() {
        let (_dir, store) = temp_store();
        let questions = seed_content(&store, 5);
        let session = store.create_session(new_session(0)).unwrap();
        let batch = assignments_for(session.id, &questions);

        let won = store
            .try_complete_session(
                session.id,
                Timestamp::new(1_700_000_100),
                AssignmentSource::Job,
                &batch,
            )
            .unwrap();
        assert!(won);

        let loaded = store.session(session.id).unwrap().unwrap();
        assert_eq!(loaded.state, VerificationState::Success);
        assert_eq!(loaded.total_stake, Lamports::new(2_500_000_000));
        assert_eq!(loaded.assignment_source, Some(AssignmentSource::Job));
        assert_eq!(store.assignments_for_session(session.id).unwrap().len(), 5);

        // Second writer loses the CAS and writes nothing new.
        let won_again = store
            .try_complete_session(
                session.id,
                Timestamp::new(1_700_000_200),
                AssignmentSource::Job,
                &batch,
            )
            .unwrap();
        assert!(!won_again);
        let reloaded = store.session(session.id).unwrap().unwrap();
        assert_eq!(reloaded.confirmed_at, Some(Timestamp::new(1_700_000_100)));
        assert_eq!(store.assignments_for_session(session.id).unwrap().len(), 5);
    }

    #[test]
    fn try_fail_session_respects_terminal_states() {
        let (_dir, store) = temp_store();
        let questions = seed_content(&store, 5);
        let session = store.create_session(new_session(0)).unwrap();

        assert!(store.try_fail_session(session.id).unwrap());
        assert!(!store.try_fail_session(session.id).unwrap());

        // A success never degrades to failed through the pipeline path.
        let other = store.create_session(new_session(1)).unwrap();
        store
            .try_complete_session(
                other.id,
                Timestamp::now(),
                AssignmentSource::Job,
                &assignments_for(other.id, &questions),
            )
            .unwrap();
        assert!(!store.try_fail_session(other.id).unwrap());
        assert_eq!(
            store.session(other.id).unwrap().unwrap().state,
            VerificationState::Success
        );
    }

    #[test]
    fn assignments_sorted_by_display_order() {
        let (_dir, store) = temp_store();
        let questions = seed_content(&store, 5);
        let session = store.create_session(new_session(0)).unwrap();

        let mut batch = assignments_for(session.id, &questions);
        batch.reverse(); // insert out of order
        for (i, a) in batch.iter_mut().enumerate() {
            a.display_order = i as u32 + 1;
        }
        store
            .try_complete_session(session.id, Timestamp::now(), AssignmentSource::Job, &batch)
            .unwrap();

        let loaded = store.assignments_for_session(session.id).unwrap();
        let orders: Vec<u32> = loaded.iter().map(|a| a.display_order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5]);
    }

    // ── Quiz answering ──────────────────────────────────────────────────

    #[test]
    fn record_answer_and_complete_quiz() {
        let (_dir, store) = temp_store();
        let questions = seed_content(&store, 5);
        let session = store.create_session(new_session(0)).unwrap();
        store
            .try_complete_session(
                session.id,
                Timestamp::now(),
                AssignmentSource::Job,
                &assignments_for(session.id, &questions),
            )
            .unwrap();

        let chosen = questions[0].answers[0].id;
        store
            .record_answer(session.id, questions[0].id, chosen, Timestamp::new(5))
            .unwrap();
        let loaded = store.assignments_for_session(session.id).unwrap();
        let answered = loaded
            .iter()
            .find(|a| a.question_id == questions[0].id)
            .unwrap();
        assert_eq!(answered.chosen_answer, Some(chosen));

        store
            .complete_quiz(session.id, 4, Timestamp::new(10))
            .unwrap();
        let done = store.session(session.id).unwrap().unwrap();
        assert_eq!(done.score, Some(4));
        assert_eq!(done.completed_at, Some(Timestamp::new(10)));

        // Second completion and late answers are conflicts.
        assert!(matches!(
            store.complete_quiz(session.id, 5, Timestamp::new(11)),
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            store.record_answer(session.id, questions[1].id, questions[1].answers[0].id, Timestamp::new(12)),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn record_answer_rejects_foreign_answer() {
        let (_dir, store) = temp_store();
        let questions = seed_content(&store, 5);
        let session = store.create_session(new_session(0)).unwrap();
        store
            .try_complete_session(
                session.id,
                Timestamp::now(),
                AssignmentSource::Job,
                &assignments_for(session.id, &questions),
            )
            .unwrap();

        let foreign = questions[1].answers[0].id;
        let err = store
            .record_answer(session.id, questions[0].id, foreign, Timestamp::new(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn complete_quiz_requires_verified_session() {
        let (_dir, store) = temp_store();
        seed_content(&store, 5);
        let session = store.create_session(new_session(0)).unwrap();
        let err = store
            .complete_quiz(session.id, 3, Timestamp::now())
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    // ── Admin overrides ─────────────────────────────────────────────────

    #[test]
    fn reset_session_clears_everything() {
        let (_dir, store) = temp_store();
        let questions = seed_content(&store, 5);
        let session = store.create_session(new_session(0)).unwrap();
        store
            .try_complete_session(
                session.id,
                Timestamp::now(),
                AssignmentSource::Job,
                &assignments_for(session.id, &questions),
            )
            .unwrap();

        store.reset_session(session.id).unwrap();
        let reset = store.session(session.id).unwrap().unwrap();
        assert_eq!(reset.state, VerificationState::Processing);
        assert_eq!(reset.total_stake, Lamports::ZERO);
        assert!(reset.confirmed_at.is_none());
        assert!(store.assignments_for_session(session.id).unwrap().is_empty());
    }

    #[test]
    fn shadow_ban_round_trip() {
        let (_dir, store) = temp_store();
        let session = store.create_session(new_session(0)).unwrap();
        store.set_shadow_ban(session.id, true).unwrap();
        assert!(store.session(session.id).unwrap().unwrap().shadow_banned);
        store.set_shadow_ban(session.id, false).unwrap();
        assert!(!store.session(session.id).unwrap().unwrap().shadow_banned);
    }

    // ── Secondary stakes ────────────────────────────────────────────────

    fn verified_session(store: &LmdbStakeStore, tag: u8) -> stakequiz_types::SessionId {
        let questions = seed_content(store, 5);
        let session = store.create_session(new_session(tag)).unwrap();
        store
            .try_complete_session(
                session.id,
                Timestamp::now(),
                AssignmentSource::Job,
                &assignments_for(session.id, &questions),
            )
            .unwrap();
        session.id
    }

    #[test]
    fn secondary_requires_verified_parent() {
        let (_dir, store) = temp_store();
        let session = store.create_session(new_session(0)).unwrap();

        let err = store
            .create_secondary(NewSecondaryStake {
                session_id: session.id,
                wallet: wallet(0),
                amount: Lamports::new(1_000_000_000),
                signature: signature(9),
                created_at: Timestamp::now(),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn confirm_secondary_adds_to_parent_total() {
        let (_dir, store) = temp_store();
        let session_id = verified_session(&store, 0);

        let stake = store
            .create_secondary(NewSecondaryStake {
                session_id,
                wallet: wallet(0),
                amount: Lamports::new(1_000_000_000),
                signature: signature(9),
                created_at: Timestamp::now(),
            })
            .unwrap();
        assert_eq!(stake.state, VerificationState::Processing);

        assert!(store
            .try_confirm_secondary(stake.id, Timestamp::new(77))
            .unwrap());
        let parent = store.session(session_id).unwrap().unwrap();
        assert_eq!(parent.total_stake, Lamports::new(3_500_000_000));

        // Duplicate delivery is a no-op; the total is not double-counted.
        assert!(!store
            .try_confirm_secondary(stake.id, Timestamp::new(78))
            .unwrap());
        let parent = store.session(session_id).unwrap().unwrap();
        assert_eq!(parent.total_stake, Lamports::new(3_500_000_000));

        let listed = store.secondaries_for_session(session_id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].state, VerificationState::Success);
    }

    #[test]
    fn secondary_signature_shares_uniqueness_with_sessions() {
        let (_dir, store) = temp_store();
        let session_id = verified_session(&store, 0);

        let err = store
            .create_secondary(NewSecondaryStake {
                session_id,
                wallet: wallet(0),
                amount: Lamports::new(1),
                signature: signature(0), // primary session's signature
                created_at: Timestamp::now(),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn fail_secondary_is_terminal() {
        let (_dir, store) = temp_store();
        let session_id = verified_session(&store, 0);
        let stake = store
            .create_secondary(NewSecondaryStake {
                session_id,
                wallet: wallet(0),
                amount: Lamports::new(5),
                signature: signature(9),
                created_at: Timestamp::now(),
            })
            .unwrap();

        assert!(store.try_fail_secondary(stake.id).unwrap());
        assert!(!store.try_confirm_secondary(stake.id, Timestamp::now()).unwrap());
        let parent = store.session(session_id).unwrap().unwrap();
        assert_eq!(parent.total_stake, Lamports::new(2_500_000_000));
    }

    // ── Content and config ──────────────────────────────────────────────

    #[test]
    fn content_round_trip() {
        let (_dir, store) = temp_store();
        let questions = seed_content(&store, 3);
        assert_eq!(store.categories().unwrap().len(), 3);

        let in_cat = store
            .questions_in_category(questions[0].category_id)
            .unwrap();
        assert_eq!(in_cat.len(), 1);
        assert_eq!(in_cat[0], questions[0]);

        let loaded = store.question(questions[1].id).unwrap().unwrap();
        assert_eq!(loaded, questions[1]);
    }

    #[test]
    fn put_question_requires_existing_category() {
        let (_dir, store) = temp_store();
        let orphan = QuizQuestion {
            id: QuestionId::random(),
            category_id: CategoryId::random(),
            text: "?".into(),
            answers: vec![
                QuizAnswer {
                    id: AnswerId::random(),
                    text: "a".into(),
                    correct: true,
                },
                QuizAnswer {
                    id: AnswerId::random(),
                    text: "b".into(),
                    correct: false,
                },
            ],
        };
        assert!(matches!(
            store.put_question(&orphan),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn quiz_paused_defaults_false_and_round_trips() {
        let (_dir, store) = temp_store();
        assert!(!store.quiz_paused().unwrap());
        store.set_quiz_paused(true).unwrap();
        assert!(store.quiz_paused().unwrap());
        store.set_quiz_paused(false).unwrap();
        assert!(!store.quiz_paused().unwrap());
    }
}

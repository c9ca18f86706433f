//! LMDB environment setup and shared transaction helpers.

use std::ops::Bound;
use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};

use stakequiz_store::{SecondaryStake, StakeSession};
use stakequiz_types::{SessionId, StakeId, TxSignature};

use crate::keys::increment_prefix;
use crate::LmdbError;

/// Number of named databases in the environment.
const MAX_DBS: u32 = 12;

/// All LMDB databases of the service, plus the environment handle.
///
/// Cheap to clone; heed's `Env` is internally reference-counted and
/// `Database` handles are plain identifiers.
#[derive(Clone)]
pub struct LmdbStakeStore {
    pub(crate) env: Env,

    /// wallet bytes → `User`
    pub(crate) users_db: Database<Bytes, Bytes>,
    /// session id → `StakeSession`
    pub(crate) sessions_db: Database<Bytes, Bytes>,
    /// wallet bytes → session id (one session per user)
    pub(crate) session_by_user_db: Database<Bytes, Bytes>,
    /// signature bytes → session id (signature uniqueness)
    pub(crate) session_by_signature_db: Database<Bytes, Bytes>,

    /// stake id → `SecondaryStake`
    pub(crate) secondaries_db: Database<Bytes, Bytes>,
    /// signature bytes → stake id
    pub(crate) secondary_by_signature_db: Database<Bytes, Bytes>,
    /// session id ++ stake id → () (children listing)
    pub(crate) secondary_by_session_db: Database<Bytes, Bytes>,

    /// category id → `QuizCategory`
    pub(crate) categories_db: Database<Bytes, Bytes>,
    /// question id → `QuizQuestion`
    pub(crate) questions_db: Database<Bytes, Bytes>,
    /// category id ++ question id → () (per-category listing)
    pub(crate) question_by_category_db: Database<Bytes, Bytes>,

    /// session id ++ question id → `QuestionAssignment`
    pub(crate) assignments_db: Database<Bytes, Bytes>,

    /// config key bytes → value bytes
    pub(crate) config_db: Database<Bytes, Bytes>,
}

impl LmdbStakeStore {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let users_db = env.create_database(&mut wtxn, Some("users"))?;
        let sessions_db = env.create_database(&mut wtxn, Some("sessions"))?;
        let session_by_user_db = env.create_database(&mut wtxn, Some("session_by_user"))?;
        let session_by_signature_db =
            env.create_database(&mut wtxn, Some("session_by_signature"))?;
        let secondaries_db = env.create_database(&mut wtxn, Some("secondaries"))?;
        let secondary_by_signature_db =
            env.create_database(&mut wtxn, Some("secondary_by_signature"))?;
        let secondary_by_session_db =
            env.create_database(&mut wtxn, Some("secondary_by_session"))?;
        let categories_db = env.create_database(&mut wtxn, Some("categories"))?;
        let questions_db = env.create_database(&mut wtxn, Some("questions"))?;
        let question_by_category_db =
            env.create_database(&mut wtxn, Some("question_by_category"))?;
        let assignments_db = env.create_database(&mut wtxn, Some("assignments"))?;
        let config_db = env.create_database(&mut wtxn, Some("config"))?;
        wtxn.commit()?;

        Ok(Self {
            env,
            users_db,
            sessions_db,
            session_by_user_db,
            session_by_signature_db,
            secondaries_db,
            secondary_by_signature_db,
            secondary_by_session_db,
            categories_db,
            questions_db,
            question_by_category_db,
            assignments_db,
            config_db,
        })
    }

    // ── Shared transaction-scoped helpers ───────────────────────────────

    pub(crate) fn session_txn(
        &self,
        txn: &RoTxn,
        id: SessionId,
    ) -> Result<Option<StakeSession>, LmdbError> {
        match self.sessions_db.get(txn, id.as_bytes().as_slice())? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn put_session_txn(
        &self,
        txn: &mut RwTxn,
        session: &StakeSession,
    ) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(session)?;
        self.sessions_db
            .put(txn, session.id.as_bytes().as_slice(), &bytes)?;
        Ok(())
    }

    pub(crate) fn secondary_txn(
        &self,
        txn: &RoTxn,
        id: StakeId,
    ) -> Result<Option<SecondaryStake>, LmdbError> {
        match self.secondaries_db.get(txn, id.as_bytes().as_slice())? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn put_secondary_txn(
        &self,
        txn: &mut RwTxn,
        stake: &SecondaryStake,
    ) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(stake)?;
        self.secondaries_db
            .put(txn, stake.id.as_bytes().as_slice(), &bytes)?;
        Ok(())
    }

    /// Whether a transaction signature is already referenced by any primary
    /// session or secondary stake.
    pub(crate) fn signature_in_use(
        &self,
        txn: &RoTxn,
        signature: &TxSignature,
    ) -> Result<bool, LmdbError> {
        let key = signature.as_str().as_bytes();
        Ok(self.session_by_signature_db.get(txn, key)?.is_some()
            || self.secondary_by_signature_db.get(txn, key)?.is_some())
    }

    /// Prefix range-scan: collect `(key, value)` pairs whose key starts with
    /// `prefix`.
    pub(crate) fn scan_prefix(
        &self,
        db: &Database<Bytes, Bytes>,
        txn: &RoTxn,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, LmdbError> {
        let mut upper = prefix.to_vec();
        increment_prefix(&mut upper);
        let upper_bound = if upper.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(upper.as_slice())
        };
        let bounds = (Bound::Included(prefix), upper_bound);

        let mut results = Vec::new();
        for entry in db.range(txn, &bounds)? {
            let (key, val) = entry?;
            results.push((key.to_vec(), val.to_vec()));
        }
        Ok(results)
    }

    /// Delete every entry whose key starts with `prefix`.
    pub(crate) fn delete_prefix(
        &self,
        db: &Database<Bytes, Bytes>,
        txn: &mut RwTxn,
        prefix: &[u8],
    ) -> Result<(), LmdbError> {
        let keys: Vec<Vec<u8>> = self
            .scan_prefix(db, txn, prefix)?
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        for key in keys {
            db.delete(txn, &key)?;
        }
        Ok(())
    }
}

//! LMDB implementation of `SecondaryStakeStore`.

use stakequiz_store::{NewSecondaryStake, SecondaryStake, SecondaryStakeStore, StoreError};
use stakequiz_types::{SessionId, StakeId, Timestamp, VerificationState};

use crate::keys::composite_key;
use crate::{LmdbError, LmdbStakeStore};

impl SecondaryStakeStore for LmdbStakeStore {
    fn create_secondary(&self, new: NewSecondaryStake) -> Result<SecondaryStake, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let parent = self
            .session_txn(&wtxn, new.session_id)
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(format!("session {}", new.session_id)))?;
        if parent.state != VerificationState::Success {
            return Err(StoreError::Conflict(format!(
                "session {} is {}, secondary stakes require a verified primary",
                parent.id, parent.state
            )));
        }

        if self
            .signature_in_use(&wtxn, &new.signature)
            .map_err(LmdbError::from)?
        {
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

        self.put_secondary_txn(&mut wtxn, &stake)
            .map_err(LmdbError::from)?;
        self.secondary_by_signature_db
            .put(
                &mut wtxn,
                stake.signature.as_str().as_bytes(),
                stake.id.as_bytes(),
            )
            .map_err(LmdbError::from)?;
        let link = composite_key(stake.session_id.as_bytes(), stake.id.as_bytes());
        self.secondary_by_session_db
            .put(&mut wtxn, link.as_slice(), &[])
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(stake)
    }

    fn secondary(&self, id: StakeId) -> Result<Option<SecondaryStake>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.secondary_txn(&rtxn, id).map_err(LmdbError::from)?)
    }

    fn secondaries_for_session(
        &self,
        session: SessionId,
    ) -> Result<Vec<SecondaryStake>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let links = self
            .scan_prefix(&self.secondary_by_session_db, &rtxn, session.as_bytes())
            .map_err(LmdbError::from)?;

        let mut stakes = Vec::with_capacity(links.len());
        for (key, _) in links {
            let id_arr: [u8; 16] = key[16..]
                .try_into()
                .map_err(|_| StoreError::Corruption("malformed secondary link key".into()))?;
            let stake = self
                .secondary_txn(&rtxn, StakeId::from_bytes(id_arr))
                .map_err(LmdbError::from)?
                .ok_or_else(|| {
                    StoreError::Corruption(format!(
                        "secondary link points at missing stake for session {session}"
                    ))
                })?;
            stakes.push(stake);
        }
        Ok(stakes)
    }

    fn try_confirm_secondary(
        &self,
        id: StakeId,
        confirmed_at: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let mut stake = self
            .secondary_txn(&wtxn, id)
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(format!("secondary stake {id}")))?;

        if stake.state != VerificationState::Processing {
            return Ok(false);
        }

        let mut parent = self
            .session_txn(&wtxn, stake.session_id)
            .map_err(LmdbError::from)?
            .ok_or_else(|| {
                StoreError::Corruption(format!(
                    "secondary stake {id} references missing session {}",
                    stake.session_id
                ))
            })?;

        stake.state = VerificationState::Success;
        stake.confirmed_at = Some(confirmed_at);
        parent.total_stake = parent.total_stake.saturating_add(stake.amount);

        self.put_secondary_txn(&mut wtxn, &stake)
            .map_err(LmdbError::from)?;
        self.put_session_txn(&mut wtxn, &parent)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }

    fn try_fail_secondary(&self, id: StakeId) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let mut stake = self
            .secondary_txn(&wtxn, id)
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(format!("secondary stake {id}")))?;

        if stake.state != VerificationState::Processing {
            return Ok(false);
        }

        stake.state = VerificationState::Failed;
        self.put_secondary_txn(&mut wtxn, &stake)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }
}

//! The verification orchestrator.

use std::sync::Arc;

use tracing::{error, info, warn};

use stakequiz_ledger::{ExpectedStake, LedgerClient, LedgerError, StakeVerifier, VerifiedStake};
use stakequiz_queue::VerificationJob;
use stakequiz_quiz::AssignmentEngine;
use stakequiz_store::{SecondaryStakeStore, SessionStore, StakeStore, StoreError};
use stakequiz_types::{
    AssignmentSource, SessionId, StakeId, StakeParams, Timestamp, TxSignature, VerificationState,
    WalletAddress,
};

use crate::JobOutcome;

/// Handles one verification job delivery end to end.
///
/// Two phases: the chain lookup and instruction matching happen first with
/// no transaction held (unbounded network latency must not serialize other
/// users), then the outcome commits through a single conditional write.
pub struct VerificationPipeline<S, L> {
    store: Arc<S>,
    ledger: Arc<L>,
    verifier: StakeVerifier,
    engine: AssignmentEngine,
}

impl<S, L> VerificationPipeline<S, L>
where
    S: StakeStore,
    L: LedgerClient,
{
    pub fn new(store: Arc<S>, ledger: Arc<L>, params: StakeParams) -> Self {
        let engine = AssignmentEngine::new(params.questions_per_session);
        Self {
            store,
            ledger,
            verifier: StakeVerifier::new(params),
            engine,
        }
    }

    /// Dispatch a job payload to the right handler.
    pub async fn process(&self, job: &VerificationJob) -> JobOutcome {
        if let Err(e) = job.validate() {
            warn!(error = %e, "rejecting malformed job payload");
            return JobOutcome::Fatal(e.to_string());
        }
        match job {
            VerificationJob::Primary { session_id, .. } => {
                self.process_primary(*session_id, job).await
            }
            VerificationJob::Secondary { stake_id, .. } => {
                self.process_secondary(*stake_id, job).await
            }
        }
    }

    async fn process_primary(&self, session_id: SessionId, job: &VerificationJob) -> JobOutcome {
        let signature = job.signature();
        let wallet = job.wallet_address();

        let session = match self.store.session(session_id) {
            Ok(Some(session)) => session,
            Ok(None) => {
                warn!(%session_id, %signature, "job references unknown session");
                return JobOutcome::Fatal(format!("unknown session {session_id}"));
            }
            Err(e) => return self.store_failure(e, session_id, signature, wallet),
        };

        // Idempotent short-circuits before any network work.
        match session.state {
            VerificationState::Success => return JobOutcome::AlreadyProcessed,
            VerificationState::Failed => return JobOutcome::AlreadyFailed,
            VerificationState::Processing => {}
        }

        let verified = match self.verify_on_chain(signature, wallet, job).await {
            Ok(verified) => verified,
            Err(outcome) => {
                if let JobOutcome::Fatal(ref reason) = outcome {
                    info!(%session_id, %signature, %wallet, reason, "marking session failed");
                    match self.store.try_fail_session(session_id) {
                        Ok(_) => {}
                        Err(e) => return self.store_failure(e, session_id, signature, wallet),
                    }
                }
                return outcome;
            }
        };

        // Selection runs outside the write transaction; a losing racer just
        // discards its batch.
        let assignments = match self.engine.assign(
            self.store.as_ref(),
            session_id,
            &mut rand::rng(),
        ) {
            Ok(assignments) => assignments,
            Err(e) => {
                // Content shortfall: nothing is committed and the session
                // stays in processing so a corrected retry can succeed.
                error!(%session_id, error = %e, "question assignment failed");
                return JobOutcome::Fatal(e.to_string());
            }
        };

        let confirmed_at = verified.block_time.unwrap_or_else(Timestamp::now);
        match self.store.try_complete_session(
            session_id,
            confirmed_at,
            AssignmentSource::Job,
            &assignments,
        ) {
            Ok(true) => {
                info!(
                    %session_id,
                    %signature,
                    stake_account = %verified.stake_account,
                    questions = assignments.len(),
                    "session verified and quiz unlocked"
                );
                JobOutcome::Completed
            }
            Ok(false) => JobOutcome::AlreadyProcessed,
            Err(e) => self.store_failure(e, session_id, signature, wallet),
        }
    }

    async fn process_secondary(&self, stake_id: StakeId, job: &VerificationJob) -> JobOutcome {
        let signature = job.signature();
        let wallet = job.wallet_address();

        let stake = match self.store.secondary(stake_id) {
            Ok(Some(stake)) => stake,
            Ok(None) => {
                warn!(%stake_id, %signature, "job references unknown secondary stake");
                return JobOutcome::Fatal(format!("unknown secondary stake {stake_id}"));
            }
            Err(e) => {
                error!(%stake_id, %signature, %wallet, error = %e, "store error");
                return JobOutcome::Retryable(e.to_string());
            }
        };

        match stake.state {
            VerificationState::Success => return JobOutcome::AlreadyProcessed,
            VerificationState::Failed => return JobOutcome::AlreadyFailed,
            VerificationState::Processing => {}
        }

        let verified = match self.verify_on_chain(signature, wallet, job).await {
            Ok(verified) => verified,
            Err(outcome) => {
                if let JobOutcome::Fatal(ref reason) = outcome {
                    info!(%stake_id, %signature, reason, "marking secondary stake failed");
                    if let Err(e) = self.store.try_fail_secondary(stake_id) {
                        error!(%stake_id, error = %e, "store error");
                        return JobOutcome::Retryable(e.to_string());
                    }
                }
                return outcome;
            }
        };

        let confirmed_at = verified.block_time.unwrap_or_else(Timestamp::now);
        match self.store.try_confirm_secondary(stake_id, confirmed_at) {
            Ok(true) => {
                info!(
                    %stake_id,
                    session_id = %stake.session_id,
                    %signature,
                    "secondary stake confirmed"
                );
                JobOutcome::Completed
            }
            Ok(false) => JobOutcome::AlreadyProcessed,
            Err(e) => {
                error!(%stake_id, %signature, error = %e, "store error");
                JobOutcome::Retryable(e.to_string())
            }
        }
    }

    /// Phase one: fetch and match the transaction, no locks held.
    ///
    /// Errors come back as the `JobOutcome` the caller should return;
    /// fatal outcomes mean verification can never succeed for this input.
    async fn verify_on_chain(
        &self,
        signature: &TxSignature,
        wallet: &WalletAddress,
        job: &VerificationJob,
    ) -> Result<VerifiedStake, JobOutcome> {
        let amount = match job.amount_lamports() {
            Ok(amount) => amount,
            Err(e) => return Err(JobOutcome::Fatal(e.to_string())),
        };
        let expected = ExpectedStake {
            owner: wallet.clone(),
            amount,
            duration_secs: job.duration_secs(),
        };

        let tx = match self.ledger.fetch_transaction(signature).await {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                // Finality lags submission; the queue should try again.
                info!(%signature, "transaction not on chain yet");
                return Err(JobOutcome::Retryable(format!(
                    "transaction {signature} not found"
                )));
            }
            Err(e) => {
                warn!(%signature, %wallet, error = %e, "ledger lookup failed");
                return Err(classify_ledger_error(e));
            }
        };

        self.verifier.verify(&tx, &expected).map_err(|failure| {
            warn!(%signature, %wallet, %failure, "stake verification failed");
            JobOutcome::Fatal(failure.to_string())
        })
    }

    fn store_failure(
        &self,
        e: StoreError,
        session_id: SessionId,
        signature: &TxSignature,
        wallet: &WalletAddress,
    ) -> JobOutcome {
        error!(%session_id, %signature, %wallet, error = %e, "store error");
        JobOutcome::Retryable(e.to_string())
    }
}

fn classify_ledger_error(e: LedgerError) -> JobOutcome {
    if e.is_retryable() {
        JobOutcome::Retryable(e.to_string())
    } else {
        JobOutcome::Fatal(e.to_string())
    }
}

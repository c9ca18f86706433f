//! HTTP request handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use stakequiz_ledger::LedgerClient;
use stakequiz_pipeline::JobOutcome;
use stakequiz_queue::{JobPublisher, VerificationJob};
use stakequiz_quiz::score_answers;
use stakequiz_store::{
    ConfigStore, NewSecondaryStake, NewSession, QuizContentStore, SecondaryStakeStore,
    SessionStore, StakeStore,
};
use stakequiz_types::{
    AnswerId, Lamports, QuestionId, SessionId, Timestamp, TxSignature, VerificationState,
    WalletAddress,
};

use crate::error::RpcError;
use crate::server::AppState;

/// Non-standard status the queue interprets as "do not retry, dead-letter".
fn stop_retry_status() -> StatusCode {
    StatusCode::from_u16(489).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

// ── Stake submission ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateStakeRequest {
    pub wallet_address: String,
    pub signature: String,
    /// Decimal SOL, as the client submitted it.
    pub amount: f64,
    pub duration_days: u64,
}

#[derive(Serialize)]
pub struct CreateStakeResponse {
    pub session_id: SessionId,
    pub status: VerificationState,
}

struct ValidatedStake {
    wallet: WalletAddress,
    signature: TxSignature,
    amount: Lamports,
}

fn validate_stake_request(req: &CreateStakeRequest) -> Result<ValidatedStake, RpcError> {
    let wallet = WalletAddress::parse(req.wallet_address.clone())
        .map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
    let signature = TxSignature::parse(req.signature.clone())
        .map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
    let amount =
        Lamports::from_sol(req.amount).map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
    if amount.is_zero() {
        return Err(RpcError::InvalidRequest("amount must be positive".into()));
    }
    if req.duration_days == 0 {
        return Err(RpcError::InvalidRequest("duration must be positive".into()));
    }
    Ok(ValidatedStake {
        wallet,
        signature,
        amount,
    })
}

pub async fn create_stake<S, L, Q>(
    State(state): State<AppState<S, L, Q>>,
    Json(req): Json<CreateStakeRequest>,
) -> Result<Response, RpcError>
where
    S: StakeStore + Send + Sync + 'static,
    L: LedgerClient + 'static,
    Q: JobPublisher + 'static,
{
    let valid = validate_stake_request(&req)?;
    let now = Timestamp::now();

    state.store.create_user_if_absent(&valid.wallet, now)?;
    let session = state.store.create_session(NewSession {
        wallet: valid.wallet.clone(),
        amount: valid.amount,
        duration_secs: req.duration_days.saturating_mul(86_400),
        signature: valid.signature.clone(),
        created_at: now,
    })?;

    let job = VerificationJob::Primary {
        signature: valid.signature,
        wallet_address: valid.wallet,
        amount: req.amount,
        duration: req.duration_days,
        session_id: session.id,
    };
    state.queue.publish(&job, state.retry_policy).await?;

    let body = Json(CreateStakeResponse {
        session_id: session.id,
        status: session.state,
    });
    Ok((StatusCode::CREATED, body).into_response())
}

#[derive(Serialize)]
pub struct CreateSecondaryResponse {
    pub stake_id: stakequiz_types::StakeId,
    pub status: VerificationState,
}

pub async fn create_secondary_stake<S, L, Q>(
    State(state): State<AppState<S, L, Q>>,
    Path(session_id): Path<SessionId>,
    Json(req): Json<CreateStakeRequest>,
) -> Result<Response, RpcError>
where
    S: StakeStore + Send + Sync + 'static,
    L: LedgerClient + 'static,
    Q: JobPublisher + 'static,
{
    let valid = validate_stake_request(&req)?;
    let now = Timestamp::now();

    let stake = state.store.create_secondary(NewSecondaryStake {
        session_id,
        wallet: valid.wallet.clone(),
        amount: valid.amount,
        signature: valid.signature.clone(),
        created_at: now,
    })?;

    let job = VerificationJob::Secondary {
        signature: valid.signature,
        wallet_address: valid.wallet,
        amount: req.amount,
        duration: req.duration_days,
        stake_id: stake.id,
    };
    state.queue.publish(&job, state.retry_policy).await?;

    let body = Json(CreateSecondaryResponse {
        stake_id: stake.id,
        status: stake.state,
    });
    Ok((StatusCode::CREATED, body).into_response())
}

// ── Status polling ───────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    /// `null` until the wallet has a session.
    pub status: Option<VerificationState>,
}

pub async fn wallet_status<S, L, Q>(
    State(state): State<AppState<S, L, Q>>,
    Path(wallet): Path<String>,
) -> Result<Json<StatusResponse>, RpcError>
where
    S: StakeStore + Send + Sync + 'static,
    L: LedgerClient + 'static,
    Q: JobPublisher + 'static,
{
    let wallet =
        WalletAddress::parse(wallet).map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
    let session = state.store.session_by_user(&wallet)?;
    Ok(Json(StatusResponse {
        status: session.map(|s| s.state),
    }))
}

// ── Quiz ─────────────────────────────────────────────────────────────────

/// Answer option as shown to the user. The correct flag never leaves the
/// server.
#[derive(Serialize)]
pub struct AnswerView {
    pub answer_id: AnswerId,
    pub text: String,
}

#[derive(Serialize)]
pub struct QuestionView {
    pub question_id: QuestionId,
    pub display_order: u32,
    pub text: String,
    pub answers: Vec<AnswerView>,
    pub chosen_answer: Option<AnswerId>,
}

#[derive(Serialize)]
pub struct QuestionsResponse {
    pub questions: Vec<QuestionView>,
}

pub async fn session_questions<S, L, Q>(
    State(state): State<AppState<S, L, Q>>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<QuestionsResponse>, RpcError>
where
    S: StakeStore + Send + Sync + 'static,
    L: LedgerClient + 'static,
    Q: JobPublisher + 'static,
{
    let session = state
        .store
        .session(session_id)?
        .ok_or_else(|| RpcError::NotFound(format!("session {session_id}")))?;
    if session.state != VerificationState::Success {
        return Err(RpcError::Conflict(format!(
            "session is {}, quiz not unlocked",
            session.state
        )));
    }

    let assignments = state.store.assignments_for_session(session_id)?;
    let mut questions = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let question = state
            .store
            .question(assignment.question_id)?
            .ok_or_else(|| {
                RpcError::Internal(format!(
                    "assignment references missing question {}",
                    assignment.question_id
                ))
            })?;
        questions.push(QuestionView {
            question_id: question.id,
            display_order: assignment.display_order,
            text: question.text,
            answers: question
                .answers
                .into_iter()
                .map(|a| AnswerView {
                    answer_id: a.id,
                    text: a.text,
                })
                .collect(),
            chosen_answer: assignment.chosen_answer,
        });
    }
    Ok(Json(QuestionsResponse { questions }))
}

#[derive(Deserialize)]
pub struct RecordAnswerRequest {
    pub question_id: QuestionId,
    pub answer_id: AnswerId,
}

pub async fn record_answer<S, L, Q>(
    State(state): State<AppState<S, L, Q>>,
    Path(session_id): Path<SessionId>,
    Json(req): Json<RecordAnswerRequest>,
) -> Result<StatusCode, RpcError>
where
    S: StakeStore + Send + Sync + 'static,
    L: LedgerClient + 'static,
    Q: JobPublisher + 'static,
{
    state
        .store
        .record_answer(session_id, req.question_id, req.answer_id, Timestamp::now())?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct SubmitQuizResponse {
    pub score: u32,
    pub question_count: usize,
}

pub async fn submit_quiz<S, L, Q>(
    State(state): State<AppState<S, L, Q>>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<SubmitQuizResponse>, RpcError>
where
    S: StakeStore + Send + Sync + 'static,
    L: LedgerClient + 'static,
    Q: JobPublisher + 'static,
{
    if state.store.quiz_paused()? {
        return Err(RpcError::QuizPaused);
    }

    let assignments = state.store.assignments_for_session(session_id)?;
    let score = score_answers(state.store.as_ref(), &assignments)?;
    state.store.complete_quiz(session_id, score, Timestamp::now())?;

    Ok(Json(SubmitQuizResponse {
        score,
        question_count: assignments.len(),
    }))
}

// ── Queue consumer ───────────────────────────────────────────────────────

pub async fn handle_verification_job<S, L, Q>(
    State(state): State<AppState<S, L, Q>>,
    Json(job): Json<VerificationJob>,
) -> Response
where
    S: StakeStore + Send + Sync + 'static,
    L: LedgerClient + 'static,
    Q: JobPublisher + 'static,
{
    let outcome = state.pipeline.process(&job).await;
    match outcome {
        JobOutcome::Completed => (StatusCode::OK, Json(json!({"outcome": "completed"}))),
        JobOutcome::AlreadyProcessed => {
            (StatusCode::OK, Json(json!({"outcome": "already_processed"})))
        }
        JobOutcome::AlreadyFailed => {
            (StatusCode::OK, Json(json!({"outcome": "already_failed"})))
        }
        JobOutcome::Retryable(reason) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"outcome": "retryable", "error": reason})),
        ),
        JobOutcome::Fatal(reason) => (
            stop_retry_status(),
            Json(json!({"outcome": "fatal", "error": reason})),
        ),
    }
    .into_response()
}

// ── Admin ────────────────────────────────────────────────────────────────

pub async fn admin_retry_session<S, L, Q>(
    State(state): State<AppState<S, L, Q>>,
    Path(session_id): Path<SessionId>,
) -> Result<StatusCode, RpcError>
where
    S: StakeStore + Send + Sync + 'static,
    L: LedgerClient + 'static,
    Q: JobPublisher + 'static,
{
    let session = state
        .store
        .session(session_id)?
        .ok_or_else(|| RpcError::NotFound(format!("session {session_id}")))?;
    // Terminal sessions need an explicit reset first; silently re-verifying
    // them would bypass the state machine.
    if session.state != VerificationState::Processing {
        return Err(RpcError::Conflict(format!(
            "session is {}, retry only applies to processing sessions",
            session.state
        )));
    }

    let job = VerificationJob::Primary {
        signature: session.signature,
        wallet_address: session.wallet,
        amount: session.amount.as_sol(),
        duration: session.duration_secs / 86_400,
        session_id,
    };
    state.queue.publish(&job, state.retry_policy).await?;
    tracing::info!(%session_id, "republished verification job");
    Ok(StatusCode::ACCEPTED)
}

pub async fn admin_reset_session<S, L, Q>(
    State(state): State<AppState<S, L, Q>>,
    Path(session_id): Path<SessionId>,
) -> Result<StatusCode, RpcError>
where
    S: StakeStore + Send + Sync + 'static,
    L: LedgerClient + 'static,
    Q: JobPublisher + 'static,
{
    state.store.reset_session(session_id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ShadowBanRequest {
    pub banned: bool,
}

pub async fn admin_shadow_ban<S, L, Q>(
    State(state): State<AppState<S, L, Q>>,
    Path(session_id): Path<SessionId>,
    Json(req): Json<ShadowBanRequest>,
) -> Result<StatusCode, RpcError>
where
    S: StakeStore + Send + Sync + 'static,
    L: LedgerClient + 'static,
    Q: JobPublisher + 'static,
{
    state.store.set_shadow_ban(session_id, req.banned)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct DeadLetterView {
    pub message_id: String,
    pub wallet_address: WalletAddress,
    /// Decimal SOL as carried in the job payload.
    pub amount: f64,
    pub session_id: Option<SessionId>,
    pub stake_id: Option<stakequiz_types::StakeId>,
    pub enqueued_at: Timestamp,
}

#[derive(Serialize)]
pub struct DeadLettersResponse {
    pub dead_letters: Vec<DeadLetterView>,
}

pub async fn admin_dead_letters<S, L, Q>(
    State(state): State<AppState<S, L, Q>>,
) -> Result<Json<DeadLettersResponse>, RpcError>
where
    S: StakeStore + Send + Sync + 'static,
    L: LedgerClient + 'static,
    Q: JobPublisher + 'static,
{
    let letters = state.queue.dead_letters().await?;
    let views = letters
        .into_iter()
        .map(|letter| {
            let (amount, session_id, stake_id) = match &letter.job {
                VerificationJob::Primary {
                    amount, session_id, ..
                } => (*amount, Some(*session_id), None),
                VerificationJob::Secondary {
                    amount, stake_id, ..
                } => (*amount, None, Some(*stake_id)),
            };
            DeadLetterView {
                message_id: letter.message_id,
                wallet_address: letter.job.wallet_address().clone(),
                amount,
                session_id,
                stake_id,
                enqueued_at: letter.enqueued_at,
            }
        })
        .collect();
    Ok(Json(DeadLettersResponse { dead_letters: views }))
}

#[derive(Deserialize)]
pub struct QuizPausedRequest {
    pub paused: bool,
}

pub async fn admin_set_quiz_paused<S, L, Q>(
    State(state): State<AppState<S, L, Q>>,
    Json(req): Json<QuizPausedRequest>,
) -> Result<StatusCode, RpcError>
where
    S: StakeStore + Send + Sync + 'static,
    L: LedgerClient + 'static,
    Q: JobPublisher + 'static,
{
    state.store.set_quiz_paused(req.paused)?;
    tracing::info!(paused = req.paused, "quiz pause flag updated");
    Ok(StatusCode::NO_CONTENT)
}

//! Router assembly and server startup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use stakequiz_ledger::LedgerClient;
use stakequiz_pipeline::VerificationPipeline;
use stakequiz_queue::{JobPublisher, RetryPolicy};
use stakequiz_store::StakeStore;

use crate::error::RpcError;
use crate::handlers;

/// Shared state behind every handler.
pub struct AppState<S, L, Q> {
    pub store: Arc<S>,
    pub queue: Arc<Q>,
    pub pipeline: Arc<VerificationPipeline<S, L>>,
    pub retry_policy: RetryPolicy,
}

impl<S, L, Q> Clone for AppState<S, L, Q> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            queue: self.queue.clone(),
            pipeline: self.pipeline.clone(),
            retry_policy: self.retry_policy,
        }
    }
}

/// Build the full service router.
pub fn router<S, L, Q>(state: AppState<S, L, Q>) -> Router
where
    S: StakeStore + Send + Sync + 'static,
    L: LedgerClient + 'static,
    Q: JobPublisher + 'static,
{
    Router::new()
        .route("/v1/stakes", post(handlers::create_stake::<S, L, Q>))
        .route(
            "/v1/stakes/:session_id/secondary",
            post(handlers::create_secondary_stake::<S, L, Q>),
        )
        .route("/v1/status/:wallet", get(handlers::wallet_status::<S, L, Q>))
        .route(
            "/v1/sessions/:session_id/questions",
            get(handlers::session_questions::<S, L, Q>),
        )
        .route(
            "/v1/sessions/:session_id/answers",
            post(handlers::record_answer::<S, L, Q>),
        )
        .route(
            "/v1/sessions/:session_id/submit",
            post(handlers::submit_quiz::<S, L, Q>),
        )
        .route(
            "/jobs/verify",
            post(handlers::handle_verification_job::<S, L, Q>),
        )
        .route(
            "/admin/sessions/:session_id/retry",
            post(handlers::admin_retry_session::<S, L, Q>),
        )
        .route(
            "/admin/sessions/:session_id/reset",
            post(handlers::admin_reset_session::<S, L, Q>),
        )
        .route(
            "/admin/sessions/:session_id/shadow-ban",
            post(handlers::admin_shadow_ban::<S, L, Q>),
        )
        .route(
            "/admin/dead-letters",
            get(handlers::admin_dead_letters::<S, L, Q>),
        )
        .route(
            "/admin/quiz-paused",
            put(handlers::admin_set_quiz_paused::<S, L, Q>),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds and serves the router until the process exits.
pub struct RpcServer {
    pub addr: SocketAddr,
}

impl RpcServer {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub async fn start(&self, router: Router) -> Result<(), RpcError> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| RpcError::Internal(e.to_string()))?;
        info!(addr = %self.addr, "http server listening");
        axum::serve(listener, router)
            .await
            .map_err(|e| RpcError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use stakequiz_nullables::{MemoryStore, NullLedger, NullQueue, ScriptedLookup};
    use stakequiz_queue::VerificationJob;
    use stakequiz_store::{QuizAnswer, QuizCategory, QuizContentStore, QuizQuestion, SessionStore};
    use stakequiz_types::{
        AnswerId, CategoryId, QuestionId, SessionId, StakeParams, TxSignature, VerificationState,
        WalletAddress,
    };

    const OWNER: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";
    const VOTE: &str = "5ZWgXcyqrrNpQHCme5SdC5hCeYb2o3fEJhF7Gok3bTVN";
    const CUSTODIAN: &str = "7Np41oeYqPefeNQEHSv1UDhYrehxin3NStELsSKCT4K2";
    const STAKE_ACCOUNT: &str = "FXgqEhVGX82dsyKMAgR2JCRaC9FNH4ih611bJftmD3tG";
    const BLOCK_TIME: i64 = 1_700_000_000;

    struct TestApp {
        store: Arc<MemoryStore>,
        ledger: Arc<NullLedger>,
        queue: Arc<NullQueue>,
        router: Router,
    }

    fn params() -> StakeParams {
        StakeParams {
            validator_vote_account: WalletAddress::new(VOTE),
            lockup_custodian: WalletAddress::new(CUSTODIAN),
            enforce_lockup: true,
            lockup_tolerance_secs: 12 * 3600,
            questions_per_session: 5,
        }
    }

    fn app() -> TestApp {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(NullLedger::new());
        let queue = Arc::new(NullQueue::new());
        let pipeline = Arc::new(VerificationPipeline::new(
            store.clone(),
            ledger.clone(),
            params(),
        ));
        let router = router(AppState {
            store: store.clone(),
            queue: queue.clone(),
            pipeline,
            retry_policy: RetryPolicy::default(),
        });
        TestApp {
            store,
            ledger,
            queue,
            router,
        }
    }

    fn seed_content(store: &MemoryStore) {
        for i in 0..6 {
            let category = QuizCategory {
                id: CategoryId::random(),
                name: format!("category-{i}"),
            };
            store.put_category(&category).unwrap();
            store
                .put_question(&QuizQuestion {
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
                })
                .unwrap();
        }
    }

    fn signature() -> String {
        "4".repeat(87)
    }

    fn matching_tx(signature_owner: &str) -> stakequiz_ledger::ParsedTransaction {
        let duration_secs: i64 = 90 * 86_400;
        serde_json::from_value(json!({
            "blockTime": BLOCK_TIME,
            "meta": { "err": null },
            "transaction": { "message": { "instructions": [
                {
                    "program": "system",
                    "programId": "11111111111111111111111111111111",
                    "parsed": { "type": "createAccountWithSeed", "info": {
                        "source": signature_owner,
                        "newAccount": STAKE_ACCOUNT,
                        "lamports": 2_500_000_000u64,
                        "owner": "Stake11111111111111111111111111111111111111"
                    }}
                },
                {
                    "program": "stake",
                    "programId": "Stake11111111111111111111111111111111111111",
                    "parsed": { "type": "initialize", "info": {
                        "stakeAccount": STAKE_ACCOUNT,
                        "authorized": { "staker": signature_owner, "withdrawer": signature_owner },
                        "lockup": {
                            "custodian": CUSTODIAN,
                            "epoch": 0,
                            "unixTimestamp": BLOCK_TIME + duration_secs
                        }
                    }}
                },
                {
                    "program": "stake",
                    "programId": "Stake11111111111111111111111111111111111111",
                    "parsed": { "type": "delegate", "info": {
                        "stakeAccount": STAKE_ACCOUNT,
                        "voteAccount": VOTE
                    }}
                }
            ]}}
        }))
        .unwrap()
    }

    async fn request(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        let request = match body {
            Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn stake_body() -> Value {
        json!({
            "wallet_address": OWNER,
            "signature": signature(),
            "amount": 2.5,
            "duration_days": 90,
        })
    }

    #[tokio::test]
    async fn create_stake_publishes_job() {
        let app = app();
        let (status, body) = request(&app.router, "POST", "/v1/stakes", Some(stake_body())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "processing");

        let published = app.queue.published();
        assert_eq!(published.len(), 1);
        assert!(matches!(published[0], VerificationJob::Primary { .. }));
    }

    #[tokio::test]
    async fn duplicate_signature_gets_distinct_conflict() {
        let app = app();
        let (status, _) = request(&app.router, "POST", "/v1/stakes", Some(stake_body())).await;
        assert_eq!(status, StatusCode::CREATED);

        let mut second = stake_body();
        second["wallet_address"] = json!(VOTE); // different wallet, same signature
        let (status, body) = request(&app.router, "POST", "/v1/stakes", Some(second)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "signature_already_used");
    }

    #[tokio::test]
    async fn invalid_wallet_is_rejected() {
        let app = app();
        let mut body = stake_body();
        body["wallet_address"] = json!("not base58!");
        let (status, body) = request(&app.router, "POST", "/v1/stakes", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");
    }

    #[tokio::test]
    async fn status_is_null_without_session() {
        let app = app();
        let (status, body) =
            request(&app.router, "GET", &format!("/v1/status/{OWNER}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], Value::Null);
    }

    async fn verified_session(app: &TestApp) -> SessionId {
        seed_content(&app.store);
        let (_, created) =
            request(&app.router, "POST", "/v1/stakes", Some(stake_body())).await;
        let session_id = SessionId::parse(created["session_id"].as_str().unwrap()).unwrap();

        app.ledger.script(
            &TxSignature::new(signature()),
            ScriptedLookup::Found(matching_tx(OWNER)),
        );
        let (status, _) = request(
            &app.router,
            "POST",
            "/jobs/verify",
            Some(serde_json::to_value(&app.queue.published()[0]).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        session_id
    }

    #[tokio::test]
    async fn consumer_endpoint_drives_verification() {
        let app = app();
        let session_id = verified_session(&app).await;

        let session = app.store.session(session_id).unwrap().unwrap();
        assert_eq!(session.state, VerificationState::Success);

        let (status, body) =
            request(&app.router, "GET", &format!("/v1/status/{OWNER}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
    }

    #[tokio::test]
    async fn consumer_maps_retryable_to_500() {
        let app = app();
        seed_content(&app.store);
        let (_, _) = request(&app.router, "POST", "/v1/stakes", Some(stake_body())).await;
        // Nothing scripted: the ledger reports the signature as unknown.
        let (status, body) = request(
            &app.router,
            "POST",
            "/jobs/verify",
            Some(serde_json::to_value(&app.queue.published()[0]).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["outcome"], "retryable");
    }

    #[tokio::test]
    async fn consumer_maps_fatal_to_489() {
        let app = app();
        seed_content(&app.store);
        let (_, _) = request(&app.router, "POST", "/v1/stakes", Some(stake_body())).await;
        let mut tx = matching_tx(OWNER);
        tx.meta.err = Some(json!("AccountInUse"));
        app.ledger
            .script(&TxSignature::new(signature()), ScriptedLookup::Found(tx));

        let (status, body) = request(
            &app.router,
            "POST",
            "/jobs/verify",
            Some(serde_json::to_value(&app.queue.published()[0]).unwrap()),
        )
        .await;
        assert_eq!(status.as_u16(), 489);
        assert_eq!(body["outcome"], "fatal");
    }

    #[tokio::test]
    async fn questions_are_sanitized_and_ordered() {
        let app = app();
        let session_id = verified_session(&app).await;

        let (status, body) = request(
            &app.router,
            "GET",
            &format!("/v1/sessions/{session_id}/questions"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let questions = body["questions"].as_array().unwrap();
        assert_eq!(questions.len(), 5);
        let orders: Vec<u64> = questions
            .iter()
            .map(|q| q["display_order"].as_u64().unwrap())
            .collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5]);
        // The correct flag must not appear anywhere in the payload.
        assert!(!body.to_string().contains("correct"));
    }

    #[tokio::test]
    async fn questions_locked_until_verified() {
        let app = app();
        let (_, created) =
            request(&app.router, "POST", "/v1/stakes", Some(stake_body())).await;
        let session_id = created["session_id"].as_str().unwrap().to_string();

        let (status, body) = request(
            &app.router,
            "GET",
            &format!("/v1/sessions/{session_id}/questions"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "conflict");
    }

    #[tokio::test]
    async fn answer_and_submit_flow() {
        let app = app();
        let session_id = verified_session(&app).await;

        let (_, questions) = request(
            &app.router,
            "GET",
            &format!("/v1/sessions/{session_id}/questions"),
            None,
        )
        .await;
        let first = &questions["questions"][0];
        let answer_body = json!({
            "question_id": first["question_id"],
            "answer_id": first["answers"][0]["answer_id"],
        });
        let (status, _) = request(
            &app.router,
            "POST",
            &format!("/v1/sessions/{session_id}/answers"),
            Some(answer_body),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = request(
            &app.router,
            "POST",
            &format!("/v1/sessions/{session_id}/submit"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["question_count"], 5);
        assert!(body["score"].as_u64().unwrap() <= 5);

        // Second submission is refused.
        let (status, body) = request(
            &app.router,
            "POST",
            &format!("/v1/sessions/{session_id}/submit"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "conflict");
    }

    #[tokio::test]
    async fn paused_quiz_refuses_submission() {
        let app = app();
        let session_id = verified_session(&app).await;

        let (status, _) = request(
            &app.router,
            "PUT",
            "/admin/quiz-paused",
            Some(json!({"paused": true})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = request(
            &app.router,
            "POST",
            &format!("/v1/sessions/{session_id}/submit"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "quiz_paused");
    }

    #[tokio::test]
    async fn secondary_stake_requires_verified_parent() {
        let app = app();
        let (_, created) =
            request(&app.router, "POST", "/v1/stakes", Some(stake_body())).await;
        let session_id = created["session_id"].as_str().unwrap().to_string();

        let mut body = stake_body();
        body["signature"] = json!("5".repeat(87));
        let (status, _) = request(
            &app.router,
            "POST",
            &format!("/v1/stakes/{session_id}/secondary"),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn secondary_stake_flow_publishes_job() {
        let app = app();
        let session_id = verified_session(&app).await;

        let mut body = stake_body();
        body["signature"] = json!("5".repeat(87));
        let (status, created) = request(
            &app.router,
            "POST",
            &format!("/v1/stakes/{session_id}/secondary"),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "processing");
        assert!(matches!(
            app.queue.published().last().unwrap(),
            VerificationJob::Secondary { .. }
        ));
    }

    #[tokio::test]
    async fn admin_retry_refuses_terminal_sessions() {
        let app = app();
        let session_id = verified_session(&app).await;

        let (status, _) = request(
            &app.router,
            "POST",
            &format!("/admin/sessions/{session_id}/retry"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn admin_retry_republishes_for_processing_session() {
        let app = app();
        let (_, created) =
            request(&app.router, "POST", "/v1/stakes", Some(stake_body())).await;
        let session_id = created["session_id"].as_str().unwrap().to_string();
        let before = app.queue.published().len();

        let (status, _) = request(
            &app.router,
            "POST",
            &format!("/admin/sessions/{session_id}/retry"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(app.queue.published().len(), before + 1);
    }

    #[tokio::test]
    async fn admin_reset_returns_session_to_processing() {
        let app = app();
        let session_id = verified_session(&app).await;

        let (status, _) = request(
            &app.router,
            "POST",
            &format!("/admin/sessions/{session_id}/reset"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let session = app.store.session(session_id).unwrap().unwrap();
        assert_eq!(session.state, VerificationState::Processing);
    }

    #[tokio::test]
    async fn dead_letters_are_listed() {
        let app = app();
        app.queue.add_dead_letter(stakequiz_queue::DeadLetter {
            message_id: "m1".into(),
            job: VerificationJob::Primary {
                signature: TxSignature::new(signature()),
                wallet_address: WalletAddress::new(OWNER),
                amount: 2.5,
                duration: 90,
                session_id: SessionId::random(),
            },
            enqueued_at: stakequiz_types::Timestamp::new(1_700_000_000),
        });

        let (status, body) = request(&app.router, "GET", "/admin/dead-letters", None).await;
        assert_eq!(status, StatusCode::OK);
        let letters = body["dead_letters"].as_array().unwrap();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0]["wallet_address"], OWNER);
        assert_eq!(letters[0]["amount"], 2.5);
    }
}

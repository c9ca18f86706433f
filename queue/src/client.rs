//! Publish side of the queue contract.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use stakequiz_types::Timestamp;
use stakequiz_utils::{retry_with_backoff, RetryConfig};

use crate::{QueueError, VerificationJob};

/// Retry behavior the queue applies to a published job.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Delivery attempts after the first, before dead-lettering.
    pub retries: u32,
    /// Delay before the first delivery.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            initial_delay: Duration::from_secs(10),
        }
    }
}

/// A job that exhausted its retries, as shown to operators.
#[derive(Clone, Debug, PartialEq)]
pub struct DeadLetter {
    pub message_id: String,
    pub job: VerificationJob,
    pub enqueued_at: Timestamp,
}

/// Enqueue access to the job queue.
pub trait JobPublisher: Send + Sync {
    /// Publish a verification job for later push delivery.
    fn publish(
        &self,
        job: &VerificationJob,
        policy: RetryPolicy,
    ) -> impl Future<Output = Result<(), QueueError>> + Send;

    /// Jobs that exhausted all retries, for operator inspection.
    fn dead_letters(&self) -> impl Future<Output = Result<Vec<DeadLetter>, QueueError>> + Send;
}

/// [`JobPublisher`] against a QStash-compatible HTTP queue.
///
/// Publishing POSTs the job body to `{base}/v2/publish/{consumer}` with the
/// retry policy in headers; the queue later POSTs the same body to the
/// consumer URL and honors its HTTP status for the retry decision.
#[derive(Clone, Debug)]
pub struct HttpQueueClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    consumer_url: String,
}

#[derive(Deserialize)]
struct DlqPage {
    #[serde(default)]
    messages: Vec<DlqMessage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DlqMessage {
    message_id: String,
    body: String,
    #[serde(default)]
    created_at: u64,
}

impl HttpQueueClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        consumer_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, QueueError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
            consumer_url: consumer_url.into(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, QueueError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(QueueError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

impl JobPublisher for HttpQueueClient {
    async fn publish(
        &self,
        job: &VerificationJob,
        policy: RetryPolicy,
    ) -> Result<(), QueueError> {
        let url = format!("{}/v2/publish/{}", self.base_url, self.consumer_url);
        // Transport hiccups and queue-side 5xx are worth a couple more
        // tries before the caller gives up; 4xx rejections are not.
        let response = retry_with_backoff(
            RetryConfig::new(3, Duration::from_millis(250)),
            || async {
                let response = self
                    .http
                    .post(&url)
                    .bearer_auth(&self.token)
                    .header("Upstash-Retries", policy.retries.to_string())
                    .header(
                        "Upstash-Delay",
                        format!("{}s", policy.initial_delay.as_secs()),
                    )
                    .json(job)
                    .send()
                    .await?;
                if response.status().is_server_error() {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    return Err(QueueError::Rejected { status, body });
                }
                Ok(response)
            },
        )
        .await?;
        Self::check(response).await?;

        debug!(signature = %job.signature(), "published verification job");
        Ok(())
    }

    async fn dead_letters(&self) -> Result<Vec<DeadLetter>, QueueError> {
        let url = format!("{}/v2/dlq", self.base_url);
        let response = self.http.get(&url).bearer_auth(&self.token).send().await?;
        let page: DlqPage = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| QueueError::Malformed(e.to_string()))?;

        let mut letters = Vec::with_capacity(page.messages.len());
        for message in page.messages {
            // A body this service never produced is logged and skipped, not
            // allowed to break the whole listing.
            match serde_json::from_str::<VerificationJob>(&message.body) {
                Ok(job) => letters.push(DeadLetter {
                    message_id: message.message_id,
                    job,
                    enqueued_at: Timestamp::new(message.created_at / 1000),
                }),
                Err(e) => {
                    warn!(
                        message_id = %message.message_id,
                        error = %e,
                        "skipping unparseable dead-letter body"
                    );
                }
            }
        }
        Ok(letters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dlq_page_parses_and_tolerates_missing_fields() {
        let page: DlqPage = serde_json::from_str(
            r#"{
                "messages": [
                    {"messageId": "m1", "body": "{}", "createdAt": 1700000000000}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.messages[0].created_at, 1_700_000_000_000);

        let empty: DlqPage = serde_json::from_str("{}").unwrap();
        assert!(empty.messages.is_empty());
    }

    #[test]
    fn default_policy_is_bounded() {
        let policy = RetryPolicy::default();
        assert!(policy.retries > 0);
        assert!(policy.initial_delay > Duration::ZERO);
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("queue rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid job payload: {0}")]
    InvalidJob(String),

    #[error("malformed queue response: {0}")]
    Malformed(String),
}

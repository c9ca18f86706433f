/// What one job delivery amounted to.
///
/// The pipeline never returns an `Err` across the queue boundary for
/// expected business outcomes; everything the queue needs to know is in
/// this value, which the HTTP layer maps to a status code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// This delivery performed the transition.
    Completed,

    /// A previous or concurrent delivery already succeeded. Idempotent ack.
    AlreadyProcessed,

    /// The entity is terminally failed; only an admin retry can revive it.
    AlreadyFailed,

    /// Transient problem; the queue should redeliver with backoff.
    Retryable(String),

    /// Verification cannot succeed without new input; the queue must stop
    /// retrying and dead-letter the job.
    Fatal(String),
}

impl JobOutcome {
    /// Whether the queue should acknowledge the delivery.
    pub fn is_ack(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::AlreadyProcessed | Self::AlreadyFailed
        )
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] stakequiz_store_lmdb::LmdbError),

    #[error("ledger client error: {0}")]
    Ledger(#[from] stakequiz_ledger::LedgerError),

    #[error("queue client error: {0}")]
    Queue(#[from] stakequiz_queue::QueueError),
}

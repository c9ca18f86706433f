//! Mutable service configuration stored as key-value rows.

use crate::StoreError;

/// Global runtime switches, read through on every relevant request rather
/// than cached in the process.
pub trait ConfigStore {
    /// Whether quiz submission is currently paused.
    fn quiz_paused(&self) -> Result<bool, StoreError>;

    fn set_quiz_paused(&self, paused: bool) -> Result<(), StoreError>;
}

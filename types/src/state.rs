//! Verification state machine states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Verification state of a stake (primary session or secondary stake).
///
/// `Processing` is the only non-terminal state. Once a stake reaches
/// `Success` or `Failed` the automatic pipeline never moves it again; only
/// explicit admin overrides may.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationState {
    Processing,
    Success,
    Failed,
}

impl VerificationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who created a session's question assignments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentSource {
    /// Assigned by the verification job pipeline.
    Job,
    /// Assigned through an admin override.
    Admin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_classification() {
        assert!(!VerificationState::Processing.is_terminal());
        assert!(VerificationState::Success.is_terminal());
        assert!(VerificationState::Failed.is_terminal());
    }

    #[test]
    fn serde_renders_lowercase() {
        assert_eq!(
            serde_json::to_string(&VerificationState::Processing).unwrap(),
            "\"processing\""
        );
        let s: VerificationState = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(s, VerificationState::Failed);
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingResume,
    MissingJobDescription,
    Transport,
    ServiceRejected,
    MalformedResponse,
}

/// User-visible description of why a submission did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureNotice {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureNotice {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A response body that decoded as JSON but does not honour the match contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("match_score {0} is outside 0..=100")]
    ScoreOutOfRange(i64),
    #[error("{0}")]
    Shape(String),
}

use shared::{
    domain::RequestId,
    error::{FailureKind, FailureNotice},
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Please upload a resume!")]
    MissingResume,
    #[error("Please enter a job description!")]
    MissingJobDescription,
    #[error("could not reach the matching service: {0}")]
    Transport(String),
    #[error("matching service rejected the request (status {status}): {message}")]
    ServiceRejected { status: u16, message: String },
    #[error("matching service returned a malformed result: {0}")]
    MalformedResponse(String),
    #[error("submission {0} was superseded by a newer submission")]
    Superseded(RequestId),
    #[error("submission {0} was cancelled")]
    Cancelled(RequestId),
}

impl SubmissionError {
    /// Classification stored in state. Abandoned submissions have none since
    /// they never write state.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            SubmissionError::MissingResume => Some(FailureKind::MissingResume),
            SubmissionError::MissingJobDescription => Some(FailureKind::MissingJobDescription),
            SubmissionError::Transport(_) => Some(FailureKind::Transport),
            SubmissionError::ServiceRejected { .. } => Some(FailureKind::ServiceRejected),
            SubmissionError::MalformedResponse(_) => Some(FailureKind::MalformedResponse),
            SubmissionError::Superseded(_) | SubmissionError::Cancelled(_) => None,
        }
    }

    pub fn failure_notice(&self) -> Option<FailureNotice> {
        self.kind().map(|kind| FailureNotice::new(kind, self.to_string()))
    }

    pub fn is_abandoned(&self) -> bool {
        matches!(
            self,
            SubmissionError::Superseded(_) | SubmissionError::Cancelled(_)
        )
    }
}

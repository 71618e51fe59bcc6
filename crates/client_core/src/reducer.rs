//! Submission state and the reducer-like transition function that drives it.
//!
//! Every transition names the request it belongs to. Transitions for any
//! request other than the one the state currently describes are rejected,
//! which is how late responses from superseded submissions are discarded.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{
    domain::{MatchResult, RequestId, SubmissionPhase},
    error::FailureNotice,
};

/// Simulated progress values. The transport does not report upload or
/// processing progress, so these mark lifecycle points rather than bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressPolicy {
    pub validated: u8,
    pub dispatched: u8,
    pub completed: u8,
}

pub const PROGRESS_POLICY: ProgressPolicy = ProgressPolicy {
    validated: 20,
    dispatched: 60,
    completed: 100,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SubmissionStatus {
    Idle,
    Validating,
    InFlight,
    Succeeded {
        result: MatchResult,
        completed_at: DateTime<Utc>,
    },
    Failed {
        notice: FailureNotice,
        failed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionState {
    pub request_id: RequestId,
    pub progress: u8,
    #[serde(flatten)]
    pub status: SubmissionStatus,
}

impl Default for SubmissionState {
    fn default() -> Self {
        Self {
            request_id: RequestId::NONE,
            progress: 0,
            status: SubmissionStatus::Idle,
        }
    }
}

impl SubmissionState {
    pub fn phase(&self) -> SubmissionPhase {
        match self.status {
            SubmissionStatus::Idle => SubmissionPhase::Idle,
            SubmissionStatus::Validating => SubmissionPhase::Validating,
            SubmissionStatus::InFlight => SubmissionPhase::InFlight,
            SubmissionStatus::Succeeded { .. } => SubmissionPhase::Succeeded,
            SubmissionStatus::Failed { .. } => SubmissionPhase::Failed,
        }
    }

    pub fn result(&self) -> Option<&MatchResult> {
        match &self.status {
            SubmissionStatus::Succeeded { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureNotice> {
        match &self.status {
            SubmissionStatus::Failed { notice, .. } => Some(notice),
            _ => None,
        }
    }

    /// Whether the loading indicator should be shown.
    pub fn is_loading(&self) -> bool {
        matches!(
            self.status,
            SubmissionStatus::Validating | SubmissionStatus::InFlight
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Starts a new submission. Any earlier result or failure is dropped.
    Begin { request_id: RequestId },
    /// Input passed validation; the request is about to be built.
    Accepted { request_id: RequestId, progress: u8 },
    Progress { request_id: RequestId, progress: u8 },
    Completed {
        request_id: RequestId,
        result: MatchResult,
        at: DateTime<Utc>,
    },
    Failed {
        request_id: RequestId,
        notice: FailureNotice,
        at: DateTime<Utc>,
    },
    /// The in-flight submission was abandoned by the user.
    Cancelled { request_id: RequestId },
}

impl Transition {
    pub fn request_id(&self) -> RequestId {
        match self {
            Transition::Begin { request_id }
            | Transition::Accepted { request_id, .. }
            | Transition::Progress { request_id, .. }
            | Transition::Completed { request_id, .. }
            | Transition::Failed { request_id, .. }
            | Transition::Cancelled { request_id } => *request_id,
        }
    }
}

/// Returns the next state, or `None` when the transition is stale or not legal
/// from the current phase. Rejected transitions leave the caller's state as-is.
pub fn reduce(state: &SubmissionState, transition: Transition) -> Option<SubmissionState> {
    if let Transition::Begin { request_id } = transition {
        if request_id <= state.request_id {
            return None;
        }
        return Some(SubmissionState {
            request_id,
            progress: 0,
            status: SubmissionStatus::Validating,
        });
    }

    if transition.request_id() != state.request_id {
        return None;
    }

    match (state.phase(), transition) {
        (SubmissionPhase::Validating, Transition::Accepted { progress, .. }) => {
            Some(SubmissionState {
                progress: progress.max(state.progress),
                status: SubmissionStatus::InFlight,
                ..state.clone()
            })
        }
        (SubmissionPhase::InFlight, Transition::Progress { progress, .. })
            if progress > state.progress =>
        {
            Some(SubmissionState {
                progress,
                ..state.clone()
            })
        }
        (SubmissionPhase::InFlight, Transition::Completed { result, at, .. }) => {
            Some(SubmissionState {
                request_id: state.request_id,
                progress: PROGRESS_POLICY.completed,
                status: SubmissionStatus::Succeeded {
                    result,
                    completed_at: at,
                },
            })
        }
        (SubmissionPhase::InFlight, Transition::Failed { notice, at, .. }) => {
            Some(SubmissionState {
                request_id: state.request_id,
                progress: state.progress,
                status: SubmissionStatus::Failed {
                    notice,
                    failed_at: at,
                },
            })
        }
        (SubmissionPhase::Validating | SubmissionPhase::InFlight, Transition::Cancelled { .. }) => {
            Some(SubmissionState {
                request_id: state.request_id,
                progress: 0,
                status: SubmissionStatus::Idle,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/reducer_tests.rs"]
mod tests;

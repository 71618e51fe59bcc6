use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use shared::domain::{MatchResult, RequestId};
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info};

pub mod config;
pub mod error;
pub mod input;
pub mod reducer;
pub mod service;
pub mod view;

pub use config::{load_settings, Settings};
pub use error::SubmissionError;
pub use input::{ResumeFile, SubmissionInput};
pub use reducer::{SubmissionState, SubmissionStatus, PROGRESS_POLICY};
pub use service::{HttpMatchingService, MatchRequest, MatchingService};

use reducer::{reduce, Transition};

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    StateChanged(SubmissionState),
    /// Blocking, user-facing message that did not change state.
    Notice(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Report the simulated intermediate progress values while in flight.
    pub progress_simulation: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            progress_simulation: true,
        }
    }
}

impl From<&Settings> for ControllerOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            progress_simulation: settings.progress_simulation,
        }
    }
}

#[derive(Default)]
struct ControllerInner {
    input: SubmissionInput,
    state: SubmissionState,
}

/// Owns the submission input and lifecycle state, and performs the exchange
/// with the matching service.
///
/// Each accepted `submit` supersedes the one before it: the older call stops
/// waiting on the network and never writes state.
pub struct SubmissionController {
    service: Arc<dyn MatchingService>,
    options: ControllerOptions,
    inner: Mutex<ControllerInner>,
    // Request currently allowed to commit; NONE after a cancel.
    current: watch::Sender<RequestId>,
    events: broadcast::Sender<ControllerEvent>,
}

impl SubmissionController {
    pub fn new(service: Arc<dyn MatchingService>, options: ControllerOptions) -> Self {
        let (current, _) = watch::channel(RequestId::NONE);
        let (events, _) = broadcast::channel(256);
        Self {
            service,
            options,
            inner: Mutex::new(ControllerInner::default()),
            current,
            events,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let service = HttpMatchingService::new(settings.endpoint_url()?);
        info!(endpoint = %service.endpoint(), "using matching service");
        Ok(Self::new(Arc::new(service), ControllerOptions::from(settings)))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn set_resume_file(&self, file: ResumeFile) {
        debug!(file_name = %file.file_name, bytes = file.bytes.len(), "resume selected");
        self.inner.lock().await.input.resume = Some(file);
    }

    pub async fn clear_resume_file(&self) {
        self.inner.lock().await.input.resume = None;
    }

    pub async fn set_job_description(&self, text: impl Into<String>) {
        self.inner.lock().await.input.job_description = text.into();
    }

    pub async fn input(&self) -> SubmissionInput {
        self.inner.lock().await.input.clone()
    }

    pub async fn state(&self) -> SubmissionState {
        self.inner.lock().await.state.clone()
    }

    pub async fn submit(&self) -> Result<MatchResult, SubmissionError> {
        let (request_id, request, mut current_rx) = {
            let mut inner = self.inner.lock().await;

            let (resume, job_description) = match inner.input.validate() {
                Ok((resume, job_description)) => (resume.clone(), job_description.to_string()),
                Err(err) => {
                    info!(error = %err, "submission rejected before dispatch");
                    let _ = self.events.send(ControllerEvent::Notice(err.to_string()));
                    return Err(err);
                }
            };

            let request_id = inner.state.request_id.next();
            self.commit(&mut inner, Transition::Begin { request_id });
            // Wakes any older submission still waiting on the network.
            self.current.send_replace(request_id);
            let current_rx = self.current.subscribe();

            let initial = if self.options.progress_simulation {
                PROGRESS_POLICY.validated
            } else {
                0
            };
            self.commit(
                &mut inner,
                Transition::Accepted {
                    request_id,
                    progress: initial,
                },
            );

            let request = MatchRequest {
                resume,
                job_description,
            };

            if self.options.progress_simulation {
                self.commit(
                    &mut inner,
                    Transition::Progress {
                        request_id,
                        progress: PROGRESS_POLICY.dispatched,
                    },
                );
            }

            (request_id, request, current_rx)
        };

        info!(%request_id, file_name = %request.resume.file_name, "dispatching match request");
        let outcome = tokio::select! {
            outcome = self.service.submit_match(request) => outcome,
            abandoned = wait_until_abandoned(&mut current_rx, request_id) => {
                debug!(%request_id, reason = %abandoned, "dropping in-flight match request");
                return Err(abandoned);
            }
        };

        let mut inner = self.inner.lock().await;
        match outcome {
            Ok(result) => {
                let committed = self.commit(
                    &mut inner,
                    Transition::Completed {
                        request_id,
                        result: result.clone(),
                        at: Utc::now(),
                    },
                );
                if !committed {
                    return Err(self.abandonment(request_id));
                }
                info!(
                    %request_id,
                    match_score = result.match_score,
                    matched = result.matched_skills.len(),
                    missing = result.missing_skills.len(),
                    "match succeeded"
                );
                Ok(result)
            }
            Err(err) => {
                error!(%request_id, error = %err, "match request failed");
                let committed = err.failure_notice().is_some_and(|notice| {
                    self.commit(
                        &mut inner,
                        Transition::Failed {
                            request_id,
                            notice,
                            at: Utc::now(),
                        },
                    )
                });
                if !committed {
                    return Err(self.abandonment(request_id));
                }
                Err(err)
            }
        }
    }

    /// Abandons the in-flight submission, if any, and returns to idle.
    pub async fn cancel(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let request_id = inner.state.request_id;
        let cancelled = self.commit(&mut inner, Transition::Cancelled { request_id });
        if cancelled {
            self.current.send_replace(RequestId::NONE);
            info!(%request_id, "match request cancelled");
        }
        cancelled
    }

    fn commit(&self, inner: &mut ControllerInner, transition: Transition) -> bool {
        match reduce(&inner.state, transition) {
            Some(next) => {
                inner.state = next;
                let _ = self
                    .events
                    .send(ControllerEvent::StateChanged(inner.state.clone()));
                true
            }
            None => false,
        }
    }

    fn abandonment(&self, request_id: RequestId) -> SubmissionError {
        if *self.current.borrow() > request_id {
            SubmissionError::Superseded(request_id)
        } else {
            SubmissionError::Cancelled(request_id)
        }
    }
}

async fn wait_until_abandoned(
    current_rx: &mut watch::Receiver<RequestId>,
    request_id: RequestId,
) -> SubmissionError {
    loop {
        if current_rx.changed().await.is_err() {
            return std::future::pending().await;
        }
        let current = *current_rx.borrow_and_update();
        if current == request_id {
            continue;
        }
        return if current > request_id {
            SubmissionError::Superseded(request_id)
        } else {
            SubmissionError::Cancelled(request_id)
        };
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

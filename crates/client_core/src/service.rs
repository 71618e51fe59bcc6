//! The remote matching service seam and its reqwest-backed implementation.

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use shared::{
    domain::MatchResult,
    protocol::{MatchResponse, ServiceErrorBody, JOB_DESCRIPTION_FIELD, RESUME_FIELD},
};
use tracing::debug;
use url::Url;

use crate::{error::SubmissionError, input::ResumeFile};

/// Everything the service needs for one match, detached from controller state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRequest {
    pub resume: ResumeFile,
    pub job_description: String,
}

impl MatchRequest {
    /// Builds the multipart body. Fails only when the resume carries a content
    /// type that is not a valid MIME type.
    pub fn into_form(self) -> Result<Form, reqwest::Error> {
        let ResumeFile {
            file_name,
            content_type,
            bytes,
        } = self.resume;

        let mut part = Part::bytes(bytes).file_name(file_name);
        if let Some(content_type) = content_type {
            part = part.mime_str(&content_type)?;
        }

        Ok(Form::new()
            .part(RESUME_FIELD, part)
            .text(JOB_DESCRIPTION_FIELD, self.job_description))
    }
}

#[async_trait]
pub trait MatchingService: Send + Sync {
    async fn submit_match(&self, request: MatchRequest) -> Result<MatchResult, SubmissionError>;
}

pub struct HttpMatchingService {
    http: Client,
    endpoint: Url,
}

impl HttpMatchingService {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(endpoint, Client::new())
    }

    pub fn with_client(endpoint: Url, http: Client) -> Self {
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl MatchingService for HttpMatchingService {
    async fn submit_match(&self, request: MatchRequest) -> Result<MatchResult, SubmissionError> {
        debug!(
            endpoint = %self.endpoint,
            file_name = %request.resume.file_name,
            resume_bytes = request.resume.bytes.len(),
            "posting match request"
        );
        let form = request
            .into_form()
            .map_err(|err| SubmissionError::Transport(format!("could not build request: {err}")))?;
        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|err| SubmissionError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| SubmissionError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(SubmissionError::ServiceRejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            });
        }

        decode_match_body(&body)
    }
}

/// Non-JSON bodies count as transport failures; JSON that misses the contract
/// is reported as malformed.
pub fn decode_match_body(body: &[u8]) -> Result<MatchResult, SubmissionError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|err| SubmissionError::Transport(format!("non-JSON response: {err}")))?;
    let response = MatchResponse::from_value(value)
        .map_err(|err| SubmissionError::MalformedResponse(err.to_string()))?;
    MatchResult::try_from(response).map_err(|err| SubmissionError::MalformedResponse(err.to_string()))
}

fn rejection_message(body: &[u8]) -> String {
    if let Ok(error_body) = serde_json::from_slice::<ServiceErrorBody>(body) {
        return error_body.message();
    }
    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        "empty response body".to_string()
    } else {
        text
    }
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;

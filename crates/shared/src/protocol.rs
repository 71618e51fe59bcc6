use serde::{Deserialize, Serialize};

use crate::{domain::MatchResult, error::ContractError};

/// Multipart field carrying the raw resume file.
pub const RESUME_FIELD: &str = "resume";
/// Multipart field carrying the job description text.
pub const JOB_DESCRIPTION_FIELD: &str = "job_description";
/// Path of the match endpoint relative to the service base URL.
pub const MATCH_PATH: &str = "match";

/// Body returned by the matching service on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    pub match_score: i64,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub recommendations: Vec<String>,
}

impl MatchResponse {
    /// Decodes an already-parsed JSON document, keeping shape errors apart from
    /// transport-level failures.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ContractError> {
        serde_json::from_value(value).map_err(|err| ContractError::Shape(err.to_string()))
    }
}

impl TryFrom<MatchResponse> for MatchResult {
    type Error = ContractError;

    fn try_from(value: MatchResponse) -> Result<Self, Self::Error> {
        let match_score = u8::try_from(value.match_score)
            .ok()
            .filter(|score| *score <= MatchResult::MAX_SCORE)
            .ok_or(ContractError::ScoreOutOfRange(value.match_score))?;

        Ok(MatchResult {
            match_score,
            matched_skills: value.matched_skills,
            missing_skills: value.missing_skills,
            recommendations: value.recommendations,
        })
    }
}

/// Error body shape used by the service framework (`{"detail": ...}`).
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceErrorBody {
    pub detail: serde_json::Value,
}

impl ServiceErrorBody {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn converts_in_range_response_into_result() {
        let response = MatchResponse::from_value(json!({
            "match_score": 72,
            "matched_skills": ["Go"],
            "missing_skills": ["Kubernetes"],
            "recommendations": ["Add a Kubernetes project"],
        }))
        .expect("decode");

        let result = MatchResult::try_from(response).expect("in range");
        assert_eq!(result.match_score, 72);
        assert_eq!(result.matched_skills, vec!["Go".to_string()]);
        assert_eq!(result.missing_skills, vec!["Kubernetes".to_string()]);
    }

    #[test]
    fn rejects_scores_outside_percentage_range() {
        for score in [-1_i64, 101, 4096] {
            let response = MatchResponse {
                match_score: score,
                matched_skills: Vec::new(),
                missing_skills: Vec::new(),
                recommendations: Vec::new(),
            };
            assert_eq!(
                MatchResult::try_from(response),
                Err(ContractError::ScoreOutOfRange(score))
            );
        }
    }

    #[test]
    fn missing_field_is_a_shape_error() {
        let err = MatchResponse::from_value(json!({
            "match_score": 10,
            "matched_skills": [],
            "missing_skills": [],
        }))
        .expect_err("recommendations missing");
        assert!(matches!(err, ContractError::Shape(ref msg) if msg.contains("recommendations")));
    }

    #[test]
    fn detail_message_prefers_plain_strings() {
        let body: ServiceErrorBody =
            serde_json::from_value(json!({ "detail": "resume could not be parsed" }))
                .expect("body");
        assert_eq!(body.message(), "resume could not be parsed");

        let body: ServiceErrorBody =
            serde_json::from_value(json!({ "detail": [{ "loc": ["body", "resume"] }] }))
                .expect("body");
        assert!(body.message().contains("resume"));
    }
}

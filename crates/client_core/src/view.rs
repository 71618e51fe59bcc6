//! Text rendering of submission state. Rendering is a pure function of its
//! input, so drawing the same result twice yields the same output.

use std::fmt;

use serde::Serialize;
use shared::domain::{MatchResult, SubmissionPhase};

use crate::reducer::SubmissionState;

const PROGRESS_BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionTone {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultSection {
    pub title: &'static str,
    pub tone: SectionTone,
    pub lines: Vec<String>,
}

impl fmt::Display for ResultSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for line in &self.lines {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}

fn bullets(items: &[String]) -> Vec<String> {
    items.iter().map(|item| format!("- {item}")).collect()
}

/// Missing skills are only shown when there are any.
pub fn render_result(result: &MatchResult) -> Vec<ResultSection> {
    let mut sections = vec![
        ResultSection {
            title: "Match Score",
            tone: SectionTone::Default,
            lines: vec![format!(
                "{} / {}",
                result.match_score,
                MatchResult::MAX_SCORE
            )],
        },
        ResultSection {
            title: "Matched Skills",
            tone: SectionTone::Default,
            lines: bullets(&result.matched_skills),
        },
    ];

    if !result.missing_skills.is_empty() {
        sections.push(ResultSection {
            title: "Missing Skills!",
            tone: SectionTone::Destructive,
            lines: bullets(&result.missing_skills),
        });
    }

    sections.push(ResultSection {
        title: "Recommendations",
        tone: SectionTone::Default,
        lines: bullets(&result.recommendations),
    });
    sections
}

pub fn progress_bar(progress: u8) -> String {
    let progress = progress.min(100) as usize;
    let filled = progress * PROGRESS_BAR_WIDTH / 100;
    format!(
        "[{}{}] {progress:>3}%",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_WIDTH - filled)
    )
}

pub fn render_state(state: &SubmissionState) -> String {
    match state.phase() {
        SubmissionPhase::Idle => "Ready. Select a resume and paste a job description.".to_string(),
        SubmissionPhase::Validating => "Checking input...".to_string(),
        SubmissionPhase::InFlight => format!("Matching... {}", progress_bar(state.progress)),
        SubmissionPhase::Succeeded => state
            .result()
            .map(|result| {
                render_result(result)
                    .iter()
                    .map(ResultSection::to_string)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default(),
        SubmissionPhase::Failed => state
            .failure()
            .map(|notice| format!("Match failed: {}", notice.message))
            .unwrap_or_else(|| "Match failed.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use shared::{
        domain::RequestId,
        error::{FailureKind, FailureNotice},
    };

    use super::*;
    use crate::reducer::SubmissionStatus;

    fn scenario_a() -> MatchResult {
        MatchResult {
            match_score: 72,
            matched_skills: vec!["Go".to_string()],
            missing_skills: vec!["Kubernetes".to_string()],
            recommendations: vec!["Add a Kubernetes project".to_string()],
        }
    }

    #[test]
    fn renders_all_four_sections() {
        let sections = render_result(&scenario_a());
        let titles: Vec<_> = sections.iter().map(|s| s.title).collect();
        assert_eq!(
            titles,
            vec!["Match Score", "Matched Skills", "Missing Skills!", "Recommendations"]
        );
        assert_eq!(sections[0].lines, vec!["72 / 100".to_string()]);
        assert_eq!(sections[1].lines, vec!["- Go".to_string()]);
        assert_eq!(sections[2].tone, SectionTone::Destructive);
        assert_eq!(sections[3].lines, vec!["- Add a Kubernetes project".to_string()]);
    }

    #[test]
    fn omits_missing_skills_when_empty() {
        let mut result = scenario_a();
        result.missing_skills.clear();
        let sections = render_result(&result);
        assert!(sections.iter().all(|s| s.title != "Missing Skills!"));
    }

    #[test]
    fn rendering_twice_is_identical() {
        let state = SubmissionState {
            request_id: RequestId(1),
            progress: 100,
            status: SubmissionStatus::Succeeded {
                result: scenario_a(),
                completed_at: Utc::now(),
            },
        };
        let first = render_state(&state);
        let second = render_state(&state);
        assert_eq!(first, second);
        assert_eq!(first.matches("- Go").count(), 1);
    }

    #[test]
    fn failed_state_shows_message() {
        let state = SubmissionState {
            request_id: RequestId(2),
            progress: 60,
            status: SubmissionStatus::Failed {
                notice: FailureNotice::new(FailureKind::Transport, "connection refused"),
                failed_at: Utc::now(),
            },
        };
        assert_eq!(render_state(&state), "Match failed: connection refused");
    }

    #[test]
    fn progress_bar_scales_to_width() {
        assert_eq!(progress_bar(0), format!("[{}]   0%", "-".repeat(20)));
        assert_eq!(
            progress_bar(60),
            format!("[{}{}]  60%", "#".repeat(12), "-".repeat(8))
        );
        assert_eq!(progress_bar(250), format!("[{}] 100%", "#".repeat(20)));
    }
}

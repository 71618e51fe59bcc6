use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    load_settings, view::render_state, ControllerEvent, ResumeFile, Settings,
    SubmissionController,
};
use shared::domain::SubmissionPhase;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

mod bridge;
mod interactive;

#[derive(Parser, Debug)]
#[command(name = "skillmatch", about = "Match a resume against a job description")]
struct Cli {
    /// Base URL of the matching service.
    #[arg(long, global = true)]
    service_url: Option<String>,
    /// Skip the simulated progress updates while a request is in flight.
    #[arg(long, global = true)]
    no_progress: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit one resume and job description, then print the result.
    Match(MatchArgs),
    /// Start a line-oriented session.
    Interactive,
}

#[derive(Args, Debug)]
struct MatchArgs {
    #[arg(long)]
    resume: Option<PathBuf>,
    #[arg(long, conflicts_with = "job_description_file")]
    job_description: Option<String>,
    #[arg(long)]
    job_description_file: Option<PathBuf>,
    /// Print the final state as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(service_url) = cli.service_url {
        settings.service_url = service_url;
    }
    if cli.no_progress {
        settings.progress_simulation = false;
    }

    match cli.command {
        Command::Match(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to build runtime")?;
            runtime.block_on(run_match(settings, args))
        }
        Command::Interactive => {
            interactive::run(settings)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_match(settings: Settings, args: MatchArgs) -> Result<ExitCode> {
    let controller = SubmissionController::from_settings(&settings)?;

    if let Some(path) = &args.resume {
        let file = ResumeFile::load(path)
            .with_context(|| format!("failed to read resume '{}'", path.display()))?;
        controller.set_resume_file(file).await;
    }
    let job_description = match (args.job_description, &args.job_description_file) {
        (Some(text), _) => text,
        (None, Some(path)) => fs::read_to_string(path).with_context(|| {
            format!("failed to read job description '{}'", path.display())
        })?,
        (None, None) => String::new(),
    };
    controller.set_job_description(job_description).await;

    let report = submit_and_report(&controller, args.json).await?;
    if let Some(error) = &report.stderr {
        eprintln!("{error}");
    }
    if let Some(output) = &report.stdout {
        println!("{output}");
    }
    Ok(report.exit_code)
}

/// What a one-shot submission prints and how the process exits.
#[derive(Debug)]
struct MatchReport {
    exit_code: ExitCode,
    stdout: Option<String>,
    stderr: Option<String>,
}

/// Submits once while echoing in-flight progress to stderr, then renders the
/// outcome. A rejected input never produces stdout output.
async fn submit_and_report(controller: &SubmissionController, json: bool) -> Result<MatchReport> {
    let progress = (!json).then(|| {
        let mut events = controller.subscribe_events();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(ControllerEvent::StateChanged(state)) => {
                        if state.phase() == SubmissionPhase::InFlight {
                            eprintln!("{}", render_state(&state));
                        }
                        if state.phase().is_settled() {
                            break;
                        }
                    }
                    // Validation notices mean nothing was dispatched.
                    Ok(ControllerEvent::Notice(_)) => break,
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        })
    });

    let outcome = controller.submit().await;
    if let Some(progress) = progress {
        if matches!(&outcome, Err(err) if err.is_abandoned()) {
            progress.abort();
        } else if let Err(err) = progress.await {
            tracing::warn!("progress printer failed: {err}");
        }
    }

    let state = controller.state().await;
    let report = match outcome {
        Ok(_) => MatchReport {
            exit_code: ExitCode::SUCCESS,
            stdout: Some(if json {
                serde_json::to_string_pretty(&state)?
            } else {
                render_state(&state)
            }),
            stderr: None,
        },
        Err(err) => MatchReport {
            exit_code: ExitCode::FAILURE,
            stdout: if json && state.phase().is_settled() {
                Some(serde_json::to_string_pretty(&state)?)
            } else {
                None
            },
            stderr: Some(err.to_string()),
        },
    };
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use client_core::{ControllerOptions, MatchRequest, MatchingService, SubmissionError};
    use shared::domain::MatchResult;

    use super::*;

    struct FixedService(Result<MatchResult, SubmissionError>);

    #[async_trait]
    impl MatchingService for FixedService {
        async fn submit_match(
            &self,
            _request: MatchRequest,
        ) -> Result<MatchResult, SubmissionError> {
            self.0.clone()
        }
    }

    async fn controller_with(
        outcome: Result<MatchResult, SubmissionError>,
    ) -> SubmissionController {
        let controller = SubmissionController::new(
            Arc::new(FixedService(outcome)),
            ControllerOptions::default(),
        );
        controller
            .set_resume_file(ResumeFile::new("resume.pdf", b"%PDF".to_vec()))
            .await;
        controller.set_job_description("Go developer").await;
        controller
    }

    fn scored(match_score: u8) -> MatchResult {
        MatchResult {
            match_score,
            matched_skills: vec!["Go".to_string()],
            missing_skills: vec!["Kubernetes".to_string()],
            recommendations: vec!["Add a Kubernetes project".to_string()],
        }
    }

    #[tokio::test]
    async fn missing_resume_fails_without_printing_a_result() {
        let controller = controller_with(Ok(scored(72))).await;
        controller.clear_resume_file().await;

        for json in [false, true] {
            let report = submit_and_report(&controller, json).await.expect("report");
            assert_eq!(report.exit_code, ExitCode::FAILURE);
            assert_eq!(report.stdout, None);
            assert_eq!(report.stderr.as_deref(), Some("Please upload a resume!"));
        }
    }

    #[tokio::test]
    async fn json_success_prints_serialized_state() {
        let controller = controller_with(Ok(scored(72))).await;

        let report = submit_and_report(&controller, true).await.expect("report");
        assert_eq!(report.exit_code, ExitCode::SUCCESS);
        assert_eq!(report.stderr, None);

        let printed: serde_json::Value =
            serde_json::from_str(report.stdout.as_deref().expect("stdout")).expect("json");
        assert_eq!(printed["phase"], "succeeded");
        assert_eq!(printed["progress"], 100);
        assert_eq!(printed["result"]["match_score"], 72);
    }

    #[tokio::test]
    async fn text_success_renders_result_sections() {
        let controller = controller_with(Ok(scored(72))).await;

        let report = submit_and_report(&controller, false).await.expect("report");
        assert_eq!(report.exit_code, ExitCode::SUCCESS);
        let stdout = report.stdout.expect("stdout");
        assert!(stdout.contains("72 / 100"));
        assert!(stdout.contains("- Kubernetes"));
    }

    #[tokio::test]
    async fn transport_failure_exits_with_failure() {
        let controller = controller_with(Err(SubmissionError::Transport(
            "connection refused".to_string(),
        )))
        .await;

        let report = submit_and_report(&controller, false).await.expect("report");
        assert_eq!(report.exit_code, ExitCode::FAILURE);
        assert_eq!(report.stdout, None);
        assert!(report
            .stderr
            .expect("stderr")
            .contains("connection refused"));

        let report = submit_and_report(&controller, true).await.expect("report");
        assert_eq!(report.exit_code, ExitCode::FAILURE);
        let printed: serde_json::Value =
            serde_json::from_str(report.stdout.as_deref().expect("stdout")).expect("json");
        assert_eq!(printed["phase"], "failed");
        assert_eq!(printed["notice"]["kind"], "transport");
    }
}

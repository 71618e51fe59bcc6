//! Bridge between the interactive input loop and the backend worker that owns
//! the submission controller.

use std::{fs, path::PathBuf, sync::Arc, thread};

use client_core::{
    ControllerEvent, ResumeFile, Settings, SubmissionController, SubmissionInput, SubmissionState,
};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use tokio::sync::broadcast::error::RecvError;

pub enum BackendCommand {
    SelectResume { path: PathBuf },
    SetJobDescription { text: String },
    LoadJobDescription { path: PathBuf },
    Submit,
    Cancel,
    Status,
    Shutdown,
}

impl BackendCommand {
    fn name(&self) -> &'static str {
        match self {
            BackendCommand::SelectResume { .. } => "select_resume",
            BackendCommand::SetJobDescription { .. } => "set_job_description",
            BackendCommand::LoadJobDescription { .. } => "load_job_description",
            BackendCommand::Submit => "submit",
            BackendCommand::Cancel => "cancel",
            BackendCommand::Status => "status",
            BackendCommand::Shutdown => "shutdown",
        }
    }
}

pub enum UiEvent {
    Info(String),
    Notice(String),
    Error(String),
    State(SubmissionState),
    Input(SubmissionInput),
}

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
) -> Result<(), String> {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            Ok(())
        }
        Err(TrySendError::Full(_)) => Err("Command queue is full; please retry".to_string()),
        Err(TrySendError::Disconnected(_)) => Err(
            "Backend worker disconnected (possible startup/runtime failure); restart the session"
                .to_string(),
        ),
    }
}

pub fn launch(
    settings: Settings,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(format!(
                    "backend worker startup failure: failed to build runtime: {err}"
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let controller = match SubmissionController::from_settings(&settings) {
                Ok(controller) => Arc::new(controller),
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(format!(
                        "backend worker startup failure: {err:#}"
                    )));
                    tracing::error!("failed to build submission controller: {err:#}");
                    return;
                }
            };

            let mut events = controller.subscribe_events();
            let forward_tx = ui_tx.clone();
            let forwarder = tokio::spawn(async move {
                loop {
                    let ui_event = match events.recv().await {
                        Ok(ControllerEvent::StateChanged(state)) => UiEvent::State(state),
                        Ok(ControllerEvent::Notice(message)) => UiEvent::Notice(message),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "ui event forwarder lagged");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };
                    match forward_tx.try_send(ui_event) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            tracing::warn!("ui event queue is full; dropping event");
                        }
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                }
            });

            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::SelectResume { path } => match ResumeFile::load(&path) {
                        Ok(file) => {
                            let _ = ui_tx.try_send(UiEvent::Info(format!(
                                "Selected resume '{}' ({} bytes)",
                                file.file_name,
                                file.bytes.len()
                            )));
                            controller.set_resume_file(file).await;
                        }
                        Err(err) => {
                            let _ = ui_tx.try_send(UiEvent::Error(format!(
                                "could not read resume '{}': {err}",
                                path.display()
                            )));
                        }
                    },
                    BackendCommand::SetJobDescription { text } => {
                        let chars = text.chars().count();
                        controller.set_job_description(text).await;
                        let _ = ui_tx.try_send(UiEvent::Info(format!(
                            "Job description set ({chars} characters)"
                        )));
                    }
                    BackendCommand::LoadJobDescription { path } => {
                        match fs::read_to_string(&path) {
                            Ok(text) => {
                                let lines = text.lines().count();
                                controller.set_job_description(text).await;
                                let _ = ui_tx.try_send(UiEvent::Info(format!(
                                    "Job description loaded from '{}' ({lines} lines)",
                                    path.display()
                                )));
                            }
                            Err(err) => {
                                let _ = ui_tx.try_send(UiEvent::Error(format!(
                                    "could not read job description '{}': {err}",
                                    path.display()
                                )));
                            }
                        }
                    }
                    BackendCommand::Submit => {
                        let controller = controller.clone();
                        tokio::spawn(async move {
                            match controller.submit().await {
                                Ok(_) => {}
                                Err(err) if err.is_abandoned() => {
                                    tracing::debug!(error = %err, "submission abandoned");
                                }
                                Err(err) => {
                                    tracing::debug!(error = %err, "submission ended without a result");
                                }
                            }
                        });
                    }
                    BackendCommand::Cancel => {
                        if !controller.cancel().await {
                            let _ = ui_tx.try_send(UiEvent::Info(
                                "Nothing in flight to cancel".to_string(),
                            ));
                        }
                    }
                    BackendCommand::Status => {
                        let _ = ui_tx.try_send(UiEvent::Input(controller.input().await));
                        let _ = ui_tx.try_send(UiEvent::State(controller.state().await));
                    }
                    BackendCommand::Shutdown => break,
                }
            }

            controller.cancel().await;
            forwarder.abort();
        });
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crossbeam_channel::bounded;

    use super::*;

    #[test]
    fn dispatch_reports_full_and_disconnected_queues() {
        let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(1);
        assert!(dispatch_backend_command(&cmd_tx, BackendCommand::Status).is_ok());

        let full = dispatch_backend_command(&cmd_tx, BackendCommand::Status).expect_err("full");
        assert!(full.contains("full"));

        drop(cmd_rx);
        let gone = dispatch_backend_command(&cmd_tx, BackendCommand::Submit).expect_err("gone");
        assert!(gone.contains("disconnected"));
    }

    #[test]
    fn loads_multi_line_job_description_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("job.txt");
        let text = "Senior Go developer\n\nMust know Kubernetes.\n";
        fs::write(&path, text).expect("write job description");

        let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(8);
        let (ui_tx, ui_rx) = bounded::<UiEvent>(64);
        let worker = launch(Settings::default(), cmd_rx, ui_tx);

        dispatch_backend_command(&cmd_tx, BackendCommand::LoadJobDescription { path })
            .expect("queue load");
        dispatch_backend_command(&cmd_tx, BackendCommand::Status).expect("queue status");

        let input = loop {
            match ui_rx.recv_timeout(Duration::from_secs(5)) {
                Ok(UiEvent::Input(input)) => break input,
                Ok(UiEvent::Error(message)) => panic!("backend error: {message}"),
                Ok(_) => continue,
                Err(err) => panic!("no input snapshot received: {err}"),
            }
        };
        assert_eq!(input.job_description, text);
        assert!(input.resume.is_none());

        dispatch_backend_command(&cmd_tx, BackendCommand::Shutdown).expect("queue shutdown");
        worker.join().expect("worker exits");
    }

    #[test]
    fn submit_without_resume_surfaces_notice() {
        let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(8);
        let (ui_tx, ui_rx) = bounded::<UiEvent>(64);
        let worker = launch(Settings::default(), cmd_rx, ui_tx);

        dispatch_backend_command(
            &cmd_tx,
            BackendCommand::SetJobDescription {
                text: "Rust engineer".to_string(),
            },
        )
        .expect("queue description");
        dispatch_backend_command(&cmd_tx, BackendCommand::Submit).expect("queue submit");

        let notice = loop {
            match ui_rx.recv_timeout(Duration::from_secs(5)) {
                Ok(UiEvent::Notice(message)) => break message,
                Ok(_) => continue,
                Err(err) => panic!("no notice received: {err}"),
            }
        };
        assert_eq!(notice, "Please upload a resume!");

        dispatch_backend_command(&cmd_tx, BackendCommand::Shutdown).expect("queue shutdown");
        worker.join().expect("worker exits");
    }
}

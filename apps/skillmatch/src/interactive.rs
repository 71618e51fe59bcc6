//! Line-oriented interactive session. Input parsing stays on the calling
//! thread; submissions run on the backend worker so they can overlap.

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    thread,
};

use anyhow::Result;
use client_core::{view::render_state, Settings};
use crossbeam_channel::{bounded, Receiver};
use shared::domain::SubmissionPhase;

use crate::bridge::{self, dispatch_backend_command, BackendCommand, UiEvent};

const HELP: &str = "\
commands:
  resume <path>   select the resume file to upload
  jd <text>       set the job description
  jd-file <path>  load a multi-line job description from a file
  submit          send the current input to the matching service
  cancel          abandon the submission in flight
  status          show the current state
  help            show this message
  quit            leave the session";

#[derive(Debug, PartialEq, Eq)]
pub enum InputLine {
    Command(CommandLine),
    Help,
    Quit,
    Empty,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CommandLine {
    SelectResume(PathBuf),
    SetJobDescription(String),
    LoadJobDescription(PathBuf),
    Submit,
    Cancel,
    Status,
}

impl From<CommandLine> for BackendCommand {
    fn from(value: CommandLine) -> Self {
        match value {
            CommandLine::SelectResume(path) => BackendCommand::SelectResume { path },
            CommandLine::SetJobDescription(text) => BackendCommand::SetJobDescription { text },
            CommandLine::LoadJobDescription(path) => BackendCommand::LoadJobDescription { path },
            CommandLine::Submit => BackendCommand::Submit,
            CommandLine::Cancel => BackendCommand::Cancel,
            CommandLine::Status => BackendCommand::Status,
        }
    }
}

pub fn parse_line(line: &str) -> Result<InputLine, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(InputLine::Empty);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "resume" if rest.is_empty() => return Err("usage: resume <path>".to_string()),
        "resume" => CommandLine::SelectResume(PathBuf::from(rest)),
        // An empty description is accepted here and rejected on submit.
        "jd" => CommandLine::SetJobDescription(rest.to_string()),
        "jd-file" if rest.is_empty() => return Err("usage: jd-file <path>".to_string()),
        "jd-file" => CommandLine::LoadJobDescription(PathBuf::from(rest)),
        "submit" => CommandLine::Submit,
        "cancel" => CommandLine::Cancel,
        "status" => CommandLine::Status,
        "help" | "?" => return Ok(InputLine::Help),
        "quit" | "exit" => return Ok(InputLine::Quit),
        other => return Err(format!("unknown command '{other}'; type 'help'")),
    };
    Ok(InputLine::Command(command))
}

fn print_events(ui_rx: Receiver<UiEvent>) {
    for event in ui_rx.iter() {
        match event {
            UiEvent::Info(message) => println!("{message}"),
            UiEvent::Notice(message) => println!("! {message}"),
            UiEvent::Error(message) => eprintln!("error: {message}"),
            UiEvent::Input(input) => println!(
                "resume: {}; job description: {} lines",
                input
                    .resume
                    .as_ref()
                    .map_or("(none)", |file| file.file_name.as_str()),
                input.job_description.lines().count()
            ),
            UiEvent::State(state) => {
                if state.phase() == SubmissionPhase::Validating {
                    continue;
                }
                println!("{}", render_state(&state));
            }
        }
    }
}

pub fn run(settings: Settings) -> Result<()> {
    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);

    let worker = bridge::launch(settings, cmd_rx, ui_tx);
    let printer = thread::spawn(move || print_events(ui_rx));

    println!("{HELP}");
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match parse_line(&line) {
            Ok(InputLine::Empty) => {}
            Ok(InputLine::Help) => println!("{HELP}"),
            Ok(InputLine::Quit) => break,
            Ok(InputLine::Command(command)) => {
                if let Err(status) = dispatch_backend_command(&cmd_tx, command.into()) {
                    eprintln!("{status}");
                }
            }
            Err(message) => eprintln!("{message}"),
        }
        io::stdout().flush()?;
    }

    let _ = dispatch_backend_command(&cmd_tx, BackendCommand::Shutdown);
    drop(cmd_tx);
    if worker.join().is_err() {
        tracing::error!("backend worker panicked");
    }
    if printer.join().is_err() {
        tracing::error!("event printer panicked");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resume_path_with_spaces() {
        assert_eq!(
            parse_line("resume  ./My CV.pdf "),
            Ok(InputLine::Command(CommandLine::SelectResume(PathBuf::from(
                "./My CV.pdf"
            ))))
        );
    }

    #[test]
    fn resume_requires_a_path() {
        assert!(parse_line("resume").is_err());
    }

    #[test]
    fn job_description_keeps_inner_text() {
        assert_eq!(
            parse_line("jd Looking for a Go developer, Kubernetes a plus."),
            Ok(InputLine::Command(CommandLine::SetJobDescription(
                "Looking for a Go developer, Kubernetes a plus.".to_string()
            )))
        );
        assert_eq!(
            parse_line("jd"),
            Ok(InputLine::Command(CommandLine::SetJobDescription(
                String::new()
            )))
        );
    }

    #[test]
    fn job_description_file_requires_a_path() {
        assert_eq!(
            parse_line("jd-file ./postings/backend role.txt"),
            Ok(InputLine::Command(CommandLine::LoadJobDescription(
                PathBuf::from("./postings/backend role.txt")
            )))
        );
        assert!(parse_line("jd-file").is_err());
    }

    #[test]
    fn verbs_are_case_insensitive() {
        assert_eq!(
            parse_line("SUBMIT"),
            Ok(InputLine::Command(CommandLine::Submit))
        );
        assert_eq!(parse_line("Exit"), Ok(InputLine::Quit));
        assert_eq!(parse_line("   "), Ok(InputLine::Empty));
    }

    #[test]
    fn unknown_verbs_are_reported() {
        let err = parse_line("upload cv.pdf").expect_err("unknown");
        assert!(err.contains("upload"));
    }
}

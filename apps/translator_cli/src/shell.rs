//! Interactive session: one line per user intent, re-rendered from controller events.

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use client_core::{ControllerEvent, TranslateOutcome, WorkflowController};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinHandle,
};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::{debug, warn};

use crate::render::{render_notification, render_snapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Open(PathBuf),
    Translate,
    Download,
    Status,
    Help,
    Quit,
}

const HELP: &str = "commands: open <path> | translate | download | status | help | quit";

pub fn parse_command(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "open" | "select" => {
            if rest.is_empty() {
                return Err("usage: open <path>".to_string());
            }
            ShellCommand::Open(PathBuf::from(rest.trim_matches('"')))
        }
        "translate" | "t" => ShellCommand::Translate,
        "download" | "save" | "d" => ShellCommand::Download,
        "status" | "s" => ShellCommand::Status,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{other}'; {HELP}")),
    };

    if !rest.is_empty() && !matches!(command, ShellCommand::Open(_)) {
        return Err(format!("'{verb}' takes no arguments"));
    }
    Ok(Some(command))
}

pub async fn run(controller: Arc<WorkflowController>) -> Result<()> {
    let renderer = spawn_renderer(Arc::clone(&controller));
    println!("{HELP}");
    println!("{}", render_snapshot(&controller.snapshot()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match command {
            ShellCommand::Open(path) => open_image(&controller, path).await,
            ShellCommand::Translate => {
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    if controller.translate().await == TranslateOutcome::AlreadyInFlight {
                        println!("a translation is already running");
                    }
                });
            }
            ShellCommand::Download => {
                if !controller.download() {
                    println!("nothing to download yet");
                }
            }
            ShellCommand::Status => println!("{}", render_snapshot(&controller.snapshot())),
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Quit => break,
        }
    }

    renderer.abort();
    Ok(())
}

async fn open_image(controller: &WorkflowController, path: PathBuf) {
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            println!("could not read {}: {err}", path.display());
            return;
        }
    };

    let file_name = path.file_name().and_then(|name| name.to_str());
    if let Err(err) = controller.select_image_file(file_name, bytes) {
        println!("{err}");
    }
}

fn spawn_renderer(controller: Arc<WorkflowController>) -> JoinHandle<()> {
    let mut events = BroadcastStream::new(controller.subscribe());
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                Ok(ControllerEvent::StateChanged { state, revision }) => {
                    debug!(state = state.label(), revision = revision.0, "re-rendering");
                    println!("{}", render_snapshot(&controller.snapshot()));
                }
                Ok(ControllerEvent::Notification(notification)) => {
                    println!("{}", render_notification(&notification));
                }
                Err(err) => {
                    warn!("renderer fell behind controller events: {err}");
                    println!("{}", render_snapshot(&controller.snapshot()));
                }
            }
        }
    })
}

/// Pomodoro session control commands
use anyhow::Result;
use std::path::Path;
use stayzen_core::ipc::{IpcRequest, IpcResponse};
use stayzen_core::PomodoroSnapshot;

use super::helpers::{clock, send};

pub async fn start(sock_path: &Path) -> Result<()> {
    match send(sock_path, IpcRequest::StartPomodoro).await? {
        IpcResponse::Pomodoro { state, .. } => {
            println!("Pomodoro started.");
            print_state(&state);
            Ok(())
        }
        other => anyhow::bail!("Unexpected response from daemon: {other:?}"),
    }
}

pub async fn stop(sock_path: &Path) -> Result<()> {
    match send(sock_path, IpcRequest::StopPomodoro).await? {
        IpcResponse::Pomodoro { state, .. } => {
            println!("Pomodoro stopped.");
            print_state(&state);
            Ok(())
        }
        other => anyhow::bail!("Unexpected response from daemon: {other:?}"),
    }
}

pub async fn show(sock_path: &Path) -> Result<()> {
    match send(sock_path, IpcRequest::GetPomodoroState).await? {
        IpcResponse::PomodoroState { state } => {
            print_state(&state);
            Ok(())
        }
        other => anyhow::bail!("Unexpected response from daemon: {other:?}"),
    }
}

fn print_state(state: &PomodoroSnapshot) {
    if state.running {
        let phase = if state.on_break { "Break" } else { "Focus" };
        println!("{phase}: {} remaining", clock(state.remaining_seconds));
    } else {
        println!(
            "Idle ({} focus / {} break)",
            clock(state.focus_seconds),
            clock(state.break_seconds)
        );
    }
}

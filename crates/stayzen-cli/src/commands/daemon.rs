/// Daemon lifecycle management commands
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, fs, process::Command, thread, time::Duration};
use sysinfo::{Pid, System};
use stayzen_core::{
    config::get_data_dir,
    ipc::{IpcClient, IpcRequest, IpcResponse},
    AgentRegistry, Coordinator, PageBus,
};
use stayzen_storage::Database;

use super::helpers::clock;

/// How long a graceful shutdown gets before the process is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn pid_file(data_dir: &Path) -> PathBuf {
    data_dir.join("stayzen.pid")
}

fn socket_file(data_dir: &Path) -> PathBuf {
    data_dir.join("stayzen.sock")
}

/// PID recorded in the file, if that process is still alive. Missing,
/// garbled, or dead-process files all read as "not running".
fn running_pid(pid_file: &Path) -> Option<usize> {
    let pid = fs::read_to_string(pid_file)
        .ok()?
        .trim()
        .parse::<usize>()
        .ok()?;
    let mut sys = System::new();
    sys.refresh_process(Pid::from(pid)).then_some(pid)
}

fn alive(pid: usize) -> bool {
    let mut sys = System::new();
    sys.refresh_process(Pid::from(pid))
}

fn kill(pid: usize) {
    let mut sys = System::new();
    if sys.refresh_process(Pid::from(pid)) {
        if let Some(process) = sys.process(Pid::from(pid)) {
            process.kill();
        }
    }
}

/// Launch the daemon as a detached child re-running this binary with
/// the hidden internal subcommand.
pub fn start_daemon(data_dir: &Path) -> Result<()> {
    let pid_path = pid_file(data_dir);
    let sock_path = socket_file(data_dir);
    fs::create_dir_all(data_dir)?;

    if let Some(pid) = running_pid(&pid_path) {
        log::info!("Daemon is already running (PID: {pid}).");
        return Ok(());
    }

    // Leftovers from an unclean shutdown
    for stale in [&pid_path, &sock_path] {
        if stale.exists() {
            log::warn!("Removing stale file: {}", stale.display());
            fs::remove_file(stale)?;
        }
    }

    log::info!("Starting StayZen daemon...");
    let child = Command::new(env::current_exe()?)
        .arg("daemon-internal-start")
        .spawn()
        .context("Failed to spawn the daemon process")?;

    fs::write(&pid_path, child.id().to_string())?;
    log::info!("Daemon started (PID: {}).", child.id());
    Ok(())
}

pub async fn run_daemon_process() -> Result<()> {
    // Detached child: stdout/stderr go nowhere, so logging must be
    // wired to a file before anything else happens
    setup_daemon_logging().context("Daemon logging setup failed")?;
    log::info!("Daemon process started internally.");

    if let Err(e) = daemon_main_logic().await {
        log::error!("Daemon main logic exited with a fatal error: {e:#}");
        return Err(e);
    }

    Ok(())
}

async fn daemon_main_logic() -> Result<()> {
    let database = Arc::new(Database::new(None)?);
    let pages: Arc<dyn PageBus> = Arc::new(AgentRegistry::new());
    let coordinator = Coordinator::new(database, pages)?;
    coordinator.run_with_signals().await
}

/// Ask the daemon to shut down over IPC, then kill it if it lingers.
pub async fn stop_daemon(data_dir: &Path) -> Result<()> {
    let pid_path = pid_file(data_dir);
    let sock_path = socket_file(data_dir);

    let Some(pid) = running_pid(&pid_path) else {
        log::info!("Daemon is not running.");
        remove_runtime_files(&pid_path, &sock_path)?;
        return Ok(());
    };

    log::info!("Stopping StayZen daemon (PID: {pid})...");
    let client = IpcClient::new(&sock_path);
    match client.send_command(IpcRequest::Shutdown).await {
        Ok(IpcResponse::Shutdown) => {
            thread::sleep(SHUTDOWN_GRACE);
        }
        Ok(resp) => log::warn!("Unexpected response to shutdown: {resp:?}"),
        Err(e) => log::warn!("Daemon did not acknowledge shutdown: {e:#}"),
    }

    if alive(pid) {
        log::warn!("Daemon still alive after {SHUTDOWN_GRACE:?}; killing PID {pid}.");
        kill(pid);
    } else {
        log::info!("Daemon stopped.");
    }

    remove_runtime_files(&pid_path, &sock_path)
}

fn remove_runtime_files(pid_path: &Path, sock_path: &Path) -> Result<()> {
    for file in [pid_path, sock_path] {
        if file.exists() {
            fs::remove_file(file)?;
        }
    }
    Ok(())
}

pub async fn show_status(data_dir: &Path) -> Result<()> {
    let sock_path = socket_file(data_dir);

    if !sock_path.exists() {
        println!("Daemon Status: Not running");
        return Ok(());
    }

    let client = IpcClient::new(&sock_path);
    match client.send_command(IpcRequest::Status).await {
        Ok(IpcResponse::Status {
            running,
            pomodoro,
            active_domain,
            tracked_domains,
            image_blocking,
        }) => {
            println!(
                "Daemon Status: {}",
                if running { "Running" } else { "Stopped" }
            );

            println!("\nPomodoro:");
            if pomodoro.running {
                let phase = if pomodoro.on_break { "Break" } else { "Focus" };
                println!("  Phase: {phase}");
                println!("  Remaining: {}", clock(pomodoro.remaining_seconds));
            } else {
                println!("  Idle ({} focus)", clock(pomodoro.focus_seconds));
            }

            println!("\nDwell Tracking:");
            println!(
                "  Foreground: {}",
                active_domain.unwrap_or_else(|| "None".to_string())
            );
            println!("  Domains this run: {tracked_domains}");

            println!(
                "\nImage Blocking: {}",
                if image_blocking { "On" } else { "Off" }
            );
        }
        Ok(_) => anyhow::bail!("Unexpected response from daemon"),
        Err(e) => {
            log::error!("Failed to get status: {e}");
            println!("Daemon Status: Not running (or not responding)");
        }
    }
    Ok(())
}

fn setup_daemon_logging() -> Result<()> {
    let log_path = get_data_dir()?.join("stayzen.log");
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_pid_rejects_missing_or_garbage_pid_files() {
        let dir = tempfile::tempdir().unwrap();
        let pid_path = dir.path().join("stayzen.pid");
        assert_eq!(running_pid(&pid_path), None);

        fs::write(&pid_path, "not-a-pid").unwrap();
        assert_eq!(running_pid(&pid_path), None);
    }

    #[test]
    fn runtime_file_cleanup_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let pid_path = dir.path().join("stayzen.pid");
        let sock_path = dir.path().join("stayzen.sock");

        remove_runtime_files(&pid_path, &sock_path).unwrap();

        fs::write(&pid_path, "1234").unwrap();
        remove_runtime_files(&pid_path, &sock_path).unwrap();
        assert!(!pid_path.exists());
    }
}

/// Page-agent attachment: receive pushed page commands over a
/// long-lived connection, the way an in-page script would.
use anyhow::{Context, Result};
use std::path::Path;
use stayzen_core::ipc::{read_frame, IpcClient};
use stayzen_core::PageCommand;

pub async fn watch(sock_path: &Path, tab_id: u32) -> Result<()> {
    let client = IpcClient::new(sock_path);
    let mut stream = client
        .register_agent(tab_id)
        .await
        .context("Could not reach the daemon. Is it running? Try 'stayzen start'")?;

    println!("Attached as page agent for tab {tab_id}. Waiting for commands (Ctrl-C to exit)...");

    while let Some(command) = read_frame::<_, PageCommand>(&mut stream).await? {
        match command {
            PageCommand::ShowTimeWarning {
                domain,
                total_minutes,
                quote,
            } => {
                println!("[warning] {total_minutes} minutes on {domain}: {quote}");
            }
            PageCommand::ShowPomodoroModal { title, message, .. } => {
                println!("[modal] {title} {message}");
            }
            PageCommand::ToggleImages { enabled } => {
                println!("[images] blocking {}", if enabled { "on" } else { "off" });
            }
        }
    }

    println!("Daemon closed the connection.");
    Ok(())
}

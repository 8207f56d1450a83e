/// Blocklist and image-blocking commands
use anyhow::Result;
use std::path::Path;
use stayzen_core::ipc::{IpcRequest, IpcResponse};
use stayzen_storage::Database;
use tabled::{Table, Tabled};

use super::helpers::send;

#[derive(Tabled)]
struct BlockedSiteRow {
    #[tabled(rename = "Blocked Site")]
    site: String,
}

pub fn add(site: &str) -> Result<()> {
    let db = Database::new(None)?;
    if db.add_blocked_site(site)? {
        println!("Blocked: {site}");
    } else {
        println!("Already blocked: {site}");
    }
    Ok(())
}

pub fn remove(site: &str) -> Result<()> {
    let db = Database::new(None)?;
    if db.remove_blocked_site(site)? {
        println!("Unblocked: {site}");
    } else {
        println!("Not on the blocklist: {site}");
    }
    Ok(())
}

pub fn list() -> Result<()> {
    let db = Database::new(None)?;
    let sites = db.get_blocked_sites()?;
    if sites.is_empty() {
        println!("The blocklist is empty.");
        return Ok(());
    }

    let rows: Vec<BlockedSiteRow> = sites.into_iter().map(|site| BlockedSiteRow { site }).collect();
    println!("{}", Table::new(rows));
    Ok(())
}

pub async fn check(sock_path: &Path, url: &str) -> Result<()> {
    match send(sock_path, IpcRequest::CheckBlocked { url: url.to_string() }).await? {
        IpcResponse::Blocked { is_blocked } => {
            if is_blocked {
                println!("Blocked: {url}");
            } else {
                println!("Allowed: {url}");
            }
            Ok(())
        }
        other => anyhow::bail!("Unexpected response from daemon: {other:?}"),
    }
}

pub async fn set_image_blocking(sock_path: &Path, enabled: bool) -> Result<()> {
    match send(sock_path, IpcRequest::ImageBlockingChanged { enabled }).await {
        Ok(IpcResponse::Ack { success: true }) => {
            println!("Image blocking {}.", if enabled { "on" } else { "off" });
            Ok(())
        }
        Ok(other) => anyhow::bail!("Unexpected response from daemon: {other:?}"),
        Err(e) => {
            // No daemon: update the durable flag so the next run picks it up
            log::debug!("Daemon unreachable ({e:#}); writing flag directly");
            let db = Database::new(None)?;
            db.set_image_blocking_enabled(enabled)?;
            println!(
                "Image blocking {} (daemon not running; applies on next start).",
                if enabled { "on" } else { "off" }
            );
            Ok(())
        }
    }
}

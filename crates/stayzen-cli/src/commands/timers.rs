/// Per-site dwell timer display
use anyhow::Result;
use std::path::Path;
use stayzen_core::ipc::{IpcRequest, IpcResponse};
use tabled::{Table, Tabled};

use super::helpers::send;

#[derive(Tabled)]
struct SiteTimerRow {
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Time (minutes)")]
    minutes: u64,
}

pub async fn show(sock_path: &Path) -> Result<()> {
    match send(sock_path, IpcRequest::GetSiteTimers).await? {
        IpcResponse::SiteTimers { timers } => {
            if timers.is_empty() {
                println!("No sites tracked yet this run.");
                return Ok(());
            }

            let mut rows: Vec<(f64, SiteTimerRow)> = timers
                .into_iter()
                .map(|(site, snapshot)| {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let minutes = (snapshot.total_seconds / 60.0).floor() as u64;
                    (snapshot.total_seconds, SiteTimerRow { site, minutes })
                })
                .collect();
            rows.sort_by(|a, b| b.0.total_cmp(&a.0));

            let table = Table::new(rows.into_iter().map(|(_, row)| row)).to_string();
            println!("{table}");
            Ok(())
        }
        other => anyhow::bail!("Unexpected response from daemon: {other:?}"),
    }
}

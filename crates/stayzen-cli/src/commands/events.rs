/// Host-runtime event forwarding (tab changes, browser focus)
use anyhow::Result;
use std::path::Path;
use stayzen_core::ipc::{IpcRequest, IpcResponse};

use super::helpers::send;

pub async fn tab_activated(sock_path: &Path, tab_id: u32, url: String) -> Result<()> {
    match send(sock_path, IpcRequest::TabActivated { tab_id, url }).await? {
        IpcResponse::Ack { .. } => Ok(()),
        other => anyhow::bail!("Unexpected response from daemon: {other:?}"),
    }
}

pub async fn focus_changed(sock_path: &Path, focused: bool) -> Result<()> {
    match send(sock_path, IpcRequest::BrowserFocusChanged { focused }).await? {
        IpcResponse::Ack { .. } => Ok(()),
        other => anyhow::bail!("Unexpected response from daemon: {other:?}"),
    }
}

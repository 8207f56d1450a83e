use anyhow::{Context, Result};
use std::path::Path;
use stayzen_core::ipc::{IpcClient, IpcRequest, IpcResponse};

/// Send one request to the daemon, mapping connection failures to a
/// user-facing hint.
pub async fn send(sock_path: &Path, request: IpcRequest) -> Result<IpcResponse> {
    IpcClient::new(sock_path)
        .send_command(request)
        .await
        .context("Could not reach the daemon. Is it running? Try 'stayzen start'")
}

/// Render seconds as a mm:ss clock.
#[must_use]
pub fn clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formats_minutes_and_seconds() {
        assert_eq!(clock(0), "00:00");
        assert_eq!(clock(59), "00:59");
        assert_eq!(clock(60), "01:00");
        assert_eq!(clock(1500), "25:00");
        assert_eq!(clock(3725), "62:05");
    }
}

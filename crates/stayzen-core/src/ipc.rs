use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
};

use crate::coordinator::Coordinator;
use crate::pomodoro::PomodoroSnapshot;
use crate::tracker::SiteTimerSnapshot;

/// Request from a control surface or page agent to the coordinator.
#[derive(Serialize, Deserialize, Debug)]
pub enum IpcRequest {
    StartPomodoro,
    StopPomodoro,
    GetPomodoroState,
    GetSiteTimers,
    CheckBlocked { url: String },
    GetBlockerQuote,
    ReloadSettings,
    ImageBlockingChanged { enabled: bool },
    /// Host-runtime tab events feeding the dwell tracker.
    TabActivated { tab_id: u32, url: String },
    TabNavigated { tab_id: u32, url: String },
    BrowserFocusChanged { focused: bool },
    /// Keep this connection open and push page commands over it.
    RegisterAgent { tab_id: u32 },
    Status,
    Shutdown,
}

/// Response from the coordinator.
#[derive(Serialize, Deserialize, Debug)]
pub enum IpcResponse {
    Pomodoro {
        success: bool,
        state: PomodoroSnapshot,
    },
    PomodoroState {
        state: PomodoroSnapshot,
    },
    SiteTimers {
        timers: HashMap<String, SiteTimerSnapshot>,
    },
    Blocked {
        is_blocked: bool,
    },
    BlockerQuote {
        quote: String,
    },
    Ack {
        success: bool,
    },
    Status {
        running: bool,
        pomodoro: PomodoroSnapshot,
        active_domain: Option<String>,
        tracked_domains: usize,
        image_blocking: bool,
    },
    Shutdown,
    /// Unknown or undecodable request.
    Error {
        message: String,
    },
}

/// Largest frame accepted off the wire. Requests and page commands are
/// tiny; anything near this is a corrupt length prefix.
const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Write one length-prefixed bincode frame.
///
/// # Errors
///
/// Returns an error if serialization or the socket write fails
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
    T: Serialize,
{
    let encoded = bincode::serialize(value)?;
    let len = u32::try_from(encoded.len())?;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(&encoded).await?;
    Ok(())
}

/// Read one length-prefixed bincode frame. Returns `None` on a clean
/// end of stream.
///
/// # Errors
///
/// Returns an error if the socket read or deserialization fails
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncReadExt + Unpin,
    T: DeserializeOwned,
{
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(len_bytes) as usize;
    if len > MAX_FRAME_BYTES {
        anyhow::bail!("Frame length {len} exceeds {MAX_FRAME_BYTES} bytes");
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(Some(bincode::deserialize(&buf)?))
}

#[derive(Debug)]
pub struct IpcClient {
    sock_path: PathBuf,
}

impl IpcClient {
    #[must_use]
    pub fn new(sock_path: &Path) -> Self {
        Self {
            sock_path: sock_path.to_path_buf(),
        }
    }

    /// Send one request and wait for the coordinator's response.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon is unreachable or the exchange
    /// cannot be encoded/decoded
    pub async fn send_command(&self, request: IpcRequest) -> Result<IpcResponse> {
        let mut stream = UnixStream::connect(&self.sock_path).await?;

        write_frame(&mut stream, &request).await?;
        stream.shutdown().await?;

        match read_frame(&mut stream).await? {
            Some(response) => Ok(response),
            None => anyhow::bail!("Daemon closed the connection without a response"),
        }
    }

    /// Register as a page agent and hand the open stream back to the
    /// caller for reading page-command frames.
    ///
    /// # Errors
    ///
    /// Returns an error if the daemon is unreachable
    pub async fn register_agent(&self, tab_id: u32) -> Result<UnixStream> {
        let mut stream = UnixStream::connect(&self.sock_path).await?;
        write_frame(&mut stream, &IpcRequest::RegisterAgent { tab_id }).await?;
        Ok(stream)
    }
}

/// Accept-loop for the coordinator's socket. Each connection carries
/// one request, except agent registrations which stay open for
/// page-command delivery.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound
pub async fn listen(coordinator: Arc<Coordinator>, sock_path: &Path) -> io::Result<()> {
    if sock_path.exists() {
        fs::remove_file(sock_path)?;
    }
    if let Some(parent) = sock_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let listener = UnixListener::bind(sock_path)?;

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(&coordinator, stream).await {
                        log::error!("IPC handle error: {e}");
                    }
                });
            }
            Err(e) => {
                log::error!("IPC accept error: {e}");
            }
        }
    }
}

async fn serve_connection(coordinator: &Arc<Coordinator>, mut stream: UnixStream) -> Result<()> {
    match read_frame::<_, IpcRequest>(&mut stream).await {
        Ok(None) => Ok(()),
        Ok(Some(IpcRequest::RegisterAgent { tab_id })) => {
            coordinator.attach_agent(tab_id, stream).await;
            Ok(())
        }
        Ok(Some(request)) => {
            let response = coordinator.handle_request(request).await;
            write_frame(&mut stream, &response).await
        }
        Err(e) => {
            // Closed protocol: anything we cannot decode gets an
            // explicit error payload instead of silence
            log::warn!("IPC deserialize error: {e}");
            let response = IpcResponse::Error {
                message: String::from("Unknown action"),
            };
            write_frame(&mut stream, &response).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_round_trip_through_bincode() {
        let request = IpcRequest::CheckBlocked {
            url: String::from("https://example.com/"),
        };
        let bytes = bincode::serialize(&request).unwrap();
        let decoded: IpcRequest = bincode::deserialize(&bytes).unwrap();
        match decoded {
            IpcRequest::CheckBlocked { url } => assert_eq!(url, "https://example.com/"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn garbage_bytes_do_not_decode() {
        let garbage = [0xff_u8; 16];
        assert!(bincode::deserialize::<IpcRequest>(&garbage).is_err());
    }

    #[tokio::test]
    async fn frames_survive_fragmented_transport() {
        // A 4-byte pipe forces every frame through many short reads
        let (a, mut b) = tokio::io::duplex(4);
        let url = String::from("https://example.com/some/long/enough/path");
        let request = IpcRequest::CheckBlocked { url: url.clone() };

        let writer = tokio::spawn(async move {
            let mut a = a;
            write_frame(&mut a, &request).await.unwrap();
        });

        let decoded: Option<IpcRequest> = read_frame(&mut b).await.unwrap();
        match decoded {
            Some(IpcRequest::CheckBlocked { url: decoded_url }) => assert_eq!(decoded_url, url),
            other => panic!("unexpected request: {other:?}"),
        }
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn oversized_frame_lengths_are_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&u32::MAX.to_le_bytes()).await.unwrap();

        let result = read_frame::<_, IpcRequest>(&mut b).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn page_command_frames_round_trip() {
        use crate::notify::PageCommand;

        let (mut a, mut b) = tokio::io::duplex(256);
        let command = PageCommand::ToggleImages { enabled: true };
        write_frame(&mut a, &command).await.unwrap();
        drop(a);

        let decoded: Option<PageCommand> = read_frame(&mut b).await.unwrap();
        assert_eq!(decoded, Some(command));
        let eof: Option<PageCommand> = read_frame(&mut b).await.unwrap();
        assert_eq!(eof, None);
    }
}

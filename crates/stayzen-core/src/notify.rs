//! Notification dispatch: page-agent delivery with OS-level fallback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixStream;
use tokio::sync::Mutex;

use crate::ipc::write_frame;

/// Which pomodoro handoff a modal announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModalKind {
    FocusComplete,
    BreakOver,
}

/// Fire-and-forget command pushed to page agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageCommand {
    ShowTimeWarning {
        domain: String,
        total_minutes: u64,
        quote: String,
    },
    ShowPomodoroModal {
        kind: ModalKind,
        title: String,
        message: String,
        duration_ms: u64,
    },
    ToggleImages {
        enabled: bool,
    },
}

/// Delivery seam between the coordinator and its page agents.
///
/// Page agents are stateless collaborators; delivery is best effort
/// and failures are never surfaced to the user.
#[async_trait]
pub trait PageBus: Send + Sync {
    /// Adopt a page agent's connection for command delivery.
    async fn attach(&self, tab_id: u32, stream: UnixStream);

    /// Push a command to every attached agent. Returns how many agents
    /// it reached; agents whose connection is gone are dropped.
    async fn broadcast(&self, command: &PageCommand) -> usize;

    /// OS-level notification surface, used as a fallback for
    /// phase-completion notices when no page is reachable.
    fn notify_os(&self, title: &str, body: &str);
}

struct Agent {
    tab_id: u32,
    writer: OwnedWriteHalf,
}

/// Production [`PageBus`]: registered agent sockets plus desktop
/// notifications.
#[derive(Default)]
pub struct AgentRegistry {
    agents: Mutex<Vec<Agent>>,
}

impl AgentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PageBus for AgentRegistry {
    async fn attach(&self, tab_id: u32, stream: UnixStream) {
        let (_, writer) = stream.into_split();
        let mut agents = self.agents.lock().await;
        // A re-registering tab replaces its previous connection
        agents.retain(|agent| agent.tab_id != tab_id);
        agents.push(Agent { tab_id, writer });
        log::info!("Page agent attached for tab {tab_id} ({} total)", agents.len());
    }

    async fn broadcast(&self, command: &PageCommand) -> usize {
        let mut agents = self.agents.lock().await;
        let mut alive = Vec::with_capacity(agents.len());
        let mut delivered = 0;
        for mut agent in agents.drain(..) {
            match write_frame(&mut agent.writer, command).await {
                Ok(()) => {
                    delivered += 1;
                    alive.push(agent);
                }
                Err(e) => {
                    // Page closed or navigated away; drop it quietly
                    log::debug!("Dropping page agent for tab {}: {e}", agent.tab_id);
                }
            }
        }
        *agents = alive;
        delivered
    }

    fn notify_os(&self, title: &str, body: &str) {
        let _ = notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .appname("stayzen")
            .show();
    }
}

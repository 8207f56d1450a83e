pub mod blocker;
pub mod config;
pub mod coordinator;
pub mod ipc;
pub mod notify;
pub mod pomodoro;
pub mod tracker;

pub use coordinator::Coordinator;
pub use notify::{AgentRegistry, ModalKind, PageBus, PageCommand};
pub use pomodoro::{Phase, PomodoroSession, PomodoroSnapshot};
pub use tracker::{DwellTracker, DwellWarning};

//! The session coordinator: pomodoro cycling, dwell tracking, blocking
//! and message handling, all behind a single owned state struct.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::{net::UnixStream, sync::Mutex, task::JoinHandle, time};

use stayzen_storage::{db::local_date_string, Database, Settings};

use crate::blocker::{self, InterceptRules};
use crate::config;
use crate::ipc::{self, IpcRequest, IpcResponse};
use crate::notify::{ModalKind, PageBus, PageCommand};
use crate::pomodoro::{PhaseEvent, PomodoroSession};
use crate::tracker::DwellTracker;

const TICK_INTERVAL: Duration = Duration::from_secs(1);
/// Delay before images are forcibly re-blocked after a permissive toggle.
pub const REARM_DELAY: Duration = Duration::from_secs(60);
const MODAL_DURATION_MS: u64 = 5000;

/// All mutable coordinator state, touched only under one lock.
struct CoordinatorState {
    pomodoro: PomodoroSession,
    tracker: DwellTracker,
    rules: InterceptRules,
    /// In-memory settings mirror; source of truth between reloads.
    settings: Settings,
}

/// Long-lived process-wide coordinator.
///
/// The pomodoro ticker, tracking ticker and auto-block re-arm timer are
/// independent cancellable tasks; spawning a new one of a kind always
/// aborts the prior handle first.
pub struct Coordinator {
    state: Mutex<CoordinatorState>,
    database: Arc<Database>,
    pages: Arc<dyn PageBus>,
    pomodoro_ticker: Mutex<Option<JoinHandle<()>>>,
    tracking_ticker: Mutex<Option<JoinHandle<()>>>,
    rearm_timer: Mutex<Option<JoinHandle<()>>>,
    shutdown_signal: AtomicBool,
}

impl Coordinator {
    /// Build the coordinator, loading the settings mirror and the
    /// image-blocking flag from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial store reads fail
    pub fn new(database: Arc<Database>, pages: Arc<dyn PageBus>) -> Result<Arc<Self>> {
        let settings = database.get_settings()?;
        let image_blocking = database.image_blocking_enabled()?;

        let state = CoordinatorState {
            pomodoro: PomodoroSession::new(settings.focus_seconds(), settings.break_seconds()),
            tracker: DwellTracker::new(),
            rules: InterceptRules::new(image_blocking),
            settings,
        };

        Ok(Arc::new(Self {
            state: Mutex::new(state),
            database,
            pages,
            pomodoro_ticker: Mutex::new(None),
            tracking_ticker: Mutex::new(None),
            rearm_timer: Mutex::new(None),
            shutdown_signal: AtomicBool::new(false),
        }))
    }

    /// Serve IPC and run until Ctrl-C or a Shutdown request.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined
    pub async fn run_with_signals(self: &Arc<Self>) -> Result<()> {
        let sock_path = config::get_data_dir()?.join("stayzen.sock");
        let listener_self = Arc::clone(self);

        tokio::spawn(async move {
            if let Err(e) = ipc::listen(listener_self, &sock_path).await {
                log::error!("IPC listener failed: {e}");
            }
        });

        let mut interval = time::interval(TICK_INTERVAL);
        log::info!("Coordinator started with signal handling and IPC");

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received Ctrl-C, shutting down...");
                    self.shutdown_signal.store(true, Ordering::SeqCst);
                }
            }

            if self.shutdown_signal.load(Ordering::SeqCst) {
                break;
            }
        }

        // Stop the periodic work and flush the foreground domain
        Self::cancel(&self.pomodoro_ticker).await;
        Self::cancel(&self.tracking_ticker).await;
        Self::cancel(&self.rearm_timer).await;
        self.state.lock().await.tracker.clear_foreground(Utc::now());
        log::info!("Coordinator shut down gracefully.");
        Ok(())
    }

    /// Dispatch one request from a control surface or page agent.
    pub async fn handle_request(self: &Arc<Self>, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::StartPomodoro => self.start_pomodoro().await,
            IpcRequest::StopPomodoro => self.stop_pomodoro().await,
            IpcRequest::GetPomodoroState => {
                let st = self.state.lock().await;
                IpcResponse::PomodoroState {
                    state: st.pomodoro.snapshot(),
                }
            }
            IpcRequest::GetSiteTimers => {
                let st = self.state.lock().await;
                IpcResponse::SiteTimers {
                    timers: st.tracker.snapshot(Utc::now()),
                }
            }
            IpcRequest::CheckBlocked { url } => self.check_blocked(&url).await,
            IpcRequest::GetBlockerQuote => {
                let st = self.state.lock().await;
                IpcResponse::BlockerQuote {
                    quote: st.settings.blocker_quote.clone(),
                }
            }
            IpcRequest::ReloadSettings => self.reload_settings().await,
            IpcRequest::ImageBlockingChanged { enabled } => {
                self.image_blocking_changed(enabled).await
            }
            IpcRequest::TabActivated { tab_id, url } | IpcRequest::TabNavigated { tab_id, url } => {
                self.set_foreground_at(tab_id, &url, Utc::now()).await;
                IpcResponse::Ack { success: true }
            }
            IpcRequest::BrowserFocusChanged { focused } => {
                self.browser_focus_changed(focused).await;
                IpcResponse::Ack { success: true }
            }
            IpcRequest::RegisterAgent { tab_id } => {
                // Registration is handled by the listener, which keeps
                // the connection open; it cannot arrive here
                log::warn!("Stray RegisterAgent for tab {tab_id}");
                IpcResponse::Error {
                    message: String::from("RegisterAgent must keep its connection open"),
                }
            }
            IpcRequest::Status => self.status().await,
            IpcRequest::Shutdown => {
                self.shutdown_signal.store(true, Ordering::SeqCst);
                IpcResponse::Shutdown
            }
        }
    }

    /// Hand a page agent's connection to the page bus.
    pub async fn attach_agent(&self, tab_id: u32, stream: UnixStream) {
        self.pages.attach(tab_id, stream).await;
    }

    // ==================== Pomodoro ====================

    async fn start_pomodoro(self: &Arc<Self>) -> IpcResponse {
        let (started, state) = {
            let mut st = self.state.lock().await;
            let started = st.pomodoro.start();
            (started, st.pomodoro.snapshot())
        };
        if started {
            self.spawn_pomodoro_ticker().await;
            log::info!("Pomodoro started");
        }
        IpcResponse::Pomodoro {
            success: true,
            state,
        }
    }

    async fn stop_pomodoro(&self) -> IpcResponse {
        let state = {
            let mut st = self.state.lock().await;
            st.pomodoro.stop();
            // Pick up durations changed while the countdown was running
            let focus = st.settings.focus_seconds();
            let brk = st.settings.break_seconds();
            st.pomodoro.apply_durations(focus, brk);
            st.pomodoro.snapshot()
        };
        Self::cancel(&self.pomodoro_ticker).await;
        log::info!("Pomodoro stopped");
        IpcResponse::Pomodoro {
            success: true,
            state,
        }
    }

    async fn spawn_pomodoro_ticker(self: &Arc<Self>) {
        let mut guard = self.pomodoro_ticker.lock().await;
        if let Some(handle) = guard.take() {
            handle.abort();
        }
        let this = Arc::clone(self);
        *guard = Some(tokio::spawn(async move {
            let mut interval = time::interval(TICK_INTERVAL);
            interval.tick().await; // the first tick completes immediately
            loop {
                interval.tick().await;
                if !this.pomodoro_tick().await {
                    break;
                }
            }
        }));
    }

    /// One second of countdown. Returns false once the session is no
    /// longer running.
    async fn pomodoro_tick(&self) -> bool {
        let (event, credit_seconds) = {
            let mut st = self.state.lock().await;
            if !st.pomodoro.is_running() {
                return false;
            }
            let event = st.pomodoro.tick();
            (event, u64::from(st.pomodoro.focus_seconds()))
        };

        match event {
            Some(PhaseEvent::FocusComplete) => {
                // Only completed focus phases count toward daily stats
                if let Err(e) = self
                    .database
                    .add_focus_seconds(credit_seconds, &local_date_string())
                {
                    log::warn!("Failed to credit focus time: {e:#}");
                }
                self.send_phase_modal(ModalKind::FocusComplete).await;
            }
            Some(PhaseEvent::BreakOver) => {
                self.send_phase_modal(ModalKind::BreakOver).await;
            }
            None => {}
        }
        true
    }

    async fn send_phase_modal(&self, kind: ModalKind) {
        let (title, message) = {
            let st = self.state.lock().await;
            match kind {
                ModalKind::FocusComplete => (
                    "Focus Session Complete!",
                    st.settings.break_quote.clone(),
                ),
                ModalKind::BreakOver => ("Break Over!", st.settings.focus_quote.clone()),
            }
        };
        let command = PageCommand::ShowPomodoroModal {
            kind,
            title: title.to_string(),
            message: message.clone(),
            duration_ms: MODAL_DURATION_MS,
        };
        if self.pages.broadcast(&command).await == 0 {
            // No page reachable; phase notices fall back to the OS
            self.pages.notify_os(title, &message);
        }
    }

    // ==================== Dwell tracking ====================

    async fn set_foreground_at(self: &Arc<Self>, tab_id: u32, url: &str, now: DateTime<Utc>) {
        let tracking = {
            let mut st = self.state.lock().await;
            st.tracker.set_foreground(tab_id, url, now)
        };
        if tracking {
            self.spawn_tracking_ticker().await;
        } else {
            Self::cancel(&self.tracking_ticker).await;
        }
    }

    async fn browser_focus_changed(&self, focused: bool) {
        if focused {
            // Tracking resumes on the next tab activation/navigation;
            // the foreground tab is unknown until then
            return;
        }
        {
            let mut st = self.state.lock().await;
            st.tracker.clear_foreground(Utc::now());
        }
        Self::cancel(&self.tracking_ticker).await;
        log::debug!("Browser lost focus; dwell tracking halted");
    }

    async fn spawn_tracking_ticker(self: &Arc<Self>) {
        let mut guard = self.tracking_ticker.lock().await;
        if let Some(handle) = guard.take() {
            handle.abort();
        }
        let this = Arc::clone(self);
        *guard = Some(tokio::spawn(async move {
            let mut interval = time::interval(TICK_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                if !this.tracking_tick_at(Utc::now()).await {
                    break;
                }
            }
        }));
    }

    /// One second of dwell tracking: flush, then evaluate the warning
    /// condition. Returns false once nothing is foregrounded.
    async fn tracking_tick_at(&self, now: DateTime<Utc>) -> bool {
        let (warning, quote) = {
            let mut st = self.state.lock().await;
            if st.tracker.active_tab().is_none() {
                return false;
            }
            let threshold = st.settings.warning_threshold_seconds();
            let enabled = st.settings.warnings_enabled;
            (
                st.tracker.tick(now, threshold, enabled),
                st.settings.warning_quote.clone(),
            )
        };

        if let Some(warning) = warning {
            log::info!(
                "Dwell warning: {} at {} minutes",
                warning.domain,
                warning.total_minutes
            );
            let command = PageCommand::ShowTimeWarning {
                domain: warning.domain,
                total_minutes: warning.total_minutes,
                quote,
            };
            if self.pages.broadcast(&command).await == 0 {
                log::debug!("No page agent reachable for time warning");
            }
        }
        true
    }

    // ==================== Blocking ====================

    async fn check_blocked(&self, url: &str) -> IpcResponse {
        let sites = match self.database.get_blocked_sites() {
            Ok(sites) => sites,
            Err(e) => return Self::store_error(&e),
        };
        let is_blocked = blocker::is_blocked(url, &sites);
        if is_blocked {
            if let Err(e) = self.database.record_site_blocked(&local_date_string()) {
                log::warn!("Failed to record blocked site: {e:#}");
            }
        }
        IpcResponse::Blocked { is_blocked }
    }

    async fn image_blocking_changed(self: &Arc<Self>, enabled: bool) -> IpcResponse {
        if let Err(e) = self.database.set_image_blocking_enabled(enabled) {
            return Self::store_error(&e);
        }
        let auto_block = {
            let mut st = self.state.lock().await;
            st.rules.set_image_blocking(enabled);
            st.settings.auto_block_images
        };
        self.pages
            .broadcast(&PageCommand::ToggleImages { enabled })
            .await;

        if enabled {
            Self::cancel(&self.rearm_timer).await;
        } else if auto_block {
            self.arm_reblock().await;
        }
        IpcResponse::Ack { success: true }
    }

    async fn arm_reblock(self: &Arc<Self>) {
        let mut guard = self.rearm_timer.lock().await;
        if let Some(handle) = guard.take() {
            handle.abort();
        }
        log::info!(
            "Images unblocked; re-arming automatically in {}s",
            REARM_DELAY.as_secs()
        );
        let this = Arc::clone(self);
        let delay = time::sleep(REARM_DELAY);
        *guard = Some(tokio::spawn(async move {
            delay.await;
            this.force_reblock().await;
        }));
    }

    async fn force_reblock(&self) {
        if let Err(e) = self.database.set_image_blocking_enabled(true) {
            log::warn!("Failed to persist image-blocking flag: {e:#}");
        }
        {
            let mut st = self.state.lock().await;
            st.rules.set_image_blocking(true);
        }
        log::info!("Auto-block timer elapsed; images re-blocked");
        self.pages
            .broadcast(&PageCommand::ToggleImages { enabled: true })
            .await;
    }

    // ==================== Settings ====================

    async fn reload_settings(&self) -> IpcResponse {
        let settings = match self.database.get_settings() {
            Ok(settings) => settings,
            Err(e) => return Self::store_error(&e),
        };
        let image_blocking = match self.database.image_blocking_enabled() {
            Ok(flag) => flag,
            Err(e) => return Self::store_error(&e),
        };

        let mut st = self.state.lock().await;
        st.settings = settings;
        if !st.pomodoro.is_running() {
            let focus = st.settings.focus_seconds();
            let brk = st.settings.break_seconds();
            st.pomodoro.apply_durations(focus, brk);
        }
        // Safe against ticks in flight: totals only ever grow
        st.tracker.reset_warning_marks();
        st.rules.set_image_blocking(image_blocking);
        // A pending auto-block re-arm is deliberately left alone: the
        // auto_block_images flag gates arming, not firing
        log::info!("Settings reloaded");
        IpcResponse::Ack { success: true }
    }

    async fn status(&self) -> IpcResponse {
        let st = self.state.lock().await;
        IpcResponse::Status {
            running: true,
            pomodoro: st.pomodoro.snapshot(),
            active_domain: st.tracker.active_tab().map(|tab| tab.domain.clone()),
            tracked_domains: st.tracker.tracked_domains(),
            image_blocking: st.rules.image_blocking(),
        }
    }

    // ==================== Helpers ====================

    async fn cancel(slot: &Mutex<Option<JoinHandle<()>>>) {
        if let Some(handle) = slot.lock().await.take() {
            handle.abort();
        }
    }

    fn store_error(e: &anyhow::Error) -> IpcResponse {
        log::error!("Store access failed: {e:#}");
        IpcResponse::Error {
            message: format!("{e:#}"),
        }
    }
}

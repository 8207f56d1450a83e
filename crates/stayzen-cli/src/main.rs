mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use stayzen_core::config::get_data_dir;

use commands::{agent, block, daemon, events, pomodoro, settings, stats, timers};

#[derive(Parser)]
#[command(name = "stayzen")]
#[command(about = "Focus sessions, dwell warnings and distraction blocking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the coordinator daemon
    Start,
    /// (Internal) Run the daemon process
    #[command(hide = true)]
    DaemonInternalStart,
    /// Stop the coordinator daemon
    Stop,
    /// Check daemon status
    Status,
    /// Pomodoro session control
    Pomodoro {
        #[command(subcommand)]
        action: PomodoroAction,
    },
    /// Manage the site blocklist
    Block {
        #[command(subcommand)]
        action: BlockAction,
    },
    /// Show per-site dwell timers for this daemon run
    Timers,
    /// Image blocking control
    Images {
        #[command(subcommand)]
        action: ImagesAction,
    },
    /// View or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Show today's focus and blocking statistics
    Stats,
    /// Report a foregrounded tab to the daemon
    Tab {
        /// Tab identifier assigned by the host runtime
        tab_id: u32,
        /// URL now shown in the tab
        url: String,
    },
    /// Report a browser focus change to the daemon
    Focus {
        #[command(subcommand)]
        action: FocusAction,
    },
    /// Attach as a page agent and print pushed commands
    Watch {
        /// Tab identifier to register under
        tab_id: u32,
    },
}

#[derive(Subcommand, Debug)]
enum PomodoroAction {
    /// Start the countdown
    Start,
    /// Stop the countdown and reset to a full focus phase
    Stop,
    /// Show the current countdown state
    Show,
}

#[derive(Subcommand, Debug)]
enum BlockAction {
    /// Add a site to the blocklist (matched as a hostname substring)
    Add {
        /// Site to block, e.g. "example.com"
        site: String,
    },
    /// Remove a site from the blocklist
    Remove {
        /// Site to unblock
        site: String,
    },
    /// List blocked sites
    List,
    /// Ask the daemon whether a URL would be blocked
    Check {
        /// Full URL to test
        url: String,
    },
}

#[derive(Subcommand, Debug)]
enum ImagesAction {
    /// Enable image blocking
    On,
    /// Disable image blocking (may auto re-arm, see settings)
    Off,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Show current settings
    Show,
    /// Change settings; unspecified fields keep their value
    Set(SettingsUpdate),
}

#[derive(Args, Debug)]
struct SettingsUpdate {
    /// Focus phase length in minutes (1-120)
    #[arg(long)]
    focus: Option<u32>,
    /// Break phase length in minutes (1-60)
    #[arg(long = "break")]
    break_minutes: Option<u32>,
    /// Dwell-warning threshold in minutes (1-240)
    #[arg(long)]
    warning: Option<u32>,
    /// Enable or disable dwell warnings
    #[arg(long)]
    warnings: Option<bool>,
    /// Re-arm image blocking a minute after it is switched off
    #[arg(long)]
    auto_block_images: Option<bool>,
    /// Quote shown on the block page (200 characters max)
    #[arg(long)]
    blocker_quote: Option<String>,
    /// Quote shown when a break ends
    #[arg(long)]
    focus_quote: Option<String>,
    /// Quote shown when a focus phase completes
    #[arg(long)]
    break_quote: Option<String>,
    /// Quote shown with dwell warnings
    #[arg(long)]
    warning_quote: Option<String>,
}

#[derive(Subcommand, Debug)]
enum FocusAction {
    /// The browser regained focus
    Gained,
    /// The browser lost focus; dwell tracking halts
    Lost,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !matches!(cli.command, Commands::DaemonInternalStart) {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .init();
    }

    let data_dir = get_data_dir()?;
    let sock_path = data_dir.join("stayzen.sock");

    match cli.command {
        Commands::Start => daemon::start_daemon(&data_dir),
        Commands::DaemonInternalStart => daemon::run_daemon_process().await,
        Commands::Stop => daemon::stop_daemon(&data_dir).await,
        Commands::Status => daemon::show_status(&data_dir).await,
        Commands::Pomodoro { action } => match action {
            PomodoroAction::Start => pomodoro::start(&sock_path).await,
            PomodoroAction::Stop => pomodoro::stop(&sock_path).await,
            PomodoroAction::Show => pomodoro::show(&sock_path).await,
        },
        Commands::Block { action } => match action {
            BlockAction::Add { site } => block::add(&site),
            BlockAction::Remove { site } => block::remove(&site),
            BlockAction::List => block::list(),
            BlockAction::Check { url } => block::check(&sock_path, &url).await,
        },
        Commands::Timers => timers::show(&sock_path).await,
        Commands::Images { action } => {
            let enabled = matches!(action, ImagesAction::On);
            block::set_image_blocking(&sock_path, enabled).await
        }
        Commands::Settings { action } => match action {
            SettingsAction::Show => settings::show(),
            SettingsAction::Set(update) => settings::set(&sock_path, &update).await,
        },
        Commands::Stats => stats::show(),
        Commands::Tab { tab_id, url } => events::tab_activated(&sock_path, tab_id, url).await,
        Commands::Focus { action } => {
            let focused = matches!(action, FocusAction::Gained);
            events::focus_changed(&sock_path, focused).await
        }
        Commands::Watch { tab_id } => agent::watch(&sock_path, tab_id).await,
    }
}

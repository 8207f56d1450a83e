/// Settings display and modification
use anyhow::Result;
use std::path::Path;
use stayzen_core::ipc::IpcRequest;
use stayzen_storage::Database;

use super::helpers::send;
use crate::SettingsUpdate;

pub fn show() -> Result<()> {
    let db = Database::new(None)?;
    let settings = db.get_settings()?;

    println!("Timers:");
    println!("  Focus: {} minutes", settings.focus_minutes);
    println!("  Break: {} minutes", settings.break_minutes);
    println!("  Dwell warning after: {} minutes", settings.warning_minutes);
    println!(
        "  Dwell warnings: {}",
        if settings.warnings_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "  Auto re-arm image blocking: {}",
        if settings.auto_block_images {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("\nQuotes:");
    println!("  Block page: {}", settings.blocker_quote);
    println!("  Focus: {}", settings.focus_quote);
    println!("  Break: {}", settings.break_quote);
    println!("  Warning: {}", settings.warning_quote);
    Ok(())
}

pub async fn set(sock_path: &Path, update: &SettingsUpdate) -> Result<()> {
    let db = Database::new(None)?;
    let mut settings = db.get_settings()?;

    if let Some(focus) = update.focus {
        settings.focus_minutes = focus;
    }
    if let Some(brk) = update.break_minutes {
        settings.break_minutes = brk;
    }
    if let Some(warning) = update.warning {
        settings.warning_minutes = warning;
    }
    if let Some(warnings) = update.warnings {
        settings.warnings_enabled = warnings;
    }
    if let Some(auto) = update.auto_block_images {
        settings.auto_block_images = auto;
    }
    if let Some(quote) = &update.blocker_quote {
        settings.blocker_quote.clone_from(quote);
    }
    if let Some(quote) = &update.focus_quote {
        settings.focus_quote.clone_from(quote);
    }
    if let Some(quote) = &update.break_quote {
        settings.break_quote.clone_from(quote);
    }
    if let Some(quote) = &update.warning_quote {
        settings.warning_quote.clone_from(quote);
    }

    // Invalid values never reach the store
    if let Err(e) = settings.validate() {
        anyhow::bail!("{e}");
    }
    db.save_settings(&settings)?;
    println!("Settings saved.");

    // Best effort: a stopped daemon picks the new values up on start
    match send(sock_path, IpcRequest::ReloadSettings).await {
        Ok(_) => println!("Daemon reloaded settings."),
        Err(e) => log::debug!("Daemon not reloaded: {e:#}"),
    }
    Ok(())
}

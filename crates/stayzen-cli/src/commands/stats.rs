/// Today's statistics display
use anyhow::Result;
use stayzen_storage::{db::local_date_string, Database};

pub fn show() -> Result<()> {
    let db = Database::new(None)?;
    let today = local_date_string();
    let stats = db.get_daily_stats(&today)?;

    println!("Statistics for {today}");
    println!("  Focus time: {} minutes", stats.focus_seconds / 60);
    println!("  Sites blocked: {}", stats.sites_blocked);
    Ok(())
}

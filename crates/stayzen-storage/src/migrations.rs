use anyhow::Result;
use rusqlite::{params, Connection};

use crate::models::{DailyStats, Settings};

/// Initialize database schema
///
/// # Errors
///
/// Returns an error if table creation fails
pub fn init_schema(conn: &Connection) -> Result<()> {
    // Single key-value table - every durable key holds a JSON document
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Seed the durable keys a fresh install expects, leaving existing
/// values untouched.
///
/// # Errors
///
/// Returns an error if serialization or the insert fails
pub fn seed_defaults(conn: &Connection, today: &str) -> Result<()> {
    let defaults: [(&str, String); 4] = [
        ("blockedSites", serde_json::to_string(&Vec::<String>::new())?),
        ("imageBlockingEnabled", serde_json::to_string(&false)?),
        ("dailyStats", serde_json::to_string(&DailyStats::fresh(today))?),
        ("settings", serde_json::to_string(&Settings::default())?),
    ];

    for (key, value) in defaults {
        conn.execute(
            "INSERT OR IGNORE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
    }
    Ok(())
}

//! Durable key-value store backing the coordinator.
//!
//! The host runtime's storage area is modeled as a single SQLite table of
//! JSON documents, one per durable key (`blockedSites`,
//! `imageBlockingEnabled`, `dailyStats`, `settings`).

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::migrations;
use crate::models::{DailyStats, Settings};

const KEY_BLOCKED_SITES: &str = "blockedSites";
const KEY_IMAGE_BLOCKING: &str = "imageBlockingEnabled";
const KEY_DAILY_STATS: &str = "dailyStats";
const KEY_SETTINGS: &str = "settings";

/// Today's calendar date as stored in `DailyStats.last_reset`.
#[must_use]
pub fn local_date_string() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Store handle, shareable across tasks and threads.
///
/// The connection lives behind a mutex: every public operation takes it
/// once, so a read-modify-write (blocklist edits, stat increments) is
/// atomic with respect to concurrent callers.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the store and seed first-run defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation, connection opening, or
    /// schema initialization fails
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = db_path.unwrap_or_else(Self::default_db_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(&path).context("Failed to open database connection")?;
        migrations::init_schema(&conn)?;
        migrations::seed_defaults(&conn, &local_date_string())?;

        log::info!("Store initialized at: {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get default database path
    fn default_db_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("stayzen");
        path.push("stayzen.db");
        path
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Store lock poisoned"))
    }

    fn read_key<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
        let value: Option<String> = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;

        match value {
            Some(json) => {
                let parsed = serde_json::from_str(&json)
                    .with_context(|| format!("Corrupt value under key '{key}'"))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    fn write_key<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, json],
        )?;
        Ok(())
    }

    // ==================== Settings ====================

    /// Read user settings, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored value is corrupt
    pub fn get_settings(&self) -> Result<Settings> {
        let conn = self.lock_conn()?;
        Ok(Self::read_key(&conn, KEY_SETTINGS)?.unwrap_or_default())
    }

    /// Persist user settings. Callers are expected to have validated.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let conn = self.lock_conn()?;
        Self::write_key(&conn, KEY_SETTINGS, settings)
    }

    // ==================== Blocklist ====================

    /// # Errors
    ///
    /// Returns an error if the query fails or the stored value is corrupt
    pub fn get_blocked_sites(&self) -> Result<Vec<String>> {
        let conn = self.lock_conn()?;
        Ok(Self::read_key(&conn, KEY_BLOCKED_SITES)?.unwrap_or_default())
    }

    /// Add a blocklist entry. Returns false when it was already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or write fails
    pub fn add_blocked_site(&self, site: &str) -> Result<bool> {
        let conn = self.lock_conn()?;
        let mut sites: Vec<String> = Self::read_key(&conn, KEY_BLOCKED_SITES)?.unwrap_or_default();
        if sites.iter().any(|s| s == site) {
            return Ok(false);
        }
        sites.push(site.to_string());
        Self::write_key(&conn, KEY_BLOCKED_SITES, &sites)?;
        Ok(true)
    }

    /// Remove a blocklist entry. Returns false when it was not present.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or write fails
    pub fn remove_blocked_site(&self, site: &str) -> Result<bool> {
        let conn = self.lock_conn()?;
        let mut sites: Vec<String> = Self::read_key(&conn, KEY_BLOCKED_SITES)?.unwrap_or_default();
        let before = sites.len();
        sites.retain(|s| s != site);
        if sites.len() == before {
            return Ok(false);
        }
        Self::write_key(&conn, KEY_BLOCKED_SITES, &sites)?;
        Ok(true)
    }

    // ==================== Image blocking flag ====================

    /// # Errors
    ///
    /// Returns an error if the query fails or the stored value is corrupt
    pub fn image_blocking_enabled(&self) -> Result<bool> {
        let conn = self.lock_conn()?;
        Ok(Self::read_key(&conn, KEY_IMAGE_BLOCKING)?.unwrap_or(false))
    }

    /// # Errors
    ///
    /// Returns an error if the write fails
    pub fn set_image_blocking_enabled(&self, enabled: bool) -> Result<()> {
        let conn = self.lock_conn()?;
        Self::write_key(&conn, KEY_IMAGE_BLOCKING, &enabled)
    }

    // ==================== Daily stats ====================

    /// Current counters under the already held lock, lazily reset when
    /// the calendar date moved past `last_reset`. The reset is
    /// persisted before the values are returned.
    fn load_stats(conn: &Connection, today: &str) -> Result<DailyStats> {
        let mut stats: DailyStats = Self::read_key(conn, KEY_DAILY_STATS)?
            .unwrap_or_else(|| DailyStats::fresh(today));
        if stats.roll_over(today) {
            log::info!("Daily stats reset for {today}");
            Self::write_key(conn, KEY_DAILY_STATS, &stats)?;
        }
        Ok(stats)
    }

    /// Read today's counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or the reset write fails
    pub fn get_daily_stats(&self, today: &str) -> Result<DailyStats> {
        let conn = self.lock_conn()?;
        Self::load_stats(&conn, today)
    }

    /// Credit a completed focus session to today's stats.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or write fails
    pub fn add_focus_seconds(&self, seconds: u64, today: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let mut stats = Self::load_stats(&conn, today)?;
        stats.focus_seconds += seconds;
        Self::write_key(&conn, KEY_DAILY_STATS, &stats)
    }

    /// Count one blocked-site hit against today's stats.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or write fails
    pub fn record_site_blocked(&self, today: &str) -> Result<()> {
        let conn = self.lock_conn()?;
        let mut stats = Self::load_stats(&conn, today)?;
        stats.sites_blocked += 1;
        Self::write_key(&conn, KEY_DAILY_STATS, &stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn open_temp() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(Some(dir.path().join("test.db"))).unwrap();
        (dir, db)
    }

    #[test]
    fn seeds_defaults_on_first_open() {
        let (_dir, db) = open_temp();
        assert_eq!(db.get_settings().unwrap(), Settings::default());
        assert!(db.get_blocked_sites().unwrap().is_empty());
        assert!(!db.image_blocking_enabled().unwrap());
    }

    #[test]
    fn blocklist_add_remove_round_trip() {
        let (_dir, db) = open_temp();
        assert!(db.add_blocked_site("afbook").unwrap());
        assert!(!db.add_blocked_site("afbook").unwrap());
        assert_eq!(db.get_blocked_sites().unwrap(), vec!["afbook"]);
        assert!(db.remove_blocked_site("afbook").unwrap());
        assert!(!db.remove_blocked_site("afbook").unwrap());
    }

    #[test]
    fn settings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let custom = Settings {
            focus_minutes: 50,
            ..Settings::default()
        };
        {
            let db = Database::new(Some(path.clone())).unwrap();
            db.save_settings(&custom).unwrap();
        }
        let db = Database::new(Some(path)).unwrap();
        assert_eq!(db.get_settings().unwrap(), custom);
    }

    #[test]
    fn daily_stats_reset_lazily_on_read() {
        let (_dir, db) = open_temp();
        db.add_focus_seconds(1500, "2026-08-22").unwrap();
        db.record_site_blocked("2026-08-22").unwrap();

        let stale = db.get_daily_stats("2026-08-22").unwrap();
        assert_eq!(stale.focus_seconds, 1500);
        assert_eq!(stale.sites_blocked, 1);

        // Any read on a later date zeroes the counters and persists the reset
        let fresh = db.get_daily_stats("2026-08-23").unwrap();
        assert_eq!(fresh, DailyStats::fresh("2026-08-23"));
        let again = db.get_daily_stats("2026-08-23").unwrap();
        assert_eq!(again.focus_seconds, 0);
    }

    #[test]
    fn image_blocking_flag_round_trip() {
        let (_dir, db) = open_temp();
        db.set_image_blocking_enabled(true).unwrap();
        assert!(db.image_blocking_enabled().unwrap());
        db.set_image_blocking_enabled(false).unwrap();
        assert!(!db.image_blocking_enabled().unwrap());
    }

    #[test]
    fn concurrent_store_access_is_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::new(Some(dir.path().join("test.db"))).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    let site = format!("site-{i}.test");
                    assert!(db.add_blocked_site(&site).unwrap());
                    db.get_blocked_sites().unwrap();
                    db.record_site_blocked("2026-08-23").unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // No update lost: each thread's read-modify-write was atomic
        assert_eq!(db.get_blocked_sites().unwrap().len(), 8);
        let stats = db.get_daily_stats("2026-08-23").unwrap();
        assert_eq!(stats.sites_blocked, 8);
    }
}

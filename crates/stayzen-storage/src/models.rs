use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length for user-provided quote strings, in characters.
pub const MAX_QUOTE_CHARS: usize = 200;

/// User preferences for the pomodoro timer, dwell warnings and blocking.
///
/// Stored under the `settings` key. The coordinator keeps an in-memory
/// mirror of this struct and only re-reads it on an explicit reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub focus_minutes: u32,
    pub break_minutes: u32,
    pub warning_minutes: u32,
    pub warnings_enabled: bool,
    pub auto_block_images: bool,
    /// Shown on the blocked-page overlay.
    pub blocker_quote: String,
    /// Shown when a focus session completes.
    pub focus_quote: String,
    /// Shown when a break ends.
    pub break_quote: String,
    /// Appended to dwell-time warnings.
    pub warning_quote: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            break_minutes: 5,
            warning_minutes: 5,
            warnings_enabled: true,
            auto_block_images: false,
            blocker_quote: String::from(
                "Take a deep breath. Focus on what truly matters.",
            ),
            focus_quote: String::from(
                "Ready to conquer your goals? Let's focus and make it happen!",
            ),
            break_quote: String::from(
                "Take a moment to breathe. You've earned this rest.",
            ),
            warning_quote: String::from("Stay focused!"),
        }
    }
}

impl Settings {
    /// Validate user input before it reaches the store.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint; the store must be left
    /// unchanged when validation fails.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(1..=120).contains(&self.focus_minutes) {
            return Err(SettingsError::FocusOutOfRange);
        }
        if !(1..=60).contains(&self.break_minutes) {
            return Err(SettingsError::BreakOutOfRange);
        }
        if !(1..=240).contains(&self.warning_minutes) {
            return Err(SettingsError::WarningOutOfRange);
        }
        let quotes = [
            &self.blocker_quote,
            &self.focus_quote,
            &self.break_quote,
            &self.warning_quote,
        ];
        if quotes.iter().any(|q| q.chars().count() > MAX_QUOTE_CHARS) {
            return Err(SettingsError::QuoteTooLong);
        }
        Ok(())
    }

    #[must_use]
    pub fn focus_seconds(&self) -> u32 {
        self.focus_minutes * 60
    }

    #[must_use]
    pub fn break_seconds(&self) -> u32 {
        self.break_minutes * 60
    }

    #[must_use]
    pub fn warning_threshold_seconds(&self) -> f64 {
        f64::from(self.warning_minutes) * 60.0
    }
}

/// Validation failures for user-supplied settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Focus time must be between 1-120 minutes")]
    FocusOutOfRange,
    #[error("Break time must be between 1-60 minutes")]
    BreakOutOfRange,
    #[error("Warning time must be between 1-240 minutes")]
    WarningOutOfRange,
    #[error("Quotes must be 200 characters or less")]
    QuoteTooLong,
}

/// Per-day counters, stored under the `dailyStats` key.
///
/// `last_reset` holds the calendar date the counters belong to; any reader
/// observing a different date zeroes the counters before using them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub focus_seconds: u64,
    pub sites_blocked: u32,
    pub last_reset: String,
}

impl DailyStats {
    #[must_use]
    pub fn fresh(today: &str) -> Self {
        Self {
            focus_seconds: 0,
            sites_blocked: 0,
            last_reset: today.to_string(),
        }
    }

    /// Zero the counters if the calendar date moved past `last_reset`.
    /// Returns true when a reset happened.
    pub fn roll_over(&mut self, today: &str) -> bool {
        if self.last_reset == today {
            return false;
        }
        *self = Self::fresh(today);
        true
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// Extract the hostname portion of a URL, if it has one.
///
/// Malformed URLs yield `None`; callers skip the operation silently.
#[must_use]
pub fn hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str().map(str::to_string)
}

/// Hostname of a URL the dwell tracker is allowed to follow.
///
/// Non-content schemes (internal browser pages, extension pages) are
/// excluded from tracking entirely.
#[must_use]
pub fn trackable_hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }
    parsed.host_str().map(str::to_string)
}

/// Accumulated foreground time for one hostname.
///
/// `last_warning_at_seconds` never exceeds `accumulated_seconds`; a
/// warning fires when the gap between them reaches the configured
/// threshold, then snaps the mark forward.
#[derive(Debug, Clone)]
struct DomainTimer {
    last_checkpoint: DateTime<Utc>,
    accumulated_seconds: f64,
    last_warning_at_seconds: f64,
}

impl DomainTimer {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_checkpoint: now,
            accumulated_seconds: 0.0,
            last_warning_at_seconds: 0.0,
        }
    }
}

/// The single currently tracked foreground tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTab {
    pub tab_id: u32,
    pub url: String,
    pub domain: String,
}

/// A dwell-time warning ready for delivery to the foreground page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DwellWarning {
    pub domain: String,
    pub total_minutes: u64,
}

/// Per-domain total reported to control surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteTimerSnapshot {
    pub total_seconds: f64,
}

/// Tracks how long each hostname has been foregrounded.
///
/// Totals are strictly cumulative across interruptions: switching away
/// and back re-checkpoints the domain without resetting its total.
/// Timers live for the process lifetime and are never persisted.
#[derive(Debug, Default)]
pub struct DwellTracker {
    timers: HashMap<String, DomainTimer>,
    active: Option<ActiveTab>,
}

impl DwellTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch tracking to a newly foregrounded tab.
    ///
    /// Elapsed time is flushed into the previous domain first. Returns
    /// true when the new URL is trackable content; otherwise tracking
    /// halts until the next foreground change.
    pub fn set_foreground(&mut self, tab_id: u32, url: &str, now: DateTime<Utc>) -> bool {
        self.flush(now);
        match trackable_hostname(url) {
            Some(domain) => {
                let timer = self
                    .timers
                    .entry(domain.clone())
                    .or_insert_with(|| DomainTimer::new(now));
                timer.last_checkpoint = now;
                self.active = Some(ActiveTab {
                    tab_id,
                    url: url.to_string(),
                    domain,
                });
                true
            }
            None => {
                self.active = None;
                false
            }
        }
    }

    /// Halt tracking (browser lost focus). Flushes the previous domain
    /// and clears the foreground reference; totals are kept.
    pub fn clear_foreground(&mut self, now: DateTime<Utc>) {
        self.flush(now);
        self.active = None;
    }

    /// Periodic 1 Hz tick: flush elapsed time, then evaluate the
    /// warning condition for the foreground domain.
    pub fn tick(
        &mut self,
        now: DateTime<Utc>,
        threshold_seconds: f64,
        warnings_enabled: bool,
    ) -> Option<DwellWarning> {
        self.flush(now);
        if !warnings_enabled {
            return None;
        }
        let domain = self.active.as_ref()?.domain.clone();
        let timer = self.timers.get_mut(&domain)?;
        if timer.accumulated_seconds - timer.last_warning_at_seconds < threshold_seconds {
            return None;
        }
        timer.last_warning_at_seconds = timer.accumulated_seconds;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let total_minutes = (timer.accumulated_seconds / 60.0).floor() as u64;
        Some(DwellWarning {
            domain,
            total_minutes,
        })
    }

    /// Forget when warnings last fired, without touching totals. Safe
    /// to interleave with ticks: totals only ever grow.
    pub fn reset_warning_marks(&mut self) {
        for timer in self.timers.values_mut() {
            timer.last_warning_at_seconds = 0.0;
        }
    }

    #[must_use]
    pub fn active_tab(&self) -> Option<&ActiveTab> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn tracked_domains(&self) -> usize {
        self.timers.len()
    }

    /// Live per-domain totals, including unflushed time on the
    /// foreground domain.
    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> HashMap<String, SiteTimerSnapshot> {
        self.timers
            .iter()
            .map(|(domain, timer)| {
                let mut total = timer.accumulated_seconds;
                if self.active.as_ref().is_some_and(|tab| &tab.domain == domain) {
                    total += elapsed_seconds(timer.last_checkpoint, now);
                }
                (
                    domain.clone(),
                    SiteTimerSnapshot {
                        total_seconds: total,
                    },
                )
            })
            .collect()
    }

    fn flush(&mut self, now: DateTime<Utc>) {
        if let Some(tab) = &self.active {
            if let Some(timer) = self.timers.get_mut(&tab.domain) {
                timer.accumulated_seconds += elapsed_seconds(timer.last_checkpoint, now);
                timer.last_checkpoint = now;
            }
        }
    }
}

fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let millis = (to - from).num_milliseconds().max(0) as f64;
    millis / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 23, 12, 0, 0).unwrap()
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(seconds)
    }

    #[test]
    fn hostname_extraction() {
        assert_eq!(
            trackable_hostname("https://news.example.org/story"),
            Some(String::from("news.example.org"))
        );
        assert_eq!(trackable_hostname("about:config"), None);
        assert_eq!(trackable_hostname("chrome://settings"), None);
        assert_eq!(
            trackable_hostname("moz-extension://abc123/options.html"),
            None
        );
        assert_eq!(trackable_hostname("not a url"), None);
    }

    #[test]
    fn warning_fires_at_cumulative_threshold_across_interruptions() {
        let mut tracker = DwellTracker::new();
        let threshold = 300.0;

        // 150s on domain A
        assert!(tracker.set_foreground(1, "https://a.test/", at(0)));
        assert_eq!(tracker.tick(at(150), threshold, true), None);

        // 150s elsewhere
        assert!(tracker.set_foreground(2, "https://b.test/", at(150)));
        assert_eq!(tracker.tick(at(300), threshold, true), None);

        // Back to A: 150s more brings its total to exactly 300
        assert!(tracker.set_foreground(1, "https://a.test/", at(300)));
        assert_eq!(tracker.tick(at(449), threshold, true), None);
        let warning = tracker.tick(at(450), threshold, true);
        assert_eq!(
            warning,
            Some(DwellWarning {
                domain: String::from("a.test"),
                total_minutes: 5,
            })
        );

        // The next warning needs another full threshold of accumulation
        assert_eq!(tracker.tick(at(700), threshold, true), None);
        let second = tracker.tick(at(750), threshold, true);
        assert_eq!(
            second,
            Some(DwellWarning {
                domain: String::from("a.test"),
                total_minutes: 10,
            })
        );
    }

    #[test]
    fn switching_away_does_not_reset_totals() {
        let mut tracker = DwellTracker::new();
        tracker.set_foreground(1, "https://a.test/", at(0));
        tracker.set_foreground(2, "https://b.test/", at(60));
        tracker.set_foreground(1, "https://a.test/", at(120));

        let snapshot = tracker.snapshot(at(150));
        assert!((snapshot["a.test"].total_seconds - 90.0).abs() < f64::EPSILON);
        assert!((snapshot["b.test"].total_seconds - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_content_pages_are_not_tracked() {
        let mut tracker = DwellTracker::new();
        tracker.set_foreground(1, "https://a.test/", at(0));
        // Moving to an internal page flushes A and halts tracking
        assert!(!tracker.set_foreground(1, "about:blank", at(30)));
        assert_eq!(tracker.tick(at(90), 10.0, true), None);

        let snapshot = tracker.snapshot(at(90));
        assert_eq!(snapshot.len(), 1);
        assert!((snapshot["a.test"].total_seconds - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn disabled_warnings_still_accumulate() {
        let mut tracker = DwellTracker::new();
        tracker.set_foreground(1, "https://a.test/", at(0));
        assert_eq!(tracker.tick(at(600), 300.0, false), None);

        // Re-enabling later sees the full backlog
        let warning = tracker.tick(at(601), 300.0, true);
        assert_eq!(warning.map(|w| w.total_minutes), Some(10));
    }

    #[test]
    fn focus_loss_preserves_totals() {
        let mut tracker = DwellTracker::new();
        tracker.set_foreground(1, "https://a.test/", at(0));
        tracker.clear_foreground(at(45));
        assert!(tracker.active_tab().is_none());

        // Time away from the browser is not attributed to anyone
        tracker.set_foreground(1, "https://a.test/", at(500));
        let snapshot = tracker.snapshot(at(510));
        assert!((snapshot["a.test"].total_seconds - 55.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_warning_marks_rearms_without_touching_totals() {
        let mut tracker = DwellTracker::new();
        tracker.set_foreground(1, "https://a.test/", at(0));
        assert!(tracker.tick(at(300), 300.0, true).is_some());

        tracker.reset_warning_marks();
        // Immediately warns again: the backlog is the full total
        assert!(tracker.tick(at(301), 300.0, true).is_some());
        let snapshot = tracker.snapshot(at(301));
        assert!((snapshot["a.test"].total_seconds - 301.0).abs() < f64::EPSILON);
    }
}

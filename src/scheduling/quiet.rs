// Quiet hours
// a time-of-day window in which autopilot stays silent

use chrono::NaiveTime;

use crate::config::ScheduleConfig;

/// Inclusive `[start, end]` window. When `start >= end` the window wraps
/// past midnight (e.g. 22:00-06:00).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for QuietWindow {
    fn default() -> Self {
        Self {
            start: hm(2, 0),
            end: hm(4, 0),
        }
    }
}

impl QuietWindow {
    /// Parse `HH:MM-HH:MM`, or `None` if it is malformed.
    pub fn try_parse(window: &str) -> Option<Self> {
        let (start, end) = window.split_once('-')?;
        Some(Self {
            start: parse_hm(start)?,
            end: parse_hm(end)?,
        })
    }

    /// Parse `HH:MM-HH:MM`, falling back to 02:00-04:00 on any error.
    pub fn parse(window: &str) -> Self {
        Self::try_parse(window).unwrap_or_else(|| {
            tracing::warn!(quiet_hours = window, "Malformed quiet_hours, using 02:00-04:00");
            Self::default()
        })
    }

    pub fn contains(&self, now: NaiveTime) -> bool {
        if self.start < self.end {
            self.start <= now && now <= self.end
        } else {
            now >= self.start || now <= self.end
        }
    }
}

/// Whether `now` falls inside the configured quiet window.
pub fn in_quiet(schedule: &ScheduleConfig, now: NaiveTime) -> bool {
    QuietWindow::parse(&schedule.quiet_hours).contains(now)
}

fn parse_hm(part: &str) -> Option<NaiveTime> {
    let (h, m) = part.trim().split_once(':')?;
    NaiveTime::from_hms_opt(h.trim().parse().ok()?, m.trim().parse().ok()?, 0)
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

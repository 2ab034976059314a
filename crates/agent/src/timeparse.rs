//! Time phrases used by scheduling intents
//!
//! Classifier tiers and the AI backend hand over times in several shapes
//! ("10 minutes", "7:30 pm", "07:00"). These helpers turn them into a
//! [`When`] the scheduler understands.

use std::time::Duration;

use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;

use shadow_core::When;

static CLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:at\s+)?(\d{1,2})(?::(\d{2}))?\s*(am|pm|a\.m\.|p\.m\.)?\s*$").unwrap()
});

static RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s*(seconds?|secs?|minutes?|mins?|hours?|hrs?)\b").unwrap()
});

/// Seconds in one `unit` ("min", "hours", "sec"...)
pub fn unit_seconds(unit: &str) -> Option<u64> {
    let unit = unit.trim().to_lowercase();
    if unit.starts_with("sec") {
        Some(1)
    } else if unit.starts_with("min") {
        Some(60)
    } else if unit.starts_with("h") {
        Some(3600)
    } else {
        None
    }
}

/// `amount` of `unit` as a duration
pub fn duration_of(amount: &str, unit: &str) -> Option<Duration> {
    let amount: u64 = amount.trim().parse().ok()?;
    let secs = amount.checked_mul(unit_seconds(unit)?)?;
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// First "N unit" phrase in `text`
pub fn parse_relative(text: &str) -> Option<Duration> {
    let caps = RELATIVE.captures(text)?;
    duration_of(caps.get(1)?.as_str(), caps.get(2)?.as_str())
}

/// Wall-clock time: "7:30 pm", "07:00", "at 6am", "19:45"
pub fn parse_clock(text: &str) -> Option<NaiveTime> {
    let caps = CLOCK.captures(text)?;
    let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };

    if let Some(meridiem) = caps.get(3) {
        if hour == 0 || hour > 12 {
            return None;
        }
        let pm = meridiem.as_str().to_lowercase().starts_with('p');
        hour = match (pm, hour) {
            (false, 12) => 0,
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, h) => h,
        };
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Relative phrase first, then clock time
pub fn parse_when(text: &str) -> Option<When> {
    parse_relative(text)
        .map(When::After)
        .or_else(|| parse_clock(text).map(When::At))
}

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use std::time::Duration;

use crate::log::Logger;

/// Delay to wait after failed attempt `attempt` (1-based):
/// `delay * backoff^(attempt - 1)`, saturating at `Duration::MAX`.
pub(crate) fn retry_delay(delay: Duration, backoff: f64, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1) as i32;
    let secs = delay.as_secs_f64() * backoff.powi(exp);
    if secs.is_nan() || secs < 0.0 {
        return delay;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

pub(crate) fn append_query(url: &str, params: &[(&str, &str)]) -> String {
    // Values are appended verbatim; callers pre-encode anything that needs it.
    let mut out = url.to_string();
    let sep = if url.contains('?') { '&' } else { '?' };
    out.push(sep);
    let mut first = true;
    for (k, v) in params {
        if !first {
            out.push('&');
        }
        first = false;
        out.push_str(k);
        out.push('=');
        out.push_str(v);
    }
    out
}

pub(crate) fn is_remote(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

/// `YYYYMMDD`
pub fn date_to_stamp(date: &NaiveDateTime) -> String {
    date.format("%Y%m%d").to_string()
}

/// `YYYYMMDDHHMMSS`
pub fn time_to_stamp(date: &NaiveDateTime) -> String {
    date.format("%Y%m%d%H%M%S").to_string()
}

pub fn stamp_to_date(stamp: &str) -> Result<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(stamp.trim(), "%Y%m%d")
        .with_context(|| format!("invalid date stamp '{}'", stamp))?;
    Ok(date.and_time(chrono::NaiveTime::MIN))
}

pub fn stamp_to_time(stamp: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(stamp.trim(), "%Y%m%d%H%M%S")
        .with_context(|| format!("invalid time stamp '{}'", stamp))
}

/// Logs and returns the current UTC time.
pub fn time_stamp(logger: &dyn Logger) -> String {
    let ts = format!("{} UTC", Utc::now().naive_utc());
    logger.time(&ts);
    ts
}

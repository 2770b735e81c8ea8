use anyhow::anyhow;
use chrono::{DateTime, Utc};

/// Parse a time string into a UTC datetime.
///
/// Accepts Unix timestamps (e.g. `1696204800`) and RFC3339 strings
/// (e.g. `2023-10-02T00:00:00Z`).
pub fn string_to_time(time_string: &str) -> anyhow::Result<DateTime<Utc>> {
    let ts = match dateparser::parse_with(
        time_string,
        &Utc,
        chrono::NaiveTime::from_hms_opt(0, 0, 0).ok_or_else(|| anyhow!("Failed to create time"))?,
    ) {
        Ok(ts) => ts,
        Err(_) => {
            return Err(anyhow!(
                "Input time must be either Unix timestamp or time string compliant with RFC3339"
            ))
        }
    };

    Ok(ts)
}

/// A start/end window parsed from caller-supplied time strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Parse a pair of time strings into a range. This is the only
    /// recoverable input error in the discovery path; callers map it to
    /// the `invalid timestamp` response error.
    pub fn parse(ts_start: &str, ts_end: &str) -> anyhow::Result<TimeRange> {
        let start = string_to_time(ts_start)
            .map_err(|_| anyhow!("ts-start is not a valid time string: {}", ts_start))?;
        let end = string_to_time(ts_end)
            .map_err(|_| anyhow!("ts-end is not a valid time string: {}", ts_end))?;
        Ok(TimeRange { start, end })
    }
}

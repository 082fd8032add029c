use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a timestamp column.
///
/// Values bound from Rust are RFC 3339, while SQLite's `CURRENT_TIMESTAMP`
/// default produces `YYYY-MM-DD HH:MM:SS`.
pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    if value.contains('T') {
        Ok(DateTime::parse_from_rfc3339(value)
            .with_context(|| format!("Failed to parse {} as RFC3339", field))?
            .with_timezone(&Utc))
    } else {
        Ok(NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
            .with_context(|| format!("Failed to parse {} as SQLite format", field))?
            .and_utc())
    }
}

/// Timestamp helpers for emitted status lines
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Format a timestamp as RFC 3339 for machine consumption
///
/// Falls back to the default string representation if formatting fails.
pub fn format_timestamp(dt: &OffsetDateTime) -> String {
    dt.format(&Rfc3339).unwrap_or_else(|_| dt.to_string())
}

/// Current UTC time, formatted with [`format_timestamp`]
pub fn now_timestamp() -> String {
    format_timestamp(&OffsetDateTime::now_utc())
}

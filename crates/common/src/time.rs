use chrono::{SecondsFormat, Utc};

/// Current UTC time as RFC3339 with millisecond precision.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Milliseconds since the unix epoch.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

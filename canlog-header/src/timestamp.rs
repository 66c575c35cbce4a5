use chrono::NaiveDateTime;

use crate::layout::TIMESTAMP_FORMAT;
use crate::{FormatError, FormatResult};

/// Epoch seconds of a recording date (`DD:MM:YYYY`) and time (`HH:MM:SS`), read as UTC
pub fn epoch_seconds(date: &str, time: &str) -> FormatResult<i64> {
    NaiveDateTime::parse_from_str(&format!("{date} {time}"), TIMESTAMP_FORMAT)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|_| FormatError::InvalidTimestamp {
            date: date.to_string(),
            time: time.to_string(),
        })
}

/// Cut a textual epoch value at its first `.`.
///
/// This is a string cut, not rounding: `"1710498005.9"` becomes `"1710498005"`.
pub fn truncate_epoch_text(text: &str) -> &str {
    match text.find('.') {
        Some(dot) => &text[..dot],
        None => text,
    }
}

/// Path-segment form of an epoch value
pub fn epoch_text(seconds: i64) -> String {
    let text = format!("{:.1}", seconds as f64);
    truncate_epoch_text(&text).to_string()
}

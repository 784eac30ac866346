//! Human-readable timestamps for the activity log.
//!
//! The log is consumed by language models, so timestamps are spelled out:
//! `"2023 January twenty-first 14:30"`.

use chrono::{DateTime, Datelike, Local};

const ORDINAL_DAYS: [&str; 31] = [
    "first",
    "second",
    "third",
    "fourth",
    "fifth",
    "sixth",
    "seventh",
    "eighth",
    "ninth",
    "tenth",
    "eleventh",
    "twelfth",
    "thirteenth",
    "fourteenth",
    "fifteenth",
    "sixteenth",
    "seventeenth",
    "eighteenth",
    "nineteenth",
    "twentieth",
    "twenty-first",
    "twenty-second",
    "twenty-third",
    "twenty-fourth",
    "twenty-fifth",
    "twenty-sixth",
    "twenty-seventh",
    "twenty-eighth",
    "twenty-ninth",
    "thirtieth",
    "thirty-first",
];

/// Ordinal word for a day of the month, or `None` outside 1..=31.
pub fn ordinal_day(day: u32) -> Option<&'static str> {
    if (1..=31).contains(&day) {
        Some(ORDINAL_DAYS[(day - 1) as usize])
    } else {
        None
    }
}

/// Format a timestamp as `"<year> <month full name> <ordinal day> <HH:MM>"`.
pub fn llm_timestamp(time: DateTime<Local>) -> String {
    let day = ordinal_day(time.day()).unwrap_or_default();
    format!("{} {} {}", time.format("%Y %B"), day, time.format("%H:%M"))
}

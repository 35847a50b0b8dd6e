//! Shared helpers and constants.

use chrono::{Local, Utc};

pub const APP_NAME: &str = "birdify";

pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Local calendar date of the observation, `YYYY-MM-DD`.
pub fn today_local_date() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Local time-of-day of the observation, `HH:MM`.
pub fn now_local_time() -> String {
    Local::now().format("%H:%M").to_string()
}

/// Storage object name for a freshly captured photo. Millisecond timestamps
/// keep names unique enough for a single device submitting one report at a
/// time, matching what the backend bucket expects.
pub fn photo_object_name() -> String {
    format!("{}.jpg", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_object_names_are_jpg() {
        let name = photo_object_name();
        assert!(name.ends_with(".jpg"));
        assert!(name.trim_end_matches(".jpg").parse::<i64>().is_ok());
    }

    #[test]
    fn local_date_shape() {
        let date = today_local_date();
        assert_eq!(date.len(), 10);
        assert_eq!(&date[4..5], "-");
    }
}

//! Mount wire codec — pure frame builders, no I/O.
//!
//! The mount speaks a byte protocol over its hand-control port: short
//! ASCII queries and fixed-length binary command frames, every reply
//! terminated by `#`. Frames are built as explicit byte arrays with
//! documented offsets; nothing here relies on struct layout.
//!
//! ## Time frame (9 bytes)
//!
//! | Offset | Field | Encoding |
//! |--------|-------------|----------------------------------------|
//! | 0 | control | `'H'` |
//! | 1–3 | h, m, s | raw binary, UTC |
//! | 4–5 | month, day | raw binary, 1-based |
//! | 6 | year | calendar year − 2000 |
//! | 7 | timezone | signed hours, 256's-complement |
//! | 8 | DST | 0 or 1 |
//!
//! ## Location frame (9 bytes)
//!
//! `'W'` followed by one 4-byte group per axis (latitude first):
//! degrees, minutes, seconds — each truncated toward zero — and a sign
//! byte. **Sign convention: 1 = positive (north/east), 0 = negative
//! (south/west).** This is part of the wire contract; see the tests.

use chrono::{Datelike, Timelike};

/// Keep-alive probe: the mount echoes the payload byte back.
pub const KEEPALIVE_PROBE: &[u8] = b"Kx";
/// Expected reply to [`KEEPALIVE_PROBE`].
pub const KEEPALIVE_REPLY: &[u8] = b"x#";
/// Expected reply to a time or location command: a bare terminator.
pub const ACK_REPLY: &[u8] = b"#";

/// Every mount reply ends with this sentinel byte.
pub const REPLY_TERMINATOR: u8 = b'#';

/// Control byte of the time frame.
pub const TIME_CTRL: u8 = b'H';
/// Control byte of the location frame.
pub const LOCATION_CTRL: u8 = b'W';

/// The year byte is an offset from this calendar year.
pub const YEAR_BASE: i32 = 2000;

/// Sign byte for a non-negative axis value (north / east).
pub const SIGN_POSITIVE: u8 = 1;
/// Sign byte for a negative axis value (south / west).
pub const SIGN_NEGATIVE: u8 = 0;

/// Build the 9-byte time command from a UTC timestamp.
///
/// Returns `None` when the timestamp cannot be represented on the wire
/// (before year 2000, or past the one-byte year range). Callers treat
/// that the same as an invalid clock and skip the sync.
pub fn encode_time(utc_seconds: i64, timezone_offset_hours: i8, dst: bool) -> Option<[u8; 9]> {
    let dt = chrono::DateTime::<chrono::Utc>::from_timestamp(utc_seconds, 0)?;
    let year = dt.year() - YEAR_BASE;
    if !(0..=255).contains(&year) {
        return None;
    }
    Some([
        TIME_CTRL,
        dt.hour() as u8,
        dt.minute() as u8,
        dt.second() as u8,
        dt.month() as u8,
        dt.day() as u8,
        year as u8,
        // Two's-complement cast is exactly the 256's-complement the
        // mount expects for negative offsets.
        timezone_offset_hours as u8,
        u8::from(dst),
    ])
}

/// Build the 9-byte location command from decimal degrees.
///
/// Positive latitude is north, positive longitude is east.
pub fn encode_location(latitude: f64, longitude: f64) -> [u8; 9] {
    let lat = encode_axis(latitude);
    let lng = encode_axis(longitude);
    [
        LOCATION_CTRL,
        lat[0], lat[1], lat[2], lat[3],
        lng[0], lng[1], lng[2], lng[3],
    ]
}

/// Degrees / minutes / seconds / sign for one axis.
///
/// Each unit is truncated, not rounded: 45.9999° is 45°59'59".
fn encode_axis(value: f64) -> [u8; 4] {
    let sign = if value < 0.0 { SIGN_NEGATIVE } else { SIGN_POSITIVE };
    let mut rest = value.abs();
    let degrees = rest as u8;
    rest = (rest - f64::from(degrees)) * 60.0;
    let minutes = rest as u8;
    rest = (rest - f64::from(minutes)) * 60.0;
    let seconds = rest as u8;
    [degrees, minutes, seconds, sign]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_frame_epoch_base() {
        // 2019-01-01T00:00:00Z — the clock-validity reference instant.
        let frame = encode_time(1_546_300_800, 0, false).unwrap();
        assert_eq!(frame, [TIME_CTRL, 0, 0, 0, 1, 1, 19, 0, 0]);
    }

    #[test]
    fn time_frame_fields() {
        // 2023-08-09T12:34:56Z
        let ts = chrono::NaiveDate::from_ymd_opt(2023, 8, 9)
            .unwrap()
            .and_hms_opt(12, 34, 56)
            .unwrap()
            .and_utc()
            .timestamp();
        let frame = encode_time(ts, 0, false).unwrap();
        assert_eq!(&frame[1..7], &[12, 34, 56, 8, 9, 23]);
    }

    #[test]
    fn negative_timezone_is_256s_complement() {
        let frame = encode_time(1_546_300_800, -5, true).unwrap();
        assert_eq!(frame[7], 251);
        assert_eq!(frame[8], 1);
        let frame = encode_time(1_546_300_800, 11, false).unwrap();
        assert_eq!(frame[7], 11);
    }

    #[test]
    fn pre_2000_timestamp_not_encodable() {
        // 1999-12-31T23:59:59Z
        assert_eq!(encode_time(946_684_799, 0, false), None);
        // 2000-01-01T00:00:00Z is the first representable instant.
        assert!(encode_time(946_684_800, 0, false).is_some());
    }

    #[test]
    fn location_sign_convention() {
        // 45.5°N, 122.25°W
        let frame = encode_location(45.5, -122.25);
        assert_eq!(frame[0], LOCATION_CTRL);
        assert_eq!(&frame[1..5], &[45, 30, 0, SIGN_POSITIVE]);
        assert_eq!(&frame[5..9], &[122, 15, 0, SIGN_NEGATIVE]);
    }

    #[test]
    fn location_truncates_toward_zero() {
        // 10°59'59.9" — seconds must not round up to the next minute.
        let frame = encode_location(10.0 + 59.0 / 60.0 + 59.9 / 3600.0, 0.0);
        assert_eq!(&frame[1..4], &[10, 59, 59]);
    }

    #[test]
    fn location_zero_is_positive() {
        let frame = encode_location(0.0, 0.0);
        assert_eq!(frame[4], SIGN_POSITIVE);
        assert_eq!(frame[8], SIGN_POSITIVE);
    }

    #[test]
    fn codec_is_deterministic() {
        assert_eq!(
            encode_time(1_700_000_000, -8, true),
            encode_time(1_700_000_000, -8, true)
        );
        assert_eq!(
            encode_location(51.4779, -0.0015),
            encode_location(51.4779, -0.0015)
        );
    }
}

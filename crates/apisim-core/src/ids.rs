//! Slack-style identifiers and message timestamps.
//!
//! Message timestamps are strings of the form `"<seconds>.<micros>"` with
//! exactly six fractional digits. They identify a message within a channel and
//! are compared as strings in SQL, so every timestamp written to or compared
//! against the store goes through [`format_ts`] or [`normalize_ts`], which pad
//! the seconds to ten digits.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ID_SUFFIX_LEN: usize = 8;
const MICROS_PER_SEC: u64 = 1_000_000;

static TS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,10})(?:\.(\d{1,6}))?$").expect("valid timestamp regex"));

/// Generates a Slack-style id: the prefix followed by 8 characters of `A-Z0-9`.
///
/// Conventional prefixes are `T` (team), `U` (user), `C`/`G`/`D` (channels),
/// `A` (app) and `Ev` (event).
#[must_use]
pub fn slack_id(prefix: &str) -> String {
    slack_id_with(&mut rand::thread_rng(), prefix)
}

/// Like [`slack_id`], drawing from the given generator.
pub fn slack_id_with<R: Rng + ?Sized>(rng: &mut R, prefix: &str) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
        .collect();
    format!("{prefix}{suffix}")
}

/// Generates an internal row id.
#[must_use]
pub fn row_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Formats microseconds since the epoch as a message timestamp.
#[must_use]
pub fn format_ts(micros: u64) -> String {
    format!(
        "{:010}.{:06}",
        micros / MICROS_PER_SEC,
        micros % MICROS_PER_SEC
    )
}

/// Parses a timestamp such as `"1700000000"`, `"1700000000.5"` or
/// `"1700000000.000500"` into microseconds since the epoch.
///
/// At most ten seconds digits are accepted, the width [`format_ts`] pads to.
#[must_use]
pub fn parse_ts(value: &str) -> Option<u64> {
    let captures = TS_PATTERN.captures(value.trim())?;
    let secs: u64 = captures.get(1)?.as_str().parse().ok()?;
    let micros = match captures.get(2) {
        Some(fraction) => {
            let digits = fraction.as_str();
            let padded = format!("{digits:0<6}");
            padded.parse::<u64>().ok()?
        }
        None => 0,
    };
    secs.checked_mul(MICROS_PER_SEC)?.checked_add(micros)
}

/// Re-formats a timestamp into canonical form, or `None` if it is malformed.
#[must_use]
pub fn normalize_ts(value: &str) -> Option<String> {
    parse_ts(value).map(format_ts)
}

/// Current wall-clock time in microseconds.
fn now_micros() -> u64 {
    u64::try_from(Utc::now().timestamp_micros()).unwrap_or_default()
}

/// Source of strictly increasing message timestamps.
///
/// Two messages posted within the same microsecond still receive distinct
/// timestamps, which keeps `(channel, ts)` unique.
#[derive(Debug, Default)]
pub struct TsClock {
    last: AtomicU64,
}

impl TsClock {
    /// Create a clock that starts from the current time.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Returns the next timestamp, never equal to or less than a previous one.
    pub fn next(&self) -> String {
        let now = now_micros();
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(previous + 1);
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return format_ts(candidate),
                Err(actual) => previous = actual,
            }
        }
    }

    /// Returns the current time as a timestamp without advancing the clock.
    #[must_use]
    pub fn now(&self) -> String {
        format_ts(now_micros())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slack_id_shape() {
        let id = slack_id("U");
        assert_eq!(id.len(), 9);
        assert!(id.starts_with('U'));
        assert!(id[1..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

        let event = slack_id("Ev");
        assert!(event.starts_with("Ev"));
        assert_eq!(event.len(), 10);
    }

    #[test]
    fn test_seeded_ids_repeat() {
        use rand::SeedableRng;

        let mut a = rand::rngs::StdRng::seed_from_u64(7);
        let mut b = rand::rngs::StdRng::seed_from_u64(7);
        assert_eq!(slack_id_with(&mut a, "T"), slack_id_with(&mut b, "T"));
    }

    #[test]
    fn test_format_ts_pads_micros() {
        assert_eq!(format_ts(1_700_000_000_000_042), "1700000000.000042");
        assert_eq!(format_ts(0), "0000000000.000000");
        assert_eq!(normalize_ts("99").as_deref(), Some("0000000099.000000"));
    }

    #[test]
    fn test_parse_ts_variants() {
        assert_eq!(parse_ts("1700000000"), Some(1_700_000_000_000_000));
        assert_eq!(parse_ts("1700000000.5"), Some(1_700_000_000_500_000));
        assert_eq!(parse_ts("1700000000.000123"), Some(1_700_000_000_000_123));
        assert_eq!(parse_ts(" 12.000001 "), Some(12_000_001));
    }

    #[test]
    fn test_parse_ts_rejects_garbage() {
        assert_eq!(parse_ts(""), None);
        assert_eq!(parse_ts("abc"), None);
        assert_eq!(parse_ts("12.1234567"), None);
        assert_eq!(parse_ts("-5"), None);
    }

    #[test]
    fn test_seconds_wider_than_padding_are_rejected() {
        assert_eq!(parse_ts("9999999999.999999"), Some(9_999_999_999_999_999));
        assert_eq!(parse_ts("10000000000"), None);
        assert_eq!(normalize_ts("100000000000.5"), None);
        assert!(normalize_ts("9999999999").unwrap().as_str() > "1700000000.000000");
    }

    #[test]
    fn test_normalize_ts() {
        assert_eq!(normalize_ts("1700000000.1").as_deref(), Some("1700000000.100000"));
        assert_eq!(normalize_ts("nope"), None);
    }

    #[test]
    fn test_clock_is_strictly_increasing() {
        let clock = TsClock::new();
        let mut previous = clock.next();
        for _ in 0..1000 {
            let next = clock.next();
            assert!(parse_ts(&next) > parse_ts(&previous));
            previous = next;
        }
    }
}

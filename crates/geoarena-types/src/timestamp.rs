use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;

/// Seconds since the Unix epoch, as stored in entity records.
///
/// Zero means "not set". Textual input may be either plain integer
/// seconds or the `YYYY-MM-DDTHH:MM:SSZ` form used by map data exports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u32);

const SECONDS_PER_DAY: i64 = 86_400;

impl Timestamp {
    #[must_use]
    pub const fn from_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    #[must_use]
    pub const fn seconds(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_set(self) -> bool {
        self.0 != 0
    }

    /// Parse integer seconds or an ISO 8601 UTC timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::InvalidTimestamp`] for any other input, for
    /// out-of-range fields and for dates outside the `u32` second range.
    pub fn parse(text: &str) -> Result<Self, TypeError> {
        let invalid = || TypeError::InvalidTimestamp {
            value: text.to_string(),
        };

        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            return text.parse::<u32>().map(Self).map_err(|_| invalid());
        }

        let b = text.as_bytes();
        if b.len() != 20
            || b[4] != b'-'
            || b[7] != b'-'
            || b[10] != b'T'
            || b[13] != b':'
            || b[16] != b':'
            || b[19] != b'Z'
        {
            return Err(invalid());
        }

        let field = |range: std::ops::Range<usize>| -> Result<i64, TypeError> {
            let digits = &b[range];
            if !digits.iter().all(u8::is_ascii_digit) {
                return Err(invalid());
            }
            Ok(digits
                .iter()
                .fold(0i64, |acc, d| acc * 10 + i64::from(d - b'0')))
        };

        let year = field(0..4)?;
        let month = field(5..7)?;
        let day = field(8..10)?;
        let hour = field(11..13)?;
        let minute = field(14..16)?;
        let second = field(17..19)?;

        if !(1..=12).contains(&month)
            || day < 1
            || day > days_in_month(year, month)
            || hour > 23
            || minute > 59
            || second > 59
        {
            return Err(invalid());
        }

        let total = days_from_civil(year, month, day) * SECONDS_PER_DAY
            + hour * 3600
            + minute * 60
            + second;
        u32::try_from(total).map(Self).map_err(|_| invalid())
    }
}

impl FromStr for Timestamp {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = i64::from(self.0);
        let days = total.div_euclid(SECONDS_PER_DAY);
        let rem = total.rem_euclid(SECONDS_PER_DAY);
        let (year, month, day) = civil_from_days(days);
        write!(
            f,
            "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}Z",
            rem / 3600,
            (rem % 3600) / 60,
            rem % 60
        )
    }
}

fn is_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: i64) -> i64 {
    match month {
        2 if is_leap(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

// Proleptic Gregorian day counting, see H. Hinnant's "chrono-Compatible
// Low-Level Date Algorithms".
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_integer_seconds() {
        assert_eq!(Timestamp::parse("0").unwrap().seconds(), 0);
        assert_eq!(Timestamp::parse("1700000000").unwrap().seconds(), 1_700_000_000);
    }

    #[test]
    fn parse_iso() {
        assert_eq!(Timestamp::parse("1970-01-01T00:00:00Z").unwrap().seconds(), 0);
        assert_eq!(
            Timestamp::parse("2012-12-31T23:59:59Z").unwrap().seconds(),
            1_356_998_399
        );
        assert_eq!(
            Timestamp::parse("2000-02-29T12:00:00Z").unwrap().seconds(),
            951_825_600
        );
    }

    #[test]
    fn display_is_iso() {
        assert_eq!(Timestamp::from_seconds(0).to_string(), "1970-01-01T00:00:00Z");
        assert_eq!(
            Timestamp::from_seconds(1_356_998_399).to_string(),
            "2012-12-31T23:59:59Z"
        );
    }

    #[test]
    fn iso_roundtrip_through_display() {
        for text in ["2009-04-18T07:32:01Z", "2024-02-29T00:00:00Z", "2038-01-19T03:14:07Z"] {
            let ts: Timestamp = text.parse().unwrap();
            assert_eq!(ts.to_string(), text);
        }
    }

    #[test]
    fn reject_malformed() {
        for text in [
            "",
            "yesterday",
            "2012-12-31 23:59:59Z",
            "2012-13-01T00:00:00Z",
            "2013-02-29T00:00:00Z",
            "2012-12-31T24:00:00Z",
            "1969-12-31T23:59:59Z",
            "99999999999",
        ] {
            assert!(
                matches!(Timestamp::parse(text), Err(TypeError::InvalidTimestamp { .. })),
                "accepted {text:?}"
            );
        }
    }
}

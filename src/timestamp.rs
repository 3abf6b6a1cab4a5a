use serde::{Deserialize, Serialize};
use std::fmt;

const NS_PER_MS: i64 = 1_000_000;
const NS_PER_S: i64 = 1_000_000_000;

// Below this many nanoseconds durations are shown as a raw integer count
const NS_DISPLAY_LIMIT: i64 = 100_000;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize, Serialize)]
pub struct Timestamp(pub i64 /* ns */);

impl Timestamp {
    /// Milliseconds are the display unit of the timeline axis.
    pub fn to_ms(self) -> f64 {
        self.0 as f64 / NS_PER_MS as f64
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_duration(self.0, DurationFormat::default()))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize, Serialize)]
pub struct Interval {
    pub start: Timestamp,
    pub stop: Timestamp,
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "from {:.3} to {:.3} ms (duration: {})",
            self.start.to_ms(),
            self.stop.to_ms(),
            Timestamp(self.duration_ns())
        )
    }
}

impl Interval {
    pub fn new(start: Timestamp, stop: Timestamp) -> Self {
        Self { start, stop }
    }
    pub fn duration_ns(self) -> i64 {
        self.stop.0 - self.start.0
    }
}

/// How durations are rendered in the region details menu.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct DurationFormat {
    /// Never switch to seconds, even for durations of a second or more.
    pub always_ms: bool,
}

/// Formats a duration given in nanoseconds.
///
/// Short durations are printed as grouped integer nanoseconds (`50,000 ns`),
/// everything else with two decimals in milliseconds or seconds
/// (`5.00 ms`, `5.00 s`). The value is rounded first and the integer digits
/// are grouped afterwards, so the two decimals always survive (`1,000.00 ms`).
pub fn format_duration(ns: i64, format: DurationFormat) -> String {
    if ns < NS_DISPLAY_LIMIT {
        format!("{} ns", group_digits(&ns.to_string()))
    } else if format.always_ms || ns < NS_PER_S {
        format!("{} ms", format_fixed2(ns as f64 / NS_PER_MS as f64))
    } else {
        format!("{} s", format_fixed2(ns as f64 / NS_PER_S as f64))
    }
}

/// Formats a percentage with two decimals. Non-finite values come out as
/// `NaN`, `Infinity` or `-Infinity` so a broken ratio is still recognizable.
pub fn format_percentage(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value.is_infinite() {
        if value > 0.0 {
            "Infinity".to_owned()
        } else {
            "-Infinity".to_owned()
        }
    } else {
        format!("{:.2}", round2(value))
    }
}

// Halves round away from zero (1.125 -> 1.13), `{:.2}` alone would round them to even
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn format_fixed2(value: f64) -> String {
    let rounded = format!("{:.2}", round2(value));
    match rounded.split_once('.') {
        Some((int, frac)) => format!("{}.{}", group_digits(int), frac),
        None => group_digits(&rounded),
    }
}

// en-US grouping: comma every three digits, sign preserved
fn group_digits(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let mut result = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    result.push_str(sign);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: DurationFormat = DurationFormat { always_ms: false };
    const ALWAYS_MS: DurationFormat = DurationFormat { always_ms: true };

    #[test]
    fn nanoseconds_are_grouped() {
        assert_eq!(format_duration(0, PLAIN), "0 ns");
        assert_eq!(format_duration(999, PLAIN), "999 ns");
        assert_eq!(format_duration(50_000, PLAIN), "50,000 ns");
        assert_eq!(format_duration(99_999, ALWAYS_MS), "99,999 ns");
    }

    #[test]
    fn milliseconds_below_one_second() {
        assert_eq!(format_duration(100_000, PLAIN), "0.10 ms");
        assert_eq!(format_duration(5_000_000, PLAIN), "5.00 ms");
        assert_eq!(format_duration(999_994_999, PLAIN), "999.99 ms");
    }

    #[test]
    fn seconds_unless_always_ms() {
        assert_eq!(format_duration(5_000_000_000, PLAIN), "5.00 s");
        assert_eq!(format_duration(1_234_000_000_000, PLAIN), "1,234.00 s");
        assert_eq!(format_duration(5_000_000_000, ALWAYS_MS), "5,000.00 ms");
        assert_eq!(format_duration(1_000_000_000, ALWAYS_MS), "1,000.00 ms");
    }

    #[test]
    fn halves_round_up() {
        assert_eq!(format_duration(1_125_000, PLAIN), "1.13 ms");
        assert_eq!(format_duration(2_625_000_000, PLAIN), "2.63 s");
        assert_eq!(format_percentage(0.125), "0.13");
        assert_eq!(format_percentage(12.5), "12.50");
    }

    #[test]
    fn grouping() {
        assert_eq!(group_digits("1"), "1");
        assert_eq!(group_digits("123"), "123");
        assert_eq!(group_digits("1234"), "1,234");
        assert_eq!(group_digits("1234567"), "1,234,567");
        assert_eq!(group_digits("-1234"), "-1,234");
    }

    #[test]
    fn percentages() {
        assert_eq!(format_percentage(25.0), "25.00");
        assert_eq!(format_percentage(100.0 / 3.0), "33.33");
        assert_eq!(format_percentage(f64::NAN), "NaN");
        assert_eq!(format_percentage(f64::INFINITY), "Infinity");
        assert_eq!(format_percentage(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn interval_display() {
        let interval = Interval::new(Timestamp(1_000_000), Timestamp(3_500_000));
        assert_eq!(interval.duration_ns(), 2_500_000);
        assert_eq!(
            interval.to_string(),
            "from 1.000 to 3.500 ms (duration: 2.50 ms)"
        );
    }
}

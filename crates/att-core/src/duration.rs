//! Display decomposition of millisecond durations.

use std::fmt;

use serde::Serialize;

/// A duration split into whole hours, minutes and seconds.
///
/// Each part is floored; sub-second remainders are dropped, never rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HoursMinutesSeconds {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl HoursMinutesSeconds {
    /// Negative inputs are treated as zero.
    pub const fn from_millis(ms: i64) -> Self {
        let total_seconds = if ms < 0 { 0 } else { ms / 1000 };
        Self {
            hours: total_seconds / 3600,
            minutes: (total_seconds % 3600) / 60,
            seconds: total_seconds % 60,
        }
    }
}

impl fmt::Display for HoursMinutesSeconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {:02}m {:02}s", self.hours, self.minutes, self.seconds)
    }
}

/// Formats milliseconds as `Xh YYm ZZs`.
pub fn format_duration(ms: i64) -> String {
    HoursMinutesSeconds::from_millis(ms).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_with_floor_division() {
        let parts = HoursMinutesSeconds::from_millis(4 * 3_600_000 + 59 * 60_000 + 59_999);
        assert_eq!(
            parts,
            HoursMinutesSeconds {
                hours: 4,
                minutes: 59,
                seconds: 59
            }
        );
    }

    #[test]
    fn negative_is_zero() {
        assert_eq!(format_duration(-5), "0h 00m 00s");
    }

    #[test]
    fn formats_long_days() {
        assert_eq!(format_duration((8 * 60 + 15) * 60_000), "8h 15m 00s");
        assert_eq!(format_duration(30 * 3_600_000), "30h 00m 00s");
    }
}

/// Clock-style timecode used for ruler labels and bookmark ranges.

use std::fmt;

use crate::Frame;

/// Wall-clock position split into components, millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timecode {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub millis: u32,
}

impl Timecode {
    /// Negative and non-finite inputs clamp to zero.
    pub fn from_seconds(seconds: f64) -> Self {
        let total_ms = if seconds.is_finite() {
            (seconds.max(0.0) * 1000.0).round() as u64
        } else {
            0
        };
        Self::from_millis(total_ms)
    }

    pub fn from_millis(total_ms: u64) -> Self {
        let total_seconds = total_ms / 1000;
        Self {
            hours: (total_seconds / 3600) as u32,
            minutes: ((total_seconds % 3600) / 60) as u32,
            seconds: (total_seconds % 60) as u32,
            millis: (total_ms % 1000) as u32,
        }
    }

    pub fn from_frame(frame: Frame, frame_rate: f64) -> Self {
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            return Self::from_millis(0);
        }
        Self::from_seconds(frame.max(0) as f64 / frame_rate)
    }

    pub fn total_millis(&self) -> u64 {
        let secs = self.hours as u64 * 3600 + self.minutes as u64 * 60 + self.seconds as u64;
        secs * 1000 + self.millis as u64
    }

    pub fn total_seconds(&self) -> f64 {
        self.total_millis() as f64 / 1000.0
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hours > 0 {
            write!(f, "{}:{:02}:{:02}", self.hours, self.minutes, self.seconds)?;
        } else {
            write!(f, "{}:{:02}", self.minutes, self.seconds)?;
        }
        if self.millis > 0 {
            let fraction = format!("{:03}", self.millis);
            write!(f, ".{}", fraction.trim_end_matches('0'))?;
        }
        Ok(())
    }
}

/// Ruler label for a tick at `seconds`.
pub fn format_timecode(seconds: f64) -> String {
    Timecode::from_seconds(seconds).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_short_and_long_positions() {
        assert_eq!(format_timecode(0.0), "0:00");
        assert_eq!(format_timecode(75.0), "1:15");
        assert_eq!(format_timecode(3600.0), "1:00:00");
        assert_eq!(format_timecode(3725.5), "1:02:05.5");
        assert_eq!(format_timecode(0.25), "0:00.25");
    }

    #[test]
    fn clamps_bad_input() {
        assert_eq!(format_timecode(-4.0), "0:00");
        assert_eq!(format_timecode(f64::NAN), "0:00");
    }

    #[test]
    fn from_frame_uses_rate() {
        assert_eq!(Timecode::from_frame(45, 30.0).to_string(), "0:01.5");
        assert_eq!(Timecode::from_frame(45, 0.0).to_string(), "0:00");
    }
}

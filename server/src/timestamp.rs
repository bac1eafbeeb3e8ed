//! Centisecond-of-day timestamps.

use std::ops::Sub;
use std::time::{SystemTime, UNIX_EPOCH};

/// Centiseconds in one day
pub const DAY_CENTISECONDS: i32 = 8_640_000;

/// Time of day in centiseconds, `[0, DAY_CENTISECONDS)`, or unset.
///
/// Subtraction wraps across midnight: a later subtrahend is treated as
/// belonging to the previous day. If either side is unset the other side's
/// raw value is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp(i32);

impl Timestamp {
    pub const UNSET: Timestamp = Timestamp(-1);

    pub fn new(centiseconds: i32) -> Self {
        if centiseconds < 0 {
            return Self::UNSET;
        }
        Self(centiseconds % DAY_CENTISECONDS)
    }

    /// Current wall-clock time of day (UTC)
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let centis = (elapsed.as_millis() / 10) % DAY_CENTISECONDS as u128;
        Self(centis as i32)
    }

    pub fn is_set(&self) -> bool {
        self.0 != -1
    }

    pub fn raw(&self) -> i32 {
        self.0
    }

    /// This timestamp moved forward by `centiseconds`, wrapping at midnight
    pub fn add(&self, centiseconds: i32) -> Self {
        if !self.is_set() {
            return *self;
        }
        Self((self.0 + centiseconds.rem_euclid(DAY_CENTISECONDS)) % DAY_CENTISECONDS)
    }

    pub fn hour(&self) -> i32 {
        self.0 / 360_000
    }

    pub fn minute(&self) -> i32 {
        self.0 / 6_000 - self.hour() * 60
    }

    pub fn second(&self) -> i32 {
        self.0 / 100 - self.hour() * 3_600 - self.minute() * 60
    }

    pub fn millisecond(&self) -> i32 {
        self.0 * 10 - self.hour() * 3_600_000 - self.minute() * 60_000 - self.second() * 1_000
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::UNSET
    }
}

impl Sub for Timestamp {
    type Output = i32;

    fn sub(self, rhs: Timestamp) -> i32 {
        if !self.is_set() {
            return rhs.0;
        }
        if !rhs.is_set() {
            return self.0;
        }

        if rhs.0 > self.0 {
            self.0 - rhs.0 + DAY_CENTISECONDS
        } else {
            self.0 - rhs.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtraction_wraps_midnight() {
        assert_eq!(Timestamp::new(100) - Timestamp::new(8_639_990), 110);
        assert_eq!(Timestamp::new(500) - Timestamp::new(200), 300);
        assert_eq!(Timestamp::new(200) - Timestamp::new(200), 0);
    }

    #[test]
    fn test_unset_operand_returns_other_raw_value() {
        assert_eq!(Timestamp::UNSET - Timestamp::new(1234), 1234);
        assert_eq!(Timestamp::new(1234) - Timestamp::UNSET, 1234);
        assert_eq!(Timestamp::default() - Timestamp::UNSET, -1);
    }

    #[test]
    fn test_construction_reduces_modulo_day() {
        assert_eq!(Timestamp::new(DAY_CENTISECONDS + 5).raw(), 5);
        assert!(!Timestamp::new(-7).is_set());
    }

    #[test]
    fn test_add_wraps() {
        let late = Timestamp::new(DAY_CENTISECONDS - 10);
        let fired = late.add(30);
        assert_eq!(fired.raw(), 20);
        assert_eq!(fired - late, 30);
        assert!(!Timestamp::UNSET.add(30).is_set());
    }

    #[test]
    fn test_clock_fields() {
        // 13:45:07.250
        let ts = Timestamp::new(13 * 360_000 + 45 * 6_000 + 7 * 100 + 25);
        assert_eq!(ts.hour(), 13);
        assert_eq!(ts.minute(), 45);
        assert_eq!(ts.second(), 7);
        assert_eq!(ts.millisecond(), 250);
    }
}

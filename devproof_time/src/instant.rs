//
// Copyright 2025 The Project Oak Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! A point in time measured in whole seconds relative to the Unix epoch.
//!
//! Seconds are the granularity of ledger block timestamps, which is where the
//! timelock is normally evaluated, so sub-second precision is deliberately not
//! represented. Durations added to an `Instant` are truncated to whole seconds.

use core::{
    fmt,
    ops::{Add, AddAssign, Sub, SubAssign},
    time::Duration,
};

pub const UNIX_EPOCH: Instant = Instant { seconds: 0 };

/// Represents a specific moment in time.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Instant {
    seconds: i64,
}

impl Instant {
    pub const UNIX_EPOCH: Instant = UNIX_EPOCH;

    /// Creates a new `Instant` from the number of seconds since the Unix
    /// epoch.
    pub const fn from_unix_seconds(unix_epoch_seconds: i64) -> Self {
        Instant { seconds: unix_epoch_seconds }
    }

    /// Converts this instant into the number of seconds since the Unix epoch.
    pub const fn into_unix_seconds(self) -> i64 {
        self.seconds
    }

    /// Returns `self + duration`, or `None` if the result does not fit.
    pub fn checked_add(self, duration: Duration) -> Option<Self> {
        let seconds = i64::try_from(duration.as_secs()).ok()?;
        self.seconds.checked_add(seconds).map(Instant::from_unix_seconds)
    }

    /// Returns `self - duration`, or `None` if the result does not fit.
    pub fn checked_sub(self, duration: Duration) -> Option<Self> {
        let seconds = i64::try_from(duration.as_secs()).ok()?;
        self.seconds.checked_sub(seconds).map(Instant::from_unix_seconds)
    }

    /// Returns the amount of time elapsed from `earlier` to `self`, or zero if
    /// `earlier` is later than `self`.
    pub fn saturating_duration_since(self, earlier: Instant) -> Duration {
        let diff = self.seconds.saturating_sub(earlier.seconds);
        Duration::from_secs(u64::try_from(diff).unwrap_or(0))
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.seconds)
    }
}

/// Panics on overflow, like the standard library time types. Use
/// [`Instant::checked_add`] where the duration is untrusted.
impl Add<Duration> for Instant {
    type Output = Self;

    fn add(self, other: Duration) -> Self::Output {
        self.checked_add(other).expect("overflow when adding duration to instant")
    }
}

impl AddAssign<Duration> for Instant {
    fn add_assign(&mut self, other: Duration) {
        *self = *self + other;
    }
}

impl Sub<Duration> for Instant {
    type Output = Self;

    fn sub(self, other: Duration) -> Self::Output {
        self.checked_sub(other).expect("overflow when subtracting duration from instant")
    }
}

impl SubAssign<Duration> for Instant {
    fn sub_assign(&mut self, other: Duration) {
        *self = *self - other;
    }
}

impl Sub<Instant> for Instant {
    type Output = Duration;

    /// Panics if `other` is later than `self`.
    fn sub(self, other: Instant) -> Self::Output {
        let diff = self.seconds - other.seconds;
        Duration::from_secs(u64::try_from(diff).expect("subtracted a later instant"))
    }
}

#[cfg(feature = "std")]
impl From<std::time::SystemTime> for Instant {
    fn from(time: std::time::SystemTime) -> Self {
        match time.duration_since(std::time::UNIX_EPOCH) {
            Ok(duration) => UNIX_EPOCH + duration,
            Err(err) => UNIX_EPOCH - err.duration(),
        }
    }
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    #[googletest::test]
    fn test_unix_seconds_conversion_example() {
        const EXPECTED_SECONDS: i64 = 1234567890;
        let instant = Instant::from_unix_seconds(EXPECTED_SECONDS);
        assert_that!(instant.into_unix_seconds(), eq(EXPECTED_SECONDS));
    }

    #[googletest::test]
    fn test_add_truncates_to_whole_seconds() {
        let instant = Instant::from_unix_seconds(1000);
        assert_that!(
            instant + Duration::from_millis(120_999),
            eq(Instant::from_unix_seconds(1120))
        );
    }

    #[googletest::test]
    fn test_checked_add_overflow() {
        let instant = Instant::from_unix_seconds(i64::MAX);
        assert_that!(instant.checked_add(Duration::from_secs(1)), none());
        assert_that!(Instant::UNIX_EPOCH.checked_add(Duration::from_secs(u64::MAX)), none());
    }

    #[googletest::test]
    fn test_instant_sub_instant() {
        let earlier = Instant::from_unix_seconds(1000);
        let later = Instant::from_unix_seconds(1120);
        assert_that!(later - earlier, eq(Duration::from_secs(120)));
        assert_that!(earlier.saturating_duration_since(later), eq(Duration::ZERO));
    }

    #[cfg(feature = "std")]
    #[googletest::test]
    fn test_from_system_time_before_epoch() {
        let system_time = std::time::UNIX_EPOCH - Duration::from_secs(54321);
        assert_that!(Instant::from(system_time), eq(Instant::from_unix_seconds(-54321)));
    }
}

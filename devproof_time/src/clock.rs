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

use core::{
    sync::atomic::{AtomicI64, Ordering},
    time::Duration,
};

use crate::instant::Instant;

/// A time source that can provide the current time as an `Instant`.
///
/// Object-safe so that it can be injected as `Box<dyn Clock>`.
pub trait Clock: Send + Sync {
    fn get_time(&self) -> Instant;
}

/// A `Clock` that always returns the same time.
pub struct FixedClock {
    time: Instant,
}

impl FixedClock {
    pub fn at_instant(time: Instant) -> Self {
        FixedClock { time }
    }
}

impl Clock for FixedClock {
    fn get_time(&self) -> Instant {
        self.time
    }
}

/// A `Clock` that only moves when told to. Used to step across timelock
/// boundaries one second at a time.
pub struct ManualClock {
    seconds: AtomicI64,
}

impl ManualClock {
    pub fn at_instant(time: Instant) -> Self {
        ManualClock { seconds: AtomicI64::new(time.into_unix_seconds()) }
    }

    pub fn advance(&self, duration: Duration) {
        let step = i64::try_from(duration.as_secs()).unwrap_or(i64::MAX);
        self.seconds.fetch_add(step, Ordering::SeqCst);
    }

    pub fn set(&self, time: Instant) {
        self.seconds.store(time.into_unix_seconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn get_time(&self) -> Instant {
        Instant::from_unix_seconds(self.seconds.load(Ordering::SeqCst))
    }
}

/// A `Clock` backed by `std::time::SystemTime`.
#[cfg(feature = "std")]
pub struct SystemClock;

#[cfg(feature = "std")]
impl Clock for SystemClock {
    fn get_time(&self) -> Instant {
        Instant::from(std::time::SystemTime::now())
    }
}

#[cfg(test)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    #[googletest::test]
    fn test_fixed_clock() {
        let now = Instant::from_unix_seconds(1234567890);
        let clock = FixedClock::at_instant(now);
        assert_that!(clock.get_time(), eq(now));
    }

    #[googletest::test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::at_instant(Instant::from_unix_seconds(1000));
        clock.advance(Duration::from_secs(119));
        assert_that!(clock.get_time(), eq(Instant::from_unix_seconds(1119)));
        clock.advance(Duration::from_secs(1));
        assert_that!(clock.get_time(), eq(Instant::from_unix_seconds(1120)));
    }

    #[cfg(feature = "std")]
    #[googletest::test]
    fn test_system_clock_returns_current_time() {
        let before = Instant::from(std::time::SystemTime::now());
        let time_from_clock = SystemClock.get_time();
        let after = Instant::from(std::time::SystemTime::now());
        assert_that!(time_from_clock, ge(before));
        assert_that!(time_from_clock, le(after));
    }
}

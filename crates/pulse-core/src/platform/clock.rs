// Copyright 2025 eraflo
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

//! Clock abstraction used for every elapsed-time measurement.

use std::fmt::Debug;
use std::time::Duration;

/// A point on a monotonic clock, in nanoseconds since the clock's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Mark(u64);

impl Mark {
    /// Creates a mark from nanoseconds since the clock origin.
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Nanoseconds since the clock origin.
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_duration_since(self, earlier: Mark) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

/// The most precise monotonic clock the host offers, plus wall-clock time
/// for sample timestamps.
///
/// Elapsed time is never derived from the wall clock, so clock adjustments
/// cannot skew a measurement.
pub trait Clock: Send + Sync + Debug + 'static {
    /// Reads the monotonic clock.
    fn now(&self) -> Mark;

    /// Wall-clock time in unix milliseconds, used only to timestamp samples.
    fn wall_clock_millis(&self) -> i64;

    /// Seconds elapsed since `start`; never negative.
    fn elapsed_seconds(&self, start: Mark) -> f64 {
        self.now().saturating_duration_since(start).as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_since_saturates() {
        let early = Mark::from_nanos(1_000);
        let late = Mark::from_nanos(3_500);
        assert_eq!(late.saturating_duration_since(early), Duration::from_nanos(2_500));
        assert_eq!(early.saturating_duration_since(late), Duration::ZERO);
    }
}

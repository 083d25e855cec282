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

//! A monotonic clock anchored at construction.

use pulse_core::platform::{Clock, Mark};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Monotonic marks from [`Instant`], wall time from [`SystemTime`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose marks count from now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Mark {
        let nanos = self.origin.elapsed().as_nanos();
        Mark::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn wall_clock_millis(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since_epoch) => i64::try_from(since_epoch.as_millis()).unwrap_or(i64::MAX),
            // System clock set before 1970.
            Err(before_epoch) => -i64::try_from(before_epoch.duration().as_millis()).unwrap_or(i64::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_marks_never_go_backwards() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        std::thread::sleep(Duration::from_millis(2));
        let second = clock.now();
        assert!(second > first);
        assert!(clock.elapsed_seconds(first) >= 0.002);
    }

    #[test]
    fn test_wall_clock_is_after_2020() {
        let clock = MonotonicClock::new();
        assert!(clock.wall_clock_millis() > 1_577_836_800_000);
    }
}

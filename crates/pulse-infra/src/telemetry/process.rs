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

//! Process statistics from sysinfo, with file descriptors read from procfs.

use pulse_core::platform::{ProcessSnapshot, ProcessStatsSource};
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::error::{InfraError, InfraResult};

/// How long a sample is reused. The process producers of one refresh tick all
/// read within this window and share a single sample.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_millis(100);

struct Sampler {
    system: System,
    latest: Option<(Instant, ProcessSnapshot)>,
    taken: u64,
}

/// Samples the current process, reusing a sample younger than `max_age`.
pub struct SysinfoProcessStats {
    pid: Pid,
    max_age: Duration,
    sampler: Mutex<Sampler>,
}

impl SysinfoProcessStats {
    /// Inspects the current process.
    pub fn new() -> InfraResult<Self> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| InfraError::ProcessUnavailable(e.to_string()))?;
        Ok(Self {
            pid,
            max_age: DEFAULT_MAX_AGE,
            sampler: Mutex::new(Sampler {
                system: System::new(),
                latest: None,
                taken: 0,
            }),
        })
    }

    /// Sets how long a sample is reused; zero samples on every call.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// The inspected process.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Number of fresh samples taken so far.
    pub fn samples_taken(&self) -> u64 {
        self.sampler().taken
    }

    fn sampler(&self) -> MutexGuard<'_, Sampler> {
        match self.sampler.lock() {
            Ok(sampler) => sampler,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl fmt::Debug for SysinfoProcessStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SysinfoProcessStats")
            .field("pid", &self.pid)
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl ProcessStatsSource for SysinfoProcessStats {
    fn snapshot(&self) -> ProcessSnapshot {
        let mut sampler = self.sampler();
        if let Some((taken_at, snapshot)) = sampler.latest {
            if taken_at.elapsed() < self.max_age {
                return snapshot;
            }
        }

        let mut snapshot = ProcessSnapshot {
            open_fds: fds::open(),
            max_fds: fds::limit(),
            ..ProcessSnapshot::default()
        };
        sampler.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );
        match sampler.system.process(self.pid) {
            Some(process) => {
                snapshot.cpu_seconds = Some(process.accumulated_cpu_time() as f64 / 1000.0);
                snapshot.resident_memory_bytes = Some(process.memory());
                snapshot.virtual_memory_bytes = Some(process.virtual_memory());
                snapshot.start_time_seconds = Some(process.start_time());
                snapshot.uptime_seconds = Some(process.run_time());
            }
            None => log::debug!("Process {} not found by sysinfo", self.pid),
        }

        sampler.latest = Some((Instant::now(), snapshot));
        sampler.taken += 1;
        snapshot
    }
}

#[cfg(target_os = "linux")]
mod fds {
    use std::fs;

    pub fn open() -> Option<u64> {
        let entries = fs::read_dir("/proc/self/fd").ok()?;
        // The directory handle used for listing is one of the entries.
        Some((entries.count() as u64).saturating_sub(1))
    }

    pub fn limit() -> Option<u64> {
        let limits = fs::read_to_string("/proc/self/limits").ok()?;
        super::parse_open_files_limit(&limits)
    }
}

#[cfg(not(target_os = "linux"))]
mod fds {
    pub fn open() -> Option<u64> {
        None
    }

    pub fn limit() -> Option<u64> {
        None
    }
}

/// Soft limit from the `Max open files` row of a procfs limits table.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_open_files_limit(limits: &str) -> Option<u64> {
    let row = limits
        .lines()
        .find_map(|line| line.strip_prefix("Max open files"))?;
    row.split_whitespace().next()?.parse().ok()
}

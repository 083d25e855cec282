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

//! Process and runtime resource statistics.

use std::fmt::Debug;

/// Resource usage of the host process. Fields the host cannot report are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessSnapshot {
    /// Total CPU time consumed, in seconds.
    pub cpu_seconds: Option<f64>,
    /// Resident set size, in bytes.
    pub resident_memory_bytes: Option<u64>,
    /// Virtual memory size, in bytes.
    pub virtual_memory_bytes: Option<u64>,
    /// Process start time, in unix seconds.
    pub start_time_seconds: Option<u64>,
    /// Time since the process started, in seconds.
    pub uptime_seconds: Option<u64>,
    /// Number of open file descriptors.
    pub open_fds: Option<u64>,
    /// Soft limit on open file descriptors.
    pub max_fds: Option<u64>,
}

/// Source of [`ProcessSnapshot`]s.
pub trait ProcessStatsSource: Send + Sync + Debug + 'static {
    /// Samples the current process.
    fn snapshot(&self) -> ProcessSnapshot;
}

/// Shape and load of the async runtime hosting the collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeSnapshot {
    /// Number of worker threads.
    pub workers: u64,
    /// Number of tasks currently alive.
    pub alive_tasks: u64,
    /// Number of tasks waiting in the global queue.
    pub global_queue_depth: u64,
}

/// Source of [`RuntimeSnapshot`]s.
pub trait RuntimeStatsSource: Send + Sync + Debug + 'static {
    /// Samples the runtime.
    fn snapshot(&self) -> RuntimeSnapshot;
}

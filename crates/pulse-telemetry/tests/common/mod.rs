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

//! Deterministic platform doubles.
//!
//! Shared between the unit tests of the crate and its integration tests, so it
//! only depends on `pulse_core` and std.

#![allow(dead_code)]

use pulse_core::platform::{
    AsyncId, Clock, DeferredScheduler, DeferredWork, DelayMonitor, DelaySampler, HookDispatcher,
    LifecycleHooks, Mark, ProcessSnapshot, ProcessStatsSource, ResourceKind, RuntimeSnapshot,
    RuntimeStatsSource, TickAction, TimerHandle,
};
use pulse_core::telemetry::{HistogramSnapshot, MetricsError, MetricsResult};
use pulse_core::Platform;
use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
    wall_millis: AtomicI64,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            nanos: AtomicU64::new(1_000_000),
            wall_millis: AtomicI64::new(1_700_000_000_000),
        })
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
        self.wall_millis
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Mark {
        Mark::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn wall_clock_millis(&self) -> i64 {
        self.wall_millis.load(Ordering::SeqCst)
    }
}

struct Pending {
    id: AsyncId,
    work: DeferredWork,
}

struct TimerState {
    period: Duration,
    action: TickAction,
    active: AtomicBool,
}

#[derive(Clone)]
struct ManualTimer(Arc<TimerState>);

impl fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualTimer")
            .field("period", &self.0.period)
            .field("active", &self.is_active())
            .finish()
    }
}

impl TimerHandle for ManualTimer {
    fn cancel(&self) {
        self.0.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.0.active.load(Ordering::SeqCst)
    }
}

/// A scheduler whose queue and timers are driven by the test.
///
/// Deferred work is announced to the lifecycle hooks exactly like a real
/// scheduler would: init when queued, then before/after/destroy around the run.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<VecDeque<Pending>>,
    timers: Mutex<Vec<ManualTimer>>,
    hooks: Arc<HookDispatcher>,
}

impl ManualScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn hooks(&self) -> Arc<HookDispatcher> {
        Arc::clone(&self.hooks)
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Runs everything queued so far; work queued meanwhile waits for the next pass.
    pub fn run_pending(&self) -> usize {
        let batch: Vec<Pending> = self.queue.lock().unwrap().drain(..).collect();
        let ran = batch.len();
        for Pending { id, work } in batch {
            self.hooks.emit_before(id);
            work();
            self.hooks.emit_after(id);
            self.hooks.emit_destroy(id);
        }
        ran
    }

    /// Runs the oldest queued item only.
    pub fn run_next(&self) -> bool {
        let next = self.queue.lock().unwrap().pop_front();
        match next {
            Some(Pending { id, work }) => {
                self.hooks.emit_before(id);
                work();
                self.hooks.emit_after(id);
                self.hooks.emit_destroy(id);
                true
            }
            None => false,
        }
    }

    /// Fires every active timer once.
    pub fn fire_timers(&self) -> usize {
        let timers: Vec<ManualTimer> = self
            .timers
            .lock()
            .unwrap()
            .iter()
            .filter(|timer| timer.is_active())
            .cloned()
            .collect();
        for timer in &timers {
            (timer.0.action)();
        }
        timers.len()
    }

    pub fn active_timers(&self) -> usize {
        self.timers
            .lock()
            .unwrap()
            .iter()
            .filter(|timer| timer.is_active())
            .count()
    }

    pub fn timer_periods(&self) -> Vec<Duration> {
        self.timers
            .lock()
            .unwrap()
            .iter()
            .filter(|timer| timer.is_active())
            .map(|timer| timer.0.period)
            .collect()
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .field("active_timers", &self.active_timers())
            .finish()
    }
}

impl DeferredScheduler for ManualScheduler {
    fn defer_named(
        &self,
        kind: ResourceKind,
        callback_name: Option<Cow<'static, str>>,
        work: DeferredWork,
    ) {
        let id = self.hooks.next_async_id();
        self.hooks.emit_init(id, kind, callback_name.as_deref());
        self.queue.lock().unwrap().push_back(Pending { id, work });
    }

    fn every(&self, period: Duration, action: TickAction) -> Box<dyn TimerHandle> {
        let timer = ManualTimer(Arc::new(TimerState {
            period,
            action,
            active: AtomicBool::new(true),
        }));
        self.timers.lock().unwrap().push(timer.clone());
        Box::new(timer)
    }
}

/// A delay monitor whose statistics are set by the test.
#[derive(Debug, Default)]
pub struct FakeDelayMonitor {
    snapshot: Arc<Mutex<HistogramSnapshot>>,
    live_samplers: Arc<AtomicUsize>,
    resolutions: Mutex<Vec<Duration>>,
    broken: AtomicBool,
}

impl FakeDelayMonitor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_snapshot(&self, snapshot: HistogramSnapshot) {
        *self.snapshot.lock().unwrap() = snapshot;
    }

    pub fn live_samplers(&self) -> usize {
        self.live_samplers.load(Ordering::SeqCst)
    }

    pub fn resolutions(&self) -> Vec<Duration> {
        self.resolutions.lock().unwrap().clone()
    }

    /// Makes every later `enable` call fail.
    pub fn break_sampling(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct FakeSampler {
    snapshot: Arc<Mutex<HistogramSnapshot>>,
    live: Arc<AtomicUsize>,
}

impl DelaySampler for FakeSampler {
    fn snapshot(&self) -> HistogramSnapshot {
        *self.snapshot.lock().unwrap()
    }
}

impl Drop for FakeSampler {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl DelayMonitor for FakeDelayMonitor {
    fn enable(&self, resolution: Duration) -> MetricsResult<Box<dyn DelaySampler>> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(MetricsError::InvalidOperation(
                "sampling unavailable".to_string(),
            ));
        }
        self.resolutions.lock().unwrap().push(resolution);
        self.live_samplers.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSampler {
            snapshot: Arc::clone(&self.snapshot),
            live: Arc::clone(&self.live_samplers),
        }))
    }
}

/// Process statistics fixed by the test.
#[derive(Debug, Default)]
pub struct FakeProcessStats(pub Mutex<ProcessSnapshot>);

impl FakeProcessStats {
    pub fn new(snapshot: ProcessSnapshot) -> Arc<Self> {
        Arc::new(Self(Mutex::new(snapshot)))
    }
}

impl ProcessStatsSource for FakeProcessStats {
    fn snapshot(&self) -> ProcessSnapshot {
        *self.0.lock().unwrap()
    }
}

/// Runtime statistics fixed by the test.
#[derive(Debug, Default)]
pub struct FakeRuntimeStats(pub RuntimeSnapshot);

impl RuntimeStatsSource for FakeRuntimeStats {
    fn snapshot(&self) -> RuntimeSnapshot {
        self.0
    }
}

pub fn sample_process_snapshot() -> ProcessSnapshot {
    ProcessSnapshot {
        cpu_seconds: Some(1.5),
        resident_memory_bytes: Some(64 * 1024 * 1024),
        virtual_memory_bytes: Some(512 * 1024 * 1024),
        start_time_seconds: Some(1_700_000_000),
        uptime_seconds: Some(42),
        open_fds: Some(12),
        max_fds: Some(1024),
    }
}

/// Handles on every double behind a [`Platform`].
#[derive(Debug, Clone)]
pub struct Doubles {
    pub clock: Arc<ManualClock>,
    pub scheduler: Arc<ManualScheduler>,
    pub delay: Arc<FakeDelayMonitor>,
    pub hooks: Arc<HookDispatcher>,
    pub process: Arc<FakeProcessStats>,
}

impl Doubles {
    pub fn new() -> Self {
        let scheduler = ManualScheduler::new();
        Self {
            clock: ManualClock::new(),
            hooks: scheduler.hooks(),
            scheduler,
            delay: FakeDelayMonitor::new(),
            process: FakeProcessStats::new(sample_process_snapshot()),
        }
    }

    /// Clock and scheduler only: fallback lag, no tracing, no statistics.
    pub fn minimal_platform(&self) -> Platform {
        Platform::new(self.clock.clone(), self.scheduler.clone())
    }

    /// Every facility present.
    pub fn full_platform(&self) -> Platform {
        self.minimal_platform()
            .with_delay_monitor(self.delay.clone())
            .with_lifecycle_hooks(self.hooks.clone() as Arc<dyn LifecycleHooks>)
            .with_process_stats(self.process.clone())
            .with_runtime_stats(Arc::new(FakeRuntimeStats(RuntimeSnapshot {
                workers: 4,
                alive_tasks: 7,
                global_queue_depth: 2,
            })))
    }
}

impl Default for Doubles {
    fn default() -> Self {
        Self::new()
    }
}

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

//! Host facilities the collector depends on.
//!
//! A [`Platform`] bundles one implementation of each facility. The clock and
//! the scheduler are mandatory; everything else is optional, and its presence
//! is what [`Capabilities`] reports. Capabilities are resolved once, when the
//! platform is assembled, and the platform is then injected into the collector.

pub mod clock;
pub mod delay;
pub mod hooks;
pub mod scheduler;
pub mod stats;

pub use self::clock::{Clock, Mark};
pub use self::delay::{DelayMonitor, DelaySampler};
pub use self::hooks::{AsyncHook, AsyncId, HookDispatcher, HookId, LifecycleHooks, ResourceKind};
pub use self::scheduler::{DeferredScheduler, DeferredWork, TickAction, TimerHandle};
pub use self::stats::{ProcessSnapshot, ProcessStatsSource, RuntimeSnapshot, RuntimeStatsSource};

use std::sync::Arc;

/// Explicit capability detection.
pub trait CapabilityQuery {
    /// Whether a native event-loop-delay histogram facility is available.
    fn supports_precise_lag(&self) -> bool;

    /// Whether a lifecycle-hook subsystem is available.
    fn supports_lifecycle_hooks(&self) -> bool;
}

/// The resolved capabilities of a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// A [`DelayMonitor`] is available.
    pub precise_lag: bool,
    /// A [`LifecycleHooks`] subsystem is available.
    pub lifecycle_hooks: bool,
}

impl CapabilityQuery for Capabilities {
    fn supports_precise_lag(&self) -> bool {
        self.precise_lag
    }

    fn supports_lifecycle_hooks(&self) -> bool {
        self.lifecycle_hooks
    }
}

/// The set of host facilities injected into the collector.
#[derive(Debug, Clone)]
pub struct Platform {
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn DeferredScheduler>,
    delay_monitor: Option<Arc<dyn DelayMonitor>>,
    lifecycle_hooks: Option<Arc<dyn LifecycleHooks>>,
    process_stats: Option<Arc<dyn ProcessStatsSource>>,
    runtime_stats: Option<Arc<dyn RuntimeStatsSource>>,
}

impl Platform {
    /// Creates a minimal platform: clock and scheduler only.
    pub fn new(clock: Arc<dyn Clock>, scheduler: Arc<dyn DeferredScheduler>) -> Self {
        Self {
            clock,
            scheduler,
            delay_monitor: None,
            lifecycle_hooks: None,
            process_stats: None,
            runtime_stats: None,
        }
    }

    /// Adds a native event-loop-delay facility.
    pub fn with_delay_monitor(mut self, monitor: Arc<dyn DelayMonitor>) -> Self {
        self.delay_monitor = Some(monitor);
        self
    }

    /// Adds a lifecycle-hook subsystem.
    pub fn with_lifecycle_hooks(mut self, hooks: Arc<dyn LifecycleHooks>) -> Self {
        self.lifecycle_hooks = Some(hooks);
        self
    }

    /// Adds a process statistics source.
    pub fn with_process_stats(mut self, source: Arc<dyn ProcessStatsSource>) -> Self {
        self.process_stats = Some(source);
        self
    }

    /// Adds a runtime statistics source.
    pub fn with_runtime_stats(mut self, source: Arc<dyn RuntimeStatsSource>) -> Self {
        self.runtime_stats = Some(source);
        self
    }

    /// The resolved capabilities of this platform.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            precise_lag: self.delay_monitor.is_some(),
            lifecycle_hooks: self.lifecycle_hooks.is_some(),
        }
    }

    /// The monotonic clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The cooperative scheduler.
    pub fn scheduler(&self) -> &Arc<dyn DeferredScheduler> {
        &self.scheduler
    }

    /// The event-loop-delay facility, if any.
    pub fn delay_monitor(&self) -> Option<&Arc<dyn DelayMonitor>> {
        self.delay_monitor.as_ref()
    }

    /// The lifecycle-hook subsystem, if any.
    pub fn lifecycle_hooks(&self) -> Option<&Arc<dyn LifecycleHooks>> {
        self.lifecycle_hooks.as_ref()
    }

    /// The process statistics source, if any.
    pub fn process_stats(&self) -> Option<&Arc<dyn ProcessStatsSource>> {
        self.process_stats.as_ref()
    }

    /// The runtime statistics source, if any.
    pub fn runtime_stats(&self) -> Option<&Arc<dyn RuntimeStatsSource>> {
        self.runtime_stats.as_ref()
    }
}

impl CapabilityQuery for Platform {
    fn supports_precise_lag(&self) -> bool {
        self.capabilities().precise_lag
    }

    fn supports_lifecycle_hooks(&self) -> bool {
        self.capabilities().lifecycle_hooks
    }
}

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

//! Assembles the concrete [`Platform`] for the current process.

use crate::error::InfraResult;
use crate::platform::{MonotonicClock, SamplingDelayMonitor, TokioScheduler};
use crate::telemetry::{SysinfoProcessStats, TokioRuntimeStats};
use pulse_core::platform::LifecycleHooks;
use pulse_core::Platform;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Entry point for building the host platform.
///
/// The runtime must have its time driver enabled: the refresh timer and the
/// delay sampler both sleep on it.
#[derive(Debug, Clone, Copy)]
pub struct HostPlatform;

impl HostPlatform {
    /// Everything this build supports, on the runtime of the calling task.
    pub fn detect() -> InfraResult<Platform> {
        Ok(Self::builder(Handle::try_current()?).build())
    }

    /// A builder on `runtime` with every compiled-in facility enabled.
    pub fn builder(runtime: Handle) -> HostPlatformBuilder {
        HostPlatformBuilder {
            runtime,
            precise_lag: cfg!(feature = "precise-lag"),
            lifecycle_hooks: cfg!(feature = "lifecycle-hooks"),
            process_stats: true,
            runtime_stats: true,
        }
    }
}

/// Selects which optional facilities the platform exposes.
#[derive(Debug, Clone)]
pub struct HostPlatformBuilder {
    runtime: Handle,
    precise_lag: bool,
    lifecycle_hooks: bool,
    process_stats: bool,
    runtime_stats: bool,
}

impl HostPlatformBuilder {
    /// Sample event-loop delay with a background task.
    pub fn precise_lag(mut self, enabled: bool) -> Self {
        self.precise_lag = enabled;
        self
    }

    /// Expose the scheduler's lifecycle hooks.
    pub fn lifecycle_hooks(mut self, enabled: bool) -> Self {
        self.lifecycle_hooks = enabled;
        self
    }

    /// Read process statistics.
    pub fn process_stats(mut self, enabled: bool) -> Self {
        self.process_stats = enabled;
        self
    }

    /// Read runtime statistics.
    pub fn runtime_stats(mut self, enabled: bool) -> Self {
        self.runtime_stats = enabled;
        self
    }

    /// Builds the platform. A facility that cannot be initialized is left out.
    pub fn build(self) -> Platform {
        let scheduler = TokioScheduler::new(self.runtime.clone());
        let hooks = scheduler.hooks();
        let mut platform = Platform::new(Arc::new(MonotonicClock::new()), Arc::new(scheduler));

        if self.precise_lag {
            platform = platform.with_delay_monitor(Arc::new(SamplingDelayMonitor::new(
                self.runtime.clone(),
            )));
        }
        if self.lifecycle_hooks {
            platform = platform.with_lifecycle_hooks(hooks as Arc<dyn LifecycleHooks>);
        }
        if self.process_stats {
            match SysinfoProcessStats::new() {
                Ok(stats) => platform = platform.with_process_stats(Arc::new(stats)),
                Err(e) => log::warn!("Process statistics disabled: {}", e),
            }
        }
        if self.runtime_stats {
            platform = platform.with_runtime_stats(Arc::new(TokioRuntimeStats::new(self.runtime)));
        }

        log::debug!("Host platform ready with {:?}", platform.capabilities());
        platform
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_requires_a_runtime() {
        assert!(HostPlatform::detect().is_err());
    }

    #[tokio::test]
    async fn test_builder_toggles_facilities() {
        let platform = HostPlatform::builder(Handle::current())
            .precise_lag(false)
            .lifecycle_hooks(true)
            .process_stats(false)
            .build();

        let capabilities = platform.capabilities();
        assert!(!capabilities.precise_lag);
        assert!(capabilities.lifecycle_hooks);
        assert!(platform.process_stats().is_none());
        assert!(platform.runtime_stats().is_some());
    }

    #[cfg(all(feature = "precise-lag", feature = "lifecycle-hooks"))]
    #[tokio::test]
    async fn test_detect_enables_default_features() {
        let platform = HostPlatform::detect().unwrap();
        assert!(platform.capabilities().precise_lag);
        assert!(platform.capabilities().lifecycle_hooks);
    }
}

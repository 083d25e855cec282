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

//! The public-facing SDK of the collector.
//!
//! Most programs only need [`collect_default_metrics`]: called from inside a
//! tokio runtime, it detects the host platform once and keeps the default
//! producers refreshed until the process exits or [`stop_default_metrics`]
//! is called. Work deferred with [`defer_immediate`] or [`next_tick`] runs on
//! the same scheduler, so the callback-duration summaries can time it.

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use pulse_core::platform::{DeferredScheduler, ResourceKind};
use pulse_infra::HostPlatform;
use pulse_telemetry::producers;
use std::sync::{Arc, Mutex, MutexGuard};

pub use pulse_core::{Capabilities, Platform};
pub use pulse_telemetry::metrics::SeriesSnapshot;
pub use pulse_telemetry::{
    ActivationConfig, Collector, CollectorError, CollectorHandle, CollectorOptions,
    MetricsRegistry,
};

static DEFAULT_COLLECTOR: Lazy<Mutex<Option<Collector>>> = Lazy::new(|| Mutex::new(None));

fn default_collector() -> Result<MutexGuard<'static, Option<Collector>>> {
    DEFAULT_COLLECTOR
        .lock()
        .map_err(|_| anyhow!("default collector lock poisoned"))
}

/// Starts (or restarts) collection of the default metrics.
///
/// Accepts a [`CollectorOptions`], `None` for the defaults, or the deprecated
/// bare refresh period in milliseconds. The first call must happen inside a
/// tokio runtime; later calls reuse the platform detected then.
pub fn collect_default_metrics(config: impl Into<ActivationConfig>) -> Result<CollectorHandle> {
    let mut slot = default_collector()?;
    let collector = match slot.take() {
        Some(collector) => collector,
        None => {
            let platform = HostPlatform::detect()?;
            log::info!("Default collector created with {:?}", platform.capabilities());
            Collector::new(platform)
        }
    };
    Ok(slot.insert(collector).activate(config)?)
}

/// Stops the default collector. Its series stay registered.
pub fn stop_default_metrics() -> Result<()> {
    if let Some(collector) = default_collector()?.as_mut() {
        collector.stop();
    }
    Ok(())
}

/// The scheduler of the default collector.
///
/// Fails until [`collect_default_metrics`] has been called once.
pub fn default_scheduler() -> Result<Arc<dyn DeferredScheduler>> {
    default_collector()?
        .as_ref()
        .map(|collector| Arc::clone(collector.platform().scheduler()))
        .ok_or_else(|| anyhow!("the default collector has not been started"))
}

/// Runs `work` as an immediate on the default collector's scheduler.
pub fn defer_immediate(work: impl FnOnce() + Send + 'static) -> Result<()> {
    default_scheduler()?.defer(ResourceKind::Immediate, Box::new(work));
    Ok(())
}

/// Runs `work` as a tick callback on the default collector's scheduler.
pub fn next_tick(work: impl FnOnce() + Send + 'static) -> Result<()> {
    default_scheduler()?.defer(ResourceKind::Tick, Box::new(work));
    Ok(())
}

/// Names of the default producers, in refresh order.
pub fn default_metrics_list() -> Vec<&'static str> {
    producers::roster_names()
}

/// The process-wide registry used when no other is configured.
pub fn default_registry() -> MetricsRegistry {
    MetricsRegistry::global()
}

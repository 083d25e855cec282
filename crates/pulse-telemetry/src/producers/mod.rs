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

//! The default metric producers and the fixed roster the collector runs.
//!
//! Every producer is built from a [`ProducerContext`]. Building registers the
//! producer's series; the collector then only calls `refresh`. The context
//! remembers every series it created so the collector can remove exactly those
//! when the activation fails or is replaced.

pub mod callback_duration;
pub mod event_loop_lag;
pub mod process;
pub mod runtime;
mod table;

pub use self::callback_duration::CallbackDurationTracer;
pub use self::event_loop_lag::{EventLoopLag, LagMode};
pub use self::table::StatsProducer;

use crate::config::CollectorOptions;
use crate::metrics::{
    GaugeHandle, GaugeOptions, MetricsRegistry, SummaryHandle, SummaryOptions,
};
use pulse_core::platform::Clock;
use pulse_core::telemetry::{MetricProducer, MetricsResult};
use pulse_core::Platform;
use std::cell::RefCell;
use std::sync::Arc;

/// Everything a producer needs at construction time.
#[derive(Debug)]
pub struct ProducerContext<'a> {
    /// Where series are registered.
    pub registry: &'a MetricsRegistry,
    /// The effective options of this activation.
    pub options: &'a CollectorOptions,
    /// Host facilities.
    pub platform: &'a Platform,
    created: RefCell<Vec<String>>,
}

impl<'a> ProducerContext<'a> {
    /// Bundles the construction inputs.
    pub fn new(
        registry: &'a MetricsRegistry,
        options: &'a CollectorOptions,
        platform: &'a Platform,
    ) -> Self {
        Self {
            registry,
            options,
            platform,
            created: RefCell::new(Vec::new()),
        }
    }

    /// Registers a gauge and remembers its name.
    pub fn create_gauge(&self, options: GaugeOptions) -> MetricsResult<GaugeHandle> {
        let name = options.name.clone();
        let gauge = self.registry.create_gauge(options)?;
        self.created.borrow_mut().push(name);
        Ok(gauge)
    }

    /// Registers a summary and remembers its name.
    pub fn create_summary(&self, options: SummaryOptions) -> MetricsResult<SummaryHandle> {
        let name = options.name.clone();
        let summary = self.registry.create_summary(options)?;
        self.created.borrow_mut().push(name);
        Ok(summary)
    }

    /// Names of the series created through this context, in creation order.
    pub fn created_series(&self) -> Vec<String> {
        self.created.borrow().clone()
    }

    /// `name` with the configured prefix.
    pub fn series_name(&self, name: &str) -> String {
        prefixed(&self.options.prefix, name)
    }

    /// A timestamp source honoring the `timestamps` option.
    pub fn stamp(&self) -> Stamp {
        Stamp {
            clock: Arc::clone(self.platform.clock()),
            enabled: self.options.timestamps,
        }
    }
}

/// Prepends `prefix` to `name`.
pub fn prefixed(prefix: &str, name: &str) -> String {
    let mut series = String::with_capacity(prefix.len() + name.len());
    series.push_str(prefix);
    series.push_str(name);
    series
}

/// Produces sample timestamps when the collector is configured to attach them.
#[derive(Debug, Clone)]
pub struct Stamp {
    clock: Arc<dyn Clock>,
    enabled: bool,
}

impl Stamp {
    /// The current wall-clock time in unix milliseconds, if timestamps are on.
    pub fn now(&self) -> Option<i64> {
        self.enabled.then(|| self.clock.wall_clock_millis())
    }
}

/// Writes a gauge, logging instead of failing.
pub(crate) fn publish(gauge: &GaugeHandle, value: f64, timestamp_ms: Option<i64>) {
    if let Err(e) = gauge.set_with(value, timestamp_ms) {
        log::warn!("Failed to publish {}: {}", gauge.id(), e);
    }
}

/// Builds one producer against a context.
pub type BuildFn = fn(&ProducerContext<'_>) -> MetricsResult<Arc<dyn MetricProducer>>;

/// A roster entry.
#[derive(Debug, Clone, Copy)]
pub struct ProducerSpec {
    /// Stable producer name.
    pub name: &'static str,
    /// Unprefixed names of every series the producer may register.
    pub metric_names: &'static [&'static str],
    /// Constructor.
    pub build: BuildFn,
}

/// The fixed roster, in refresh order.
pub const ROSTER: &[ProducerSpec] = &[
    process::CPU_TOTAL,
    process::START_TIME,
    callback_duration::TICK,
    callback_duration::IMMEDIATE,
    process::MEMORY,
    process::OPEN_FDS,
    process::MAX_FDS,
    event_loop_lag::SPEC,
    runtime::TASKS,
    process::UPTIME,
];

/// Names of the roster entries, in refresh order.
pub fn roster_names() -> Vec<&'static str> {
    ROSTER.iter().map(|spec| spec.name).collect()
}

/// Every series name the roster may register, unprefixed.
pub fn all_metric_names() -> Vec<&'static str> {
    ROSTER
        .iter()
        .flat_map(|spec| spec.metric_names.iter().copied())
        .collect()
}

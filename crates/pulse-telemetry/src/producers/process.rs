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

//! Process resource producers backed by a [`ProcessStatsSource`].

use super::table::{Sampler, SeriesDef, StatsProducer};
use super::{ProducerContext, ProducerSpec};
use pulse_core::platform::{ProcessSnapshot, ProcessStatsSource};
use pulse_core::telemetry::metrics::Aggregator;
use pulse_core::telemetry::{MetricProducer, MetricsResult};
use std::sync::Arc;

const PROCESS_CPU_SECONDS_TOTAL: &str = "process_cpu_seconds_total";
const PROCESS_START_TIME_SECONDS: &str = "process_start_time_seconds";
const PROCESS_RESIDENT_MEMORY_BYTES: &str = "process_resident_memory_bytes";
const PROCESS_VIRTUAL_MEMORY_BYTES: &str = "process_virtual_memory_bytes";
const PROCESS_OPEN_FDS: &str = "process_open_fds";
const PROCESS_MAX_FDS: &str = "process_max_fds";
const PROCESS_UPTIME_SECONDS: &str = "process_uptime_seconds";

fn cpu_seconds(s: &ProcessSnapshot) -> Option<f64> {
    s.cpu_seconds
}

fn start_time(s: &ProcessSnapshot) -> Option<f64> {
    s.start_time_seconds.map(|v| v as f64)
}

fn resident_memory(s: &ProcessSnapshot) -> Option<f64> {
    s.resident_memory_bytes.map(|v| v as f64)
}

fn virtual_memory(s: &ProcessSnapshot) -> Option<f64> {
    s.virtual_memory_bytes.map(|v| v as f64)
}

fn open_fds(s: &ProcessSnapshot) -> Option<f64> {
    s.open_fds.map(|v| v as f64)
}

fn max_fds(s: &ProcessSnapshot) -> Option<f64> {
    s.max_fds.map(|v| v as f64)
}

fn uptime(s: &ProcessSnapshot) -> Option<f64> {
    s.uptime_seconds.map(|v| v as f64)
}

const CPU_TOTAL_SERIES: &[SeriesDef<ProcessSnapshot>] = &[SeriesDef {
    name: PROCESS_CPU_SECONDS_TOTAL,
    help: "Total user and system CPU time spent in seconds.",
    aggregator: Aggregator::Sum,
    read: cpu_seconds,
}];

const START_TIME_SERIES: &[SeriesDef<ProcessSnapshot>] = &[SeriesDef {
    name: PROCESS_START_TIME_SECONDS,
    help: "Start time of the process since unix epoch in seconds.",
    aggregator: Aggregator::OmitAll,
    read: start_time,
}];

const MEMORY_SERIES: &[SeriesDef<ProcessSnapshot>] = &[
    SeriesDef {
        name: PROCESS_RESIDENT_MEMORY_BYTES,
        help: "Resident memory size in bytes.",
        aggregator: Aggregator::Sum,
        read: resident_memory,
    },
    SeriesDef {
        name: PROCESS_VIRTUAL_MEMORY_BYTES,
        help: "Virtual memory size in bytes.",
        aggregator: Aggregator::Sum,
        read: virtual_memory,
    },
];

const OPEN_FDS_SERIES: &[SeriesDef<ProcessSnapshot>] = &[SeriesDef {
    name: PROCESS_OPEN_FDS,
    help: "Number of open file descriptors.",
    aggregator: Aggregator::Sum,
    read: open_fds,
}];

const MAX_FDS_SERIES: &[SeriesDef<ProcessSnapshot>] = &[SeriesDef {
    name: PROCESS_MAX_FDS,
    help: "Maximum number of open file descriptors.",
    aggregator: Aggregator::Sum,
    read: max_fds,
}];

const UPTIME_SERIES: &[SeriesDef<ProcessSnapshot>] = &[SeriesDef {
    name: PROCESS_UPTIME_SECONDS,
    help: "Number of seconds the process has been running.",
    aggregator: Aggregator::Max,
    read: uptime,
}];

/// Accumulated CPU time.
pub const CPU_TOTAL: ProducerSpec = ProducerSpec {
    name: "process_cpu_total",
    metric_names: &[PROCESS_CPU_SECONDS_TOTAL],
    build: build_cpu_total,
};

/// Process start time.
pub const START_TIME: ProducerSpec = ProducerSpec {
    name: "process_start_time",
    metric_names: &[PROCESS_START_TIME_SECONDS],
    build: build_start_time,
};

/// Resident and virtual memory.
pub const MEMORY: ProducerSpec = ProducerSpec {
    name: "process_memory",
    metric_names: &[PROCESS_RESIDENT_MEMORY_BYTES, PROCESS_VIRTUAL_MEMORY_BYTES],
    build: build_memory,
};

/// Open file descriptors.
pub const OPEN_FDS: ProducerSpec = ProducerSpec {
    name: "process_open_fds",
    metric_names: &[PROCESS_OPEN_FDS],
    build: build_open_fds,
};

/// File descriptor limit.
pub const MAX_FDS: ProducerSpec = ProducerSpec {
    name: "process_max_fds",
    metric_names: &[PROCESS_MAX_FDS],
    build: build_max_fds,
};

/// Time since the process started.
pub const UPTIME: ProducerSpec = ProducerSpec {
    name: "process_uptime",
    metric_names: &[PROCESS_UPTIME_SECONDS],
    build: build_uptime,
};

fn build(
    ctx: &ProducerContext<'_>,
    spec: &ProducerSpec,
    defs: &[SeriesDef<ProcessSnapshot>],
) -> MetricsResult<Arc<dyn MetricProducer>> {
    let sample = ctx.platform.process_stats().map(|source| {
        let source: Arc<dyn ProcessStatsSource> = Arc::clone(source);
        Arc::new(move || source.snapshot()) as Sampler<ProcessSnapshot>
    });
    let producer = StatsProducer::build(ctx, spec.name, spec.metric_names, defs, sample)?;
    Ok(Arc::new(producer))
}

fn build_cpu_total(ctx: &ProducerContext<'_>) -> MetricsResult<Arc<dyn MetricProducer>> {
    build(ctx, &CPU_TOTAL, CPU_TOTAL_SERIES)
}

fn build_start_time(ctx: &ProducerContext<'_>) -> MetricsResult<Arc<dyn MetricProducer>> {
    build(ctx, &START_TIME, START_TIME_SERIES)
}

fn build_memory(ctx: &ProducerContext<'_>) -> MetricsResult<Arc<dyn MetricProducer>> {
    build(ctx, &MEMORY, MEMORY_SERIES)
}

fn build_open_fds(ctx: &ProducerContext<'_>) -> MetricsResult<Arc<dyn MetricProducer>> {
    build(ctx, &OPEN_FDS, OPEN_FDS_SERIES)
}

fn build_max_fds(ctx: &ProducerContext<'_>) -> MetricsResult<Arc<dyn MetricProducer>> {
    build(ctx, &MAX_FDS, MAX_FDS_SERIES)
}

fn build_uptime(ctx: &ProducerContext<'_>) -> MetricsResult<Arc<dyn MetricProducer>> {
    build(ctx, &UPTIME, UPTIME_SERIES)
}

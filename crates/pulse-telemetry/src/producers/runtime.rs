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

//! Scheduler runtime gauges backed by a [`RuntimeStatsSource`].

use super::table::{Sampler, SeriesDef, StatsProducer};
use super::{ProducerContext, ProducerSpec};
use pulse_core::platform::{RuntimeSnapshot, RuntimeStatsSource};
use pulse_core::telemetry::metrics::Aggregator;
use pulse_core::telemetry::{MetricProducer, MetricsResult};
use std::sync::Arc;

const RUNTIME_WORKERS: &str = "runtime_workers";
const RUNTIME_ALIVE_TASKS: &str = "runtime_alive_tasks";
const RUNTIME_GLOBAL_QUEUE_DEPTH: &str = "runtime_global_queue_depth";

const TASK_SERIES: &[SeriesDef<RuntimeSnapshot>] = &[
    SeriesDef {
        name: RUNTIME_WORKERS,
        help: "Number of worker threads used by the runtime.",
        aggregator: Aggregator::Sum,
        read: |s| Some(s.workers as f64),
    },
    SeriesDef {
        name: RUNTIME_ALIVE_TASKS,
        help: "Number of tasks currently alive in the runtime.",
        aggregator: Aggregator::Sum,
        read: |s| Some(s.alive_tasks as f64),
    },
    SeriesDef {
        name: RUNTIME_GLOBAL_QUEUE_DEPTH,
        help: "Number of tasks waiting in the runtime's global queue.",
        aggregator: Aggregator::Sum,
        read: |s| Some(s.global_queue_depth as f64),
    },
];

/// Worker, task and queue counts of the scheduler runtime.
pub const TASKS: ProducerSpec = ProducerSpec {
    name: "runtime_tasks",
    metric_names: &[RUNTIME_WORKERS, RUNTIME_ALIVE_TASKS, RUNTIME_GLOBAL_QUEUE_DEPTH],
    build: build_tasks,
};

fn build_tasks(ctx: &ProducerContext<'_>) -> MetricsResult<Arc<dyn MetricProducer>> {
    let sample = ctx.platform.runtime_stats().map(|source| {
        let source: Arc<dyn RuntimeStatsSource> = Arc::clone(source);
        Arc::new(move || source.snapshot()) as Sampler<RuntimeSnapshot>
    });
    let producer = StatsProducer::build(ctx, TASKS.name, TASKS.metric_names, TASK_SERIES, sample)?;
    Ok(Arc::new(producer))
}

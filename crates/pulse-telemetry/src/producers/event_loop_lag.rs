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

//! Scheduler responsiveness.
//!
//! Lag is how long a trivial unit of deferred work waits before it runs. Two
//! strategies exist and one is picked when the producer is built:
//!
//! - **Precise**: the platform has a [`DelayMonitor`](pulse_core::platform::DelayMonitor).
//!   A sampler runs for the producer's whole life and every refresh publishes
//!   its lifetime statistics. The histogram is never reset, so each scrape sees
//!   the running distribution rather than the last window.
//! - **Fallback**: each refresh defers a check and publishes the single delay
//!   it observed into the primary gauge. The other seven gauges stay unwritten.
//!   Checks still queued when the producer is dropped publish nothing. This
//!   mode is also used when the sampler cannot be started.
//!
//! In precise mode the primary gauge carries the histogram *mean*, not an
//! instantaneous sample.

use super::{publish, ProducerContext, ProducerSpec, Stamp};
use crate::metrics::{GaugeHandle, GaugeOptions};
use pulse_core::platform::{Clock, DeferredScheduler, DelaySampler, ResourceKind};
use pulse_core::telemetry::metrics::Aggregator;
use pulse_core::telemetry::{MetricProducer, MetricsResult};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const NODEJS_EVENTLOOP_LAG: &str = "nodejs_eventloop_lag_seconds";
const NODEJS_EVENTLOOP_LAG_MIN: &str = "nodejs_eventloop_lag_min_seconds";
const NODEJS_EVENTLOOP_LAG_MAX: &str = "nodejs_eventloop_lag_max_seconds";
const NODEJS_EVENTLOOP_LAG_MEAN: &str = "nodejs_eventloop_lag_mean_seconds";
const NODEJS_EVENTLOOP_LAG_STDDEV: &str = "nodejs_eventloop_lag_stddev_seconds";
const NODEJS_EVENTLOOP_LAG_P50: &str = "nodejs_eventloop_lag_p50_seconds";
const NODEJS_EVENTLOOP_LAG_P90: &str = "nodejs_eventloop_lag_p90_seconds";
const NODEJS_EVENTLOOP_LAG_P99: &str = "nodejs_eventloop_lag_p99_seconds";

const NANOS_PER_SECOND: f64 = 1e9;

/// Roster entry.
pub const SPEC: ProducerSpec = ProducerSpec {
    name: "event_loop_lag",
    metric_names: &[
        NODEJS_EVENTLOOP_LAG,
        NODEJS_EVENTLOOP_LAG_MIN,
        NODEJS_EVENTLOOP_LAG_MAX,
        NODEJS_EVENTLOOP_LAG_MEAN,
        NODEJS_EVENTLOOP_LAG_STDDEV,
        NODEJS_EVENTLOOP_LAG_P50,
        NODEJS_EVENTLOOP_LAG_P90,
        NODEJS_EVENTLOOP_LAG_P99,
    ],
    build: build_event_loop_lag,
};

fn build_event_loop_lag(ctx: &ProducerContext<'_>) -> MetricsResult<Arc<dyn MetricProducer>> {
    Ok(Arc::new(EventLoopLag::new(ctx)?))
}

/// Which lag strategy a producer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LagMode {
    /// Histogram-backed statistics.
    Precise,
    /// One deferred check per refresh.
    Fallback,
}

#[derive(Debug)]
struct LagGauges {
    lag: GaugeHandle,
    min: GaugeHandle,
    max: GaugeHandle,
    mean: GaugeHandle,
    stddev: GaugeHandle,
    p50: GaugeHandle,
    p90: GaugeHandle,
    p99: GaugeHandle,
}

impl LagGauges {
    fn register(ctx: &ProducerContext<'_>) -> MetricsResult<Self> {
        let gauge =
            |name: &str, help: &str| ctx.create_gauge(GaugeOptions::new(ctx.series_name(name), help));
        Ok(Self {
            lag: ctx.create_gauge(
                GaugeOptions::new(ctx.series_name(NODEJS_EVENTLOOP_LAG), "Lag of event loop in seconds.")
                    .aggregator(Aggregator::Average),
            )?,
            min: gauge(NODEJS_EVENTLOOP_LAG_MIN, "The minimum recorded event loop delay.")?,
            max: gauge(NODEJS_EVENTLOOP_LAG_MAX, "The maximum recorded event loop delay.")?,
            mean: gauge(NODEJS_EVENTLOOP_LAG_MEAN, "The mean of the recorded event loop delays.")?,
            stddev: gauge(
                NODEJS_EVENTLOOP_LAG_STDDEV,
                "The standard deviation of the recorded event loop delays.",
            )?,
            p50: gauge(NODEJS_EVENTLOOP_LAG_P50, "The 50 percentile of the recorded event loop delays.")?,
            p90: gauge(NODEJS_EVENTLOOP_LAG_P90, "The 90 percentile of the recorded event loop delays.")?,
            p99: gauge(NODEJS_EVENTLOOP_LAG_P99, "The 99 percentile of the recorded event loop delays.")?,
        })
    }
}

#[derive(Debug)]
enum Strategy {
    Precise {
        sampler: Box<dyn DelaySampler>,
    },
    Fallback {
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn DeferredScheduler>,
        live: Arc<AtomicBool>,
    },
}

impl Strategy {
    fn fallback(ctx: &ProducerContext<'_>) -> Self {
        Strategy::Fallback {
            clock: Arc::clone(ctx.platform.clock()),
            scheduler: Arc::clone(ctx.platform.scheduler()),
            live: Arc::new(AtomicBool::new(true)),
        }
    }
}

/// The event-loop lag producer.
#[derive(Debug)]
pub struct EventLoopLag {
    gauges: LagGauges,
    strategy: Strategy,
    stamp: Stamp,
}

impl EventLoopLag {
    /// Registers the eight lag gauges and starts sampling if the platform can.
    pub fn new(ctx: &ProducerContext<'_>) -> MetricsResult<Self> {
        let gauges = LagGauges::register(ctx)?;
        let strategy = match ctx.platform.delay_monitor() {
            Some(monitor) => match monitor.enable(ctx.options.lag_resolution()) {
                Ok(sampler) => Strategy::Precise { sampler },
                Err(e) => {
                    log::warn!("Event-loop-delay sampling unavailable ({}), measuring lag with deferred checks", e);
                    Strategy::fallback(ctx)
                }
            },
            None => {
                log::debug!("No event-loop-delay monitor available, measuring lag with deferred checks");
                Strategy::fallback(ctx)
            }
        };
        Ok(Self {
            gauges,
            strategy,
            stamp: ctx.stamp(),
        })
    }

    /// The strategy picked at construction.
    pub fn mode(&self) -> LagMode {
        match self.strategy {
            Strategy::Precise { .. } => LagMode::Precise,
            Strategy::Fallback { .. } => LagMode::Fallback,
        }
    }
}

impl MetricProducer for EventLoopLag {
    fn producer_id(&self) -> Cow<'static, str> {
        Cow::Borrowed(SPEC.name)
    }

    fn metric_names(&self) -> &'static [&'static str] {
        SPEC.metric_names
    }

    fn refresh(&self) {
        match &self.strategy {
            Strategy::Precise { sampler } => {
                let stats = sampler.snapshot();
                let now = self.stamp.now();
                let g = &self.gauges;
                publish(&g.lag, stats.mean / NANOS_PER_SECOND, now);
                publish(&g.min, stats.min / NANOS_PER_SECOND, now);
                publish(&g.max, stats.max / NANOS_PER_SECOND, now);
                publish(&g.mean, stats.mean / NANOS_PER_SECOND, now);
                publish(&g.stddev, stats.stddev / NANOS_PER_SECOND, now);
                publish(&g.p50, stats.p50 / NANOS_PER_SECOND, now);
                publish(&g.p90, stats.p90 / NANOS_PER_SECOND, now);
                publish(&g.p99, stats.p99 / NANOS_PER_SECOND, now);
            }
            Strategy::Fallback {
                clock,
                scheduler,
                live,
            } => {
                let start = clock.now();
                let clock = Arc::clone(clock);
                let live = Arc::clone(live);
                let lag = self.gauges.lag.clone();
                let stamp = self.stamp.clone();
                scheduler.defer_named(
                    ResourceKind::Immediate,
                    Some(Cow::Borrowed("report_event_loop_lag")),
                    Box::new(move || {
                        if !live.load(Ordering::Acquire) {
                            return;
                        }
                        let seconds = clock.elapsed_seconds(start);
                        publish(&lag, seconds, stamp.now());
                    }),
                );
            }
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Drop for EventLoopLag {
    fn drop(&mut self) {
        if let Strategy::Fallback { live, .. } = &self.strategy {
            live.store(false, Ordering::Release);
        }
    }
}

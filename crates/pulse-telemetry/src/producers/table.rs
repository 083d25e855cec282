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

//! Gauges filled from a statistics snapshot, one field per series.

use super::{publish, ProducerContext, Stamp};
use crate::metrics::{GaugeHandle, GaugeOptions};
use pulse_core::telemetry::metrics::Aggregator;
use pulse_core::telemetry::{MetricProducer, MetricsResult};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Takes a fresh statistics snapshot.
pub type Sampler<S> = Arc<dyn Fn() -> S + Send + Sync>;

/// Static description of one gauge in a table.
pub struct SeriesDef<S> {
    /// Unprefixed series name.
    pub name: &'static str,
    /// Help text.
    pub help: &'static str,
    /// Cross-process aggregation hint.
    pub aggregator: Aggregator,
    /// Extracts the value from a snapshot; `None` leaves the gauge untouched.
    pub read: fn(&S) -> Option<f64>,
}

/// A producer that samples a statistics source and writes one gauge per field.
///
/// Without a source every series is still registered, and refreshes write nothing.
pub struct StatsProducer<S: 'static> {
    id: &'static str,
    metric_names: &'static [&'static str],
    gauges: Vec<(GaugeHandle, fn(&S) -> Option<f64>)>,
    sample: Option<Sampler<S>>,
    stamp: Stamp,
}

impl<S: 'static> StatsProducer<S> {
    /// Registers every gauge in `defs` and returns the producer.
    pub fn build(
        ctx: &ProducerContext<'_>,
        id: &'static str,
        metric_names: &'static [&'static str],
        defs: &[SeriesDef<S>],
        sample: Option<Sampler<S>>,
    ) -> MetricsResult<Self> {
        let gauges = defs
            .iter()
            .map(|def| {
                let gauge = ctx.create_gauge(
                    GaugeOptions::new(ctx.series_name(def.name), def.help)
                        .aggregator(def.aggregator),
                )?;
                Ok((gauge, def.read))
            })
            .collect::<MetricsResult<Vec<_>>>()?;

        if sample.is_none() {
            log::debug!("No statistics source for producer {}; its series will not be written", id);
        }

        Ok(Self {
            id,
            metric_names,
            gauges,
            sample,
            stamp: ctx.stamp(),
        })
    }
}

impl<S: 'static> fmt::Debug for StatsProducer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsProducer")
            .field("id", &self.id)
            .field("gauges", &self.gauges.len())
            .field("has_source", &self.sample.is_some())
            .finish()
    }
}

impl<S: 'static> MetricProducer for StatsProducer<S> {
    fn producer_id(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.id)
    }

    fn metric_names(&self) -> &'static [&'static str] {
        self.metric_names
    }

    fn refresh(&self) {
        let Some(sample) = &self.sample else {
            return;
        };
        let snapshot = sample();
        let timestamp = self.stamp.now();
        for (gauge, read) in &self.gauges {
            if let Some(value) = read(&snapshot) {
                publish(gauge, value, timestamp);
            }
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

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

//! Registry for managing metrics.

use crate::storage::{backend::MetricsBackend, memory_backend::InMemoryBackend};
use once_cell::sync::Lazy;
use pulse_core::telemetry::metrics::{
    Aggregator, Metric, MetricId, MetricType, MetricValue, MetricsError, MetricsResult,
};
use pulse_core::telemetry::{SummarySeries, WindowConfig};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

static GLOBAL_REGISTRY: Lazy<MetricsRegistry> = Lazy::new(MetricsRegistry::new);

/// Central registry of named series.
///
/// This registry provides a high-level API for series management and is the
/// target every producer writes into. Cloning a registry yields another handle
/// to the same storage.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    backend: Arc<dyn MetricsBackend>,
}

impl MetricsRegistry {
    /// Create a new metrics registry with the default in-memory backend
    pub fn new() -> Self {
        Self {
            backend: Arc::new(InMemoryBackend::new()),
        }
    }

    /// The process-wide default registry, created on first use.
    pub fn global() -> Self {
        GLOBAL_REGISTRY.clone()
    }

    /// Whether both handles point at the same storage.
    pub fn same_target(&self, other: &MetricsRegistry) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.backend) as *const (),
            Arc::as_ptr(&other.backend) as *const (),
        )
    }

    /// Register a new gauge, starting at `0`.
    ///
    /// Fails with [`MetricsError::AlreadyRegistered`] if the name is taken.
    pub fn create_gauge(&self, options: GaugeOptions) -> MetricsResult<GaugeHandle> {
        let id = MetricId::new(options.name);
        let metric = Metric::new_gauge(id.clone(), options.help, options.aggregator, 0.0);
        self.backend.register_metric(metric)?;
        Ok(GaugeHandle::new(id, self.backend.clone()))
    }

    /// Register a new, empty summary.
    ///
    /// Fails with [`MetricsError::AlreadyRegistered`] if the name is taken.
    pub fn create_summary(&self, options: SummaryOptions) -> MetricsResult<SummaryHandle> {
        let id = MetricId::new(options.name.clone());
        let metric = Metric::new_summary(id.clone(), options.help.clone(), options.window())?;
        self.backend.register_metric(metric)?;
        Ok(SummaryHandle::new(id, self.backend.clone()))
    }

    /// Remove the series called `name`.
    pub fn remove_single_metric(&self, name: &str) -> MetricsResult<()> {
        self.backend.remove_metric(&MetricId::new(name))
    }

    /// Get the series called `name`, if registered.
    pub fn get_single_metric(&self, name: &str) -> Option<Metric> {
        self.backend.get_metric(&MetricId::new(name)).ok()
    }

    /// Check if a metric exists
    pub fn contains_metric(&self, id: &MetricId) -> bool {
        self.backend.contains_metric(id)
    }

    /// Names of every registered series, sorted.
    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .backend
            .list_metric_ids()
            .into_iter()
            .map(|id| id.to_string_formatted())
            .collect();
        names.sort();
        names
    }

    /// Point-in-time view of every series, sorted by name.
    pub fn snapshot(&self) -> Vec<SeriesSnapshot> {
        let mut series = Vec::with_capacity(self.backend.metric_count());
        if let Err(e) = self
            .backend
            .visit_metrics(&mut |metric| series.push(SeriesSnapshot::from_metric(metric)))
        {
            log::warn!("Failed to snapshot the registry: {}", e);
        }
        series.sort_by(|a, b| a.name.cmp(&b.name));
        series
    }

    /// The snapshot rendered as pretty-printed JSON.
    pub fn get_metrics_as_json(&self) -> MetricsResult<String> {
        serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| MetricsError::StorageError(format!("JSON encoding failed: {e}")))
    }

    /// Get the total number of metrics
    pub fn metric_count(&self) -> usize {
        self.backend.metric_count()
    }

    /// Clear all metrics
    pub fn clear(&self) -> MetricsResult<()> {
        self.backend.clear_all()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for MetricsRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.same_target(other)
    }
}

/// Options for [`MetricsRegistry::create_gauge`].
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeOptions {
    /// Series name.
    pub name: String,
    /// Human-readable description.
    pub help: String,
    /// How the series combines across processes.
    pub aggregator: Aggregator,
}

impl GaugeOptions {
    /// Gauge options with the default `Sum` aggregator.
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            aggregator: Aggregator::default(),
        }
    }

    /// Sets the aggregator.
    pub fn aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }
}

/// Options for [`MetricsRegistry::create_summary`].
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOptions {
    /// Series name.
    pub name: String,
    /// Human-readable description.
    pub help: String,
    /// Quantiles to report.
    pub percentiles: Vec<f64>,
    /// How long an observation stays in the window.
    pub max_age: Duration,
    /// Number of rotating buckets.
    pub age_buckets: usize,
}

impl SummaryOptions {
    /// Summary options with the default window.
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        let window = WindowConfig::default();
        Self {
            name: name.into(),
            help: help.into(),
            percentiles: window.percentiles,
            max_age: window.max_age,
            age_buckets: window.age_buckets,
        }
    }

    /// Sets the reported quantiles.
    pub fn percentiles(mut self, percentiles: impl Into<Vec<f64>>) -> Self {
        self.percentiles = percentiles.into();
        self
    }

    /// Sets the window length and the number of buckets it rotates through.
    pub fn window_of(mut self, max_age: Duration, age_buckets: usize) -> Self {
        self.max_age = max_age;
        self.age_buckets = age_buckets;
        self
    }

    fn window(&self) -> WindowConfig {
        WindowConfig {
            percentiles: self.percentiles.clone(),
            max_age: self.max_age,
            age_buckets: self.age_buckets,
        }
    }
}

/// Handle for efficient gauge operations
#[derive(Debug, Clone)]
pub struct GaugeHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl GaugeHandle {
    fn new(id: MetricId, backend: Arc<dyn MetricsBackend>) -> Self {
        Self { id, backend }
    }

    /// Set the gauge to a specific value
    pub fn set(&self, value: f64) -> MetricsResult<()> {
        self.backend.set_gauge(&self.id, value, None)
    }

    /// Set the gauge and stamp it with a unix-millisecond timestamp
    pub fn set_at(&self, value: f64, timestamp_ms: i64) -> MetricsResult<()> {
        self.backend.set_gauge(&self.id, value, Some(timestamp_ms))
    }

    /// Set the gauge, stamping it only when a timestamp is given
    pub fn set_with(&self, value: f64, timestamp_ms: Option<i64>) -> MetricsResult<()> {
        self.backend.set_gauge(&self.id, value, timestamp_ms)
    }

    /// Get the current gauge value
    pub fn get(&self) -> MetricsResult<f64> {
        let metric = self.backend.get_metric(&self.id)?;
        metric
            .value
            .as_gauge()
            .ok_or_else(|| MetricsError::TypeMismatch {
                expected: MetricType::Gauge,
                found: metric.value.metric_type(),
            })
    }

    /// Get the metric ID
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle for summary observations
#[derive(Debug, Clone)]
pub struct SummaryHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl SummaryHandle {
    fn new(id: MetricId, backend: Arc<dyn MetricsBackend>) -> Self {
        Self { id, backend }
    }

    /// Record an observation for the child identified by `labels`
    pub fn observe(&self, labels: &[(&str, &str)], value: f64) -> MetricsResult<()> {
        self.backend.observe_summary(&self.id, labels, value, None)
    }

    /// Record an observation stamped with a unix-millisecond timestamp
    pub fn observe_at(
        &self,
        labels: &[(&str, &str)],
        value: f64,
        timestamp_ms: i64,
    ) -> MetricsResult<()> {
        self.backend
            .observe_summary(&self.id, labels, value, Some(timestamp_ms))
    }

    /// Record an observation, stamping it only when a timestamp is given
    pub fn observe_with(
        &self,
        labels: &[(&str, &str)],
        value: f64,
        timestamp_ms: Option<i64>,
    ) -> MetricsResult<()> {
        self.backend
            .observe_summary(&self.id, labels, value, timestamp_ms)
    }

    /// Current quantiles of the unlabelled child.
    ///
    /// Reports `0.0` for every quantile until something is observed.
    pub fn quantiles(&self) -> MetricsResult<Vec<(f64, f64)>> {
        self.read_series(|series| {
            let unlabelled = series
                .children_mut()
                .find(|(labels, _)| labels.is_empty())
                .map(|(_, window)| window.quantiles());
            unlabelled.unwrap_or_else(|| {
                series.config().percentiles.iter().map(|&q| (q, 0.0)).collect()
            })
        })
    }

    /// Total number of observations across every child
    pub fn count(&self) -> MetricsResult<u64> {
        self.read_series(|series| series.count())
    }

    // Quantile reads rotate the window, so they go through the in-place path.
    fn read_series<T>(&self, read: impl FnOnce(&mut SummarySeries) -> T) -> MetricsResult<T> {
        let mut read = Some(read);
        let mut result = None;
        self.backend.update_metric(&self.id, &mut |metric: &mut Metric| {
            match &mut metric.value {
                MetricValue::Summary(series) => {
                    result = read.take().map(|read| read(series));
                    Ok(())
                }
                other => Err(MetricsError::TypeMismatch {
                    expected: MetricType::Summary,
                    found: other.metric_type(),
                }),
            }
        })?;
        result.ok_or_else(|| MetricsError::MetricNotFound(self.id.clone()))
    }

    /// Get the metric ID
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Serializable view of one registered series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSnapshot {
    /// Series name, labels included.
    pub name: String,
    /// Human-readable description.
    pub help: String,
    /// Gauge or summary.
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    /// Cross-process aggregation hint.
    pub aggregator: Aggregator,
    /// The current value.
    pub value: SampleValue,
    /// Unix-millisecond timestamp of the last published sample, if stamped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,
}

impl SeriesSnapshot {
    fn from_metric(metric: &mut Metric) -> Self {
        let Metric {
            metadata,
            value,
            timestamp_ms,
        } = metric;
        let value = match value {
            MetricValue::Gauge(v) => SampleValue::Gauge(*v),
            MetricValue::Summary(series) => SampleValue::Summary(
                series
                    .children_mut()
                    .map(|(labels, window)| SummaryChild {
                        labels: labels.clone(),
                        count: window.count(),
                        sum: window.sum(),
                        quantiles: window
                            .quantiles()
                            .into_iter()
                            .map(|(quantile, value)| QuantileSample { quantile, value })
                            .collect(),
                    })
                    .collect(),
            ),
        };
        Self {
            name: metadata.id.to_string_formatted(),
            help: metadata.help.clone(),
            metric_type: metadata.metric_type,
            aggregator: metadata.aggregator,
            value,
            timestamp_ms: *timestamp_ms,
        }
    }
}

/// Value part of a [`SeriesSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SampleValue {
    /// The gauge's last value.
    Gauge(f64),
    /// One entry per observed label set.
    Summary(Vec<SummaryChild>),
}

/// Quantiles of one labelled child of a summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryChild {
    /// The child's labels; empty for the unlabelled child.
    pub labels: Vec<(String, String)>,
    /// Lifetime number of observations.
    pub count: u64,
    /// Lifetime sum of observations.
    pub sum: f64,
    /// Windowed quantiles.
    pub quantiles: Vec<QuantileSample>,
}

/// One reported quantile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuantileSample {
    /// The quantile, in `(0, 1]`.
    pub quantile: f64,
    /// Its estimated value.
    pub value: f64,
}

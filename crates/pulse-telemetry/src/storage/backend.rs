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

use pulse_core::telemetry::{
    metrics::MetricType, Metric, MetricId, MetricValue, MetricsError, MetricsResult,
};
use std::fmt::Debug;
use std::time::Instant;

/// Trait defining the interface for metrics storage backends
pub trait MetricsBackend: Send + Sync + Debug + 'static {
    /// Store a new metric, failing if one with the same ID already exists
    fn register_metric(&self, metric: Metric) -> MetricsResult<()>;

    /// Apply `update` to a stored metric in place
    fn update_metric(
        &self,
        id: &MetricId,
        update: &mut dyn FnMut(&mut Metric) -> MetricsResult<()>,
    ) -> MetricsResult<()>;

    /// Retrieve a copy of a metric by ID
    fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric>;

    /// Check if a metric exists
    fn contains_metric(&self, id: &MetricId) -> bool;

    /// Remove a metric
    fn remove_metric(&self, id: &MetricId) -> MetricsResult<()>;

    /// Get all metric IDs currently stored
    fn list_metric_ids(&self) -> Vec<MetricId>;

    /// Call `visit` on every stored metric, in no particular order
    fn visit_metrics(&self, visit: &mut dyn FnMut(&mut Metric)) -> MetricsResult<()>;

    /// Clear all metrics
    fn clear_all(&self) -> MetricsResult<()>;

    /// Get the number of metrics stored
    fn metric_count(&self) -> usize;

    // Convenience methods for common operations

    /// Set a gauge value, optionally stamped with a unix-millisecond timestamp
    fn set_gauge(&self, id: &MetricId, value: f64, timestamp_ms: Option<i64>) -> MetricsResult<()> {
        self.update_metric(id, &mut |metric: &mut Metric| match metric.value {
            MetricValue::Gauge(ref mut gauge_value) => {
                *gauge_value = value;
                metric.timestamp_ms = timestamp_ms;
                metric.metadata.update_timestamp();
                Ok(())
            }
            _ => Err(MetricsError::TypeMismatch {
                expected: MetricType::Gauge,
                found: metric.value.metric_type(),
            }),
        })
    }

    /// Add an observation to a summary
    fn observe_summary(
        &self,
        id: &MetricId,
        labels: &[(&str, &str)],
        value: f64,
        timestamp_ms: Option<i64>,
    ) -> MetricsResult<()> {
        let now = Instant::now();
        self.update_metric(id, &mut |metric: &mut Metric| match metric.value {
            MetricValue::Summary(ref mut series) => {
                series.observe_at(labels, value, now);
                metric.timestamp_ms = timestamp_ms;
                metric.metadata.update_timestamp();
                Ok(())
            }
            _ => Err(MetricsError::TypeMismatch {
                expected: MetricType::Summary,
                found: metric.value.metric_type(),
            }),
        })
    }
}

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

//! Abstract definitions for published series.

use super::quantiles::{SlidingWindowQuantiles, WindowConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::time::Instant;

/// A unique identifier for a series.
///
/// A `MetricId` is the full series name (prefix included) plus an optional set
/// of key-value labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricId {
    /// The series name (e.g., "app_nodejs_eventloop_lag_seconds").
    pub name: String,
    /// Optional, sorted key-value pairs for dimensional filtering.
    pub labels: Vec<(String, String)>,
}

impl MetricId {
    /// Creates a new unlabelled `MetricId`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
        }
    }

    /// Adds a dimensional label to the metric ID, returning a new `MetricId`.
    /// Labels are kept sorted by key for consistent hashing and display.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self.labels.sort_by(|a, b| a.0.cmp(&b.0));
        self
    }

    /// Returns a formatted string representation of the ID (e.g., `name{k="v",...}`).
    pub fn to_string_formatted(&self) -> String {
        if self.labels.is_empty() {
            self.name.clone()
        } else {
            let labels_str = self
                .labels
                .iter()
                .map(|(k, v)| format!("{k}=\"{v}\""))
                .collect::<Vec<_>>()
                .join(",");
            format!("{}{{{}}}", self.name, labels_str)
        }
    }
}

impl Display for MetricId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_formatted())
    }
}

/// The fundamental type of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// A value that can go up or down (e.g., current scheduler lag).
    Gauge,
    /// A windowed distribution of observations reported as quantiles.
    Summary,
}

/// How a gauge is meant to be combined when several processes report it.
///
/// This is descriptive metadata only; the collector never aggregates across
/// processes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregator {
    /// Add the values together.
    #[default]
    Sum,
    /// Average the values.
    Average,
    /// Keep the first value seen.
    First,
    /// Keep the smallest value.
    Min,
    /// Keep the largest value.
    Max,
    /// Drop the series from aggregated output.
    OmitAll,
}

/// Label set used to key the children of a summary.
pub type LabelSet = Vec<(String, String)>;

/// The observations of a summary, one sliding window per label set.
#[derive(Debug, Clone)]
pub struct SummarySeries {
    config: WindowConfig,
    children: BTreeMap<LabelSet, SlidingWindowQuantiles>,
}

impl SummarySeries {
    /// Creates an empty summary whose children will use `config`.
    pub fn new(config: WindowConfig) -> MetricsResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            children: BTreeMap::new(),
        })
    }

    /// The window configuration shared by every child.
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Records `value` for the child identified by `labels` at `now`.
    pub fn observe_at(&mut self, labels: &[(&str, &str)], value: f64, now: Instant) {
        let mut key: LabelSet = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        key.sort_by(|a, b| a.0.cmp(&b.0));
        if !self.children.contains_key(&key) {
            // The config was validated in `new`, so building a window cannot fail.
            if let Ok(window) = SlidingWindowQuantiles::starting_at(self.config.clone(), now) {
                self.children.insert(key.clone(), window);
            }
        }
        if let Some(window) = self.children.get_mut(&key) {
            window.observe_at(value, now);
        }
    }

    /// Mutable access to every child window, keyed by label set.
    pub fn children_mut(&mut self) -> impl Iterator<Item = (&LabelSet, &mut SlidingWindowQuantiles)> {
        self.children.iter_mut()
    }

    /// Total number of observations across every child.
    pub fn count(&self) -> u64 {
        self.children.values().map(|w| w.count()).sum()
    }
}

/// An enumeration of possible metric values.
#[derive(Debug, Clone)]
pub enum MetricValue {
    /// A 64-bit float for gauges.
    Gauge(f64),
    /// Sliding-window observations for summaries.
    Summary(SummarySeries),
}

impl MetricValue {
    /// Returns the [`MetricType`] corresponding to this value.
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricValue::Gauge(_) => MetricType::Gauge,
            MetricValue::Summary(_) => MetricType::Summary,
        }
    }

    /// Returns the value as an `f64` if it is a `Gauge`.
    pub fn as_gauge(&self) -> Option<f64> {
        match self {
            MetricValue::Gauge(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the observations if this is a `Summary`.
    pub fn as_summary(&self) -> Option<&SummarySeries> {
        match self {
            MetricValue::Summary(series) => Some(series),
            _ => None,
        }
    }
}

/// Descriptive, static metadata about a metric.
#[derive(Debug, Clone)]
pub struct MetricMetadata {
    /// The metric's unique identifier.
    pub id: MetricId,
    /// The type of the metric.
    pub metric_type: MetricType,
    /// A human-readable description of what the metric measures.
    pub help: String,
    /// How the series should be combined across processes.
    pub aggregator: Aggregator,
    /// The instant when this metric was first registered.
    pub created_at: Instant,
    /// The instant when this metric was last updated.
    pub last_updated: Instant,
}

impl MetricMetadata {
    /// Creates new metadata for a metric.
    pub fn new(
        id: MetricId,
        metric_type: MetricType,
        help: impl Into<String>,
        aggregator: Aggregator,
    ) -> Self {
        let now = Instant::now();
        Self {
            id,
            metric_type,
            help: help.into(),
            aggregator,
            created_at: now,
            last_updated: now,
        }
    }

    /// Updates the `last_updated` instant to the current time.
    pub fn update_timestamp(&mut self) {
        self.last_updated = Instant::now();
    }
}

/// A complete metric entry, combining its value with its descriptive metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The static, descriptive metadata for the metric.
    pub metadata: MetricMetadata,
    /// The current, dynamic value of the metric.
    pub value: MetricValue,
    /// Wall-clock time (unix milliseconds) attached to the last published sample.
    pub timestamp_ms: Option<i64>,
}

impl Metric {
    /// A convenience constructor for creating a new `Gauge` metric.
    pub fn new_gauge(
        id: MetricId,
        help: impl Into<String>,
        aggregator: Aggregator,
        initial_value: f64,
    ) -> Self {
        Self {
            metadata: MetricMetadata::new(id, MetricType::Gauge, help, aggregator),
            value: MetricValue::Gauge(initial_value),
            timestamp_ms: None,
        }
    }

    /// A convenience constructor for creating a new, empty `Summary` metric.
    pub fn new_summary(
        id: MetricId,
        help: impl Into<String>,
        window: WindowConfig,
    ) -> MetricsResult<Self> {
        Ok(Self {
            metadata: MetricMetadata::new(id, MetricType::Summary, help, Aggregator::Sum),
            value: MetricValue::Summary(SummarySeries::new(window)?),
            timestamp_ms: None,
        })
    }
}

/// A specialized `Result` type for metric-related operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// An error that can occur within the metrics system.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsError {
    /// The requested metric was not found in the registry.
    MetricNotFound(MetricId),
    /// A metric with the same identifier is already registered.
    AlreadyRegistered(MetricId),
    /// An operation was attempted on a metric of the wrong type
    /// (e.g., observing into a gauge).
    TypeMismatch {
        /// The expected metric type for the operation.
        expected: MetricType,
        /// The actual metric type that was found.
        found: MetricType,
    },
    /// An error originating from the backend storage layer.
    StorageError(String),
    /// An invalid operation was attempted (e.g., invalid summary window).
    InvalidOperation(String),
}

impl Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsError::MetricNotFound(id) => write!(f, "Metric not found: {id}"),
            MetricsError::AlreadyRegistered(id) => {
                write!(f, "A metric with the name {id} has already been registered")
            }
            MetricsError::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {expected:?}, found {found:?}")
            }
            MetricsError::StorageError(msg) => write!(f, "Storage error: {msg}"),
            MetricsError::InvalidOperation(msg) => write!(f, "Invalid operation: {msg}"),
        }
    }
}

impl std::error::Error for MetricsError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_metric_id_creation() {
        let id = MetricId::new("http_requests")
            .with_label("route", "/metrics")
            .with_label("method", "GET");

        assert_eq!(id.name, "http_requests");
        assert_eq!(id.labels.len(), 2);

        // Labels should be sorted
        assert_eq!(id.labels[0], ("method".to_string(), "GET".to_string()));
        assert_eq!(id.labels[1], ("route".to_string(), "/metrics".to_string()));
    }

    #[test]
    fn test_metric_id_formatting() {
        let id1 = MetricId::new("nodejs_eventloop_lag_seconds");
        assert_eq!(id1.to_string_formatted(), "nodejs_eventloop_lag_seconds");

        let id2 = MetricId::new("requests").with_label("code", "200");
        assert_eq!(id2.to_string_formatted(), "requests{code=\"200\"}");
    }

    #[test]
    fn test_metric_value_types() {
        let gauge = MetricValue::Gauge(0.25);
        assert_eq!(gauge.metric_type(), MetricType::Gauge);
        assert_eq!(gauge.as_gauge(), Some(0.25));
        assert!(gauge.as_summary().is_none());

        let summary = MetricValue::Summary(SummarySeries::new(WindowConfig::default()).unwrap());
        assert_eq!(summary.metric_type(), MetricType::Summary);
        assert_eq!(summary.as_gauge(), None);
    }

    #[test]
    fn test_gauge_creation() {
        let id = MetricId::new("lag");
        let metric = Metric::new_gauge(id.clone(), "Lag", Aggregator::Average, 0.0);

        assert_eq!(metric.metadata.id, id);
        assert_eq!(metric.metadata.metric_type, MetricType::Gauge);
        assert_eq!(metric.metadata.aggregator, Aggregator::Average);
        assert_eq!(metric.value.as_gauge(), Some(0.0));
        assert!(metric.timestamp_ms.is_none());
    }

    #[test]
    fn test_summary_children_are_keyed_by_sorted_labels() {
        let now = Instant::now();
        let mut series = SummarySeries::new(WindowConfig {
            percentiles: vec![0.5],
            max_age: Duration::from_secs(60),
            age_buckets: 2,
        })
        .unwrap();

        series.observe_at(&[], 1.0, now);
        series.observe_at(&[("b", "2"), ("a", "1")], 2.0, now);
        series.observe_at(&[("a", "1"), ("b", "2")], 3.0, now);

        assert_eq!(series.count(), 3);
        assert_eq!(series.children_mut().count(), 2);
    }

    #[test]
    fn test_summary_rejects_invalid_window() {
        let result = Metric::new_summary(
            MetricId::new("bad"),
            "Bad window",
            WindowConfig {
                age_buckets: 0,
                ..WindowConfig::default()
            },
        );
        assert!(matches!(result, Err(MetricsError::InvalidOperation(_))));
    }
}

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

//! Provides the foundational traits and data structures for runtime telemetry.
//!
//! This module defines the "common language" for every series the collector
//! publishes. It contains the metric data model, the aggregation primitives the
//! in-memory registry relies on, and the [`MetricProducer`] contract.
//!
//! The abstract "what" lives here, `pulse-telemetry` provides the registry and
//! the orchestrator, and `pulse-infra` provides the concrete host facilities.

pub mod histogram;
pub mod metrics;
pub mod monitoring;
pub mod quantiles;

pub use self::histogram::{DelayHistogram, HistogramSnapshot};
pub use self::metrics::{
    Aggregator, Metric, MetricId, MetricType, MetricValue, MetricsError, MetricsResult,
    SummarySeries,
};
pub use self::monitoring::MetricProducer;
pub use self::quantiles::{SlidingWindowQuantiles, WindowConfig};

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

//! A running histogram of scheduling delays, in nanoseconds.

use super::metrics::{MetricsError, MetricsResult};
use hdrhistogram::Histogram;

/// Largest trackable delay, about 73 minutes. Longer delays saturate.
const HIGHEST_TRACKABLE_NANOS: u64 = 1 << 42;
const SIGNIFICANT_FIGURES: u8 = 3;

/// Lifetime distribution of delay samples, backed by an HDR histogram.
#[derive(Debug, Clone)]
pub struct DelayHistogram {
    inner: Histogram<u64>,
}

impl DelayHistogram {
    /// Creates an empty histogram.
    pub fn new() -> MetricsResult<Self> {
        let inner = Histogram::new_with_bounds(1, HIGHEST_TRACKABLE_NANOS, SIGNIFICANT_FIGURES)
            .map_err(|e| MetricsError::InvalidOperation(format!("delay histogram: {e}")))?;
        Ok(Self { inner })
    }

    /// Records one delay sample.
    pub fn record(&mut self, nanos: u64) {
        self.inner.saturating_record(nanos);
    }

    /// Number of recorded samples.
    pub fn count(&self) -> u64 {
        self.inner.len()
    }

    /// Captures the statistics the lag monitor publishes.
    ///
    /// An empty histogram reports zero everywhere.
    pub fn snapshot(&self) -> HistogramSnapshot {
        let h = &self.inner;
        if h.is_empty() {
            return HistogramSnapshot::default();
        }
        HistogramSnapshot {
            min: h.min() as f64,
            max: h.max() as f64,
            mean: h.mean(),
            stddev: h.stdev(),
            p50: h.value_at_quantile(0.5) as f64,
            p90: h.value_at_quantile(0.9) as f64,
            p99: h.value_at_quantile(0.99) as f64,
        }
    }
}

/// Point-in-time statistics of a delay histogram, in nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistogramSnapshot {
    /// Smallest delay.
    pub min: f64,
    /// Largest delay.
    pub max: f64,
    /// Mean delay.
    pub mean: f64,
    /// Standard deviation of the delays.
    pub stddev: f64,
    /// 50th percentile.
    pub p50: f64,
    /// 90th percentile.
    pub p90: f64,
    /// 99th percentile.
    pub p99: f64,
}

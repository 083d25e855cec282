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

//! Sliding-window quantile estimation used by summary metrics.

use super::metrics::{MetricsError, MetricsResult};
use std::time::{Duration, Instant};
use tdigest::TDigest;

/// Centroids kept per t-digest.
const DIGEST_SIZE: usize = 100;
/// Observations buffered before they are merged into a digest.
const BUFFER_LIMIT: usize = 128;

/// Static shape of a sliding window: which quantiles to report and how long
/// an observation stays visible.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    /// Quantiles to report, each in `(0, 1]`.
    pub percentiles: Vec<f64>,
    /// How long an observation contributes to the reported quantiles.
    pub max_age: Duration,
    /// Number of rotating buckets the window is split into.
    pub age_buckets: usize,
}

impl WindowConfig {
    /// Checks that the configuration describes a usable window.
    pub fn validate(&self) -> MetricsResult<()> {
        if self.age_buckets == 0 {
            return Err(MetricsError::InvalidOperation(
                "a summary window needs at least one age bucket".to_string(),
            ));
        }
        if self.max_age.is_zero() {
            return Err(MetricsError::InvalidOperation(
                "a summary window needs a non-zero max age".to_string(),
            ));
        }
        if let Some(bad) = self
            .percentiles
            .iter()
            .find(|q| !(**q > 0.0 && **q <= 1.0))
        {
            return Err(MetricsError::InvalidOperation(format!(
                "quantile {bad} is outside (0, 1]"
            )));
        }
        Ok(())
    }

    fn rotation_interval(&self) -> Duration {
        self.max_age / self.age_buckets as u32
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            percentiles: vec![0.01, 0.05, 0.5, 0.9, 0.95, 0.99, 0.999],
            max_age: Duration::from_secs(600),
            age_buckets: 5,
        }
    }
}

/// One rotating slice of the window: a t-digest plus a small merge buffer.
#[derive(Debug, Clone)]
struct AgeBucket {
    digest: TDigest,
    buffer: Vec<f64>,
}

impl AgeBucket {
    fn new() -> Self {
        Self {
            digest: TDigest::new_with_size(DIGEST_SIZE),
            buffer: Vec::with_capacity(BUFFER_LIMIT),
        }
    }

    fn push(&mut self, value: f64) {
        self.buffer.push(value);
        if self.buffer.len() >= BUFFER_LIMIT {
            self.compress();
        }
    }

    fn compress(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let values = std::mem::replace(&mut self.buffer, Vec::with_capacity(BUFFER_LIMIT));
        self.digest = self.digest.merge_unsorted(values);
    }

    fn len(&self) -> usize {
        self.digest.count() as usize + self.buffer.len()
    }
}

/// Streaming quantile estimator over a sliding time window.
///
/// Every observation is written to all `age_buckets` buckets. Every
/// `max_age / age_buckets` the oldest bucket is cleared and becomes the newest,
/// so the bucket being read always holds at most `max_age` worth of samples.
/// Each bucket is a t-digest, so memory stays bounded whatever the
/// observation rate. Lifetime `count` and `sum` are never rotated out.
#[derive(Debug, Clone)]
pub struct SlidingWindowQuantiles {
    config: WindowConfig,
    buckets: Vec<AgeBucket>,
    head: usize,
    last_rotation: Instant,
    count: u64,
    sum: f64,
}

impl SlidingWindowQuantiles {
    /// Creates an empty window starting now.
    pub fn new(config: WindowConfig) -> MetricsResult<Self> {
        Self::starting_at(config, Instant::now())
    }

    /// Creates an empty window whose first rotation period starts at `now`.
    pub fn starting_at(config: WindowConfig, now: Instant) -> MetricsResult<Self> {
        config.validate()?;
        let buckets = (0..config.age_buckets).map(|_| AgeBucket::new()).collect();
        Ok(Self {
            config,
            buckets,
            head: 0,
            last_rotation: now,
            count: 0,
            sum: 0.0,
        })
    }

    /// The window configuration.
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Records an observation at the current time.
    pub fn observe(&mut self, value: f64) {
        self.observe_at(value, Instant::now());
    }

    /// Records an observation at `now`. `NaN` is ignored.
    pub fn observe_at(&mut self, value: f64, now: Instant) {
        if value.is_nan() {
            return;
        }
        self.rotate(now);
        for bucket in &mut self.buckets {
            bucket.push(value);
        }
        self.count += 1;
        self.sum += value;
    }

    /// Returns `(quantile, value)` pairs for the configured quantiles.
    pub fn quantiles(&mut self) -> Vec<(f64, f64)> {
        self.quantiles_at(Instant::now())
    }

    /// Returns `(quantile, value)` pairs as seen at `now`.
    ///
    /// An empty window reports `0.0` for every quantile.
    pub fn quantiles_at(&mut self, now: Instant) -> Vec<(f64, f64)> {
        self.rotate(now);
        let bucket = &mut self.buckets[self.head];
        bucket.compress();
        if bucket.digest.is_empty() {
            return self.config.percentiles.iter().map(|&q| (q, 0.0)).collect();
        }
        self.config
            .percentiles
            .iter()
            .map(|&q| (q, bucket.digest.estimate_quantile(q)))
            .collect()
    }

    /// Number of observations currently inside the window at `now`.
    pub fn window_len_at(&mut self, now: Instant) -> usize {
        self.rotate(now);
        self.buckets[self.head].len()
    }

    /// Total number of observations ever recorded.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of every observation ever recorded.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    fn rotate(&mut self, now: Instant) {
        let interval = self.config.rotation_interval();
        if interval.is_zero() {
            return;
        }
        let mut rotations = 0;
        while now.saturating_duration_since(self.last_rotation) > interval {
            self.buckets[self.head] = AgeBucket::new();
            self.head = (self.head + 1) % self.buckets.len();
            self.last_rotation += interval;
            rotations += 1;
            if rotations >= self.buckets.len() {
                // Everything has aged out; no need to replay the remaining periods.
                self.last_rotation = now;
                break;
            }
        }
    }
}

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

//! Registry for the producers of one collector activation.

use pulse_core::telemetry::MetricProducer;
use pulse_core::Stopwatch;
use std::sync::{Arc, RwLock};

/// A thread-safe, ordered set of metric producers.
///
/// Producers are refreshed in registration order, which the collector keeps
/// equal to the roster order.
#[derive(Debug, Clone)]
pub struct ProducerSet {
    producers: Arc<RwLock<Vec<Arc<dyn MetricProducer>>>>,
}

impl ProducerSet {
    /// Creates a new, empty producer set.
    pub fn new() -> Self {
        Self {
            producers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Registers a new producer at the end of the refresh order.
    pub fn register(&self, producer: Arc<dyn MetricProducer>) {
        let producer_id = producer.producer_id();
        let mut producers = match self.producers.write() {
            Ok(producers) => producers,
            Err(poisoned) => poisoned.into_inner(),
        };
        producers.push(producer);
        log::info!("Registered metric producer: {}", producer_id);
    }

    /// Calls `refresh` on every producer, in order.
    pub fn refresh_all(&self) {
        let stopwatch = Stopwatch::new();
        // Refresh outside the lock so a slow producer never blocks `clear`.
        let producers = self.get_all_producers();
        for producer in &producers {
            producer.refresh();
        }
        log::trace!(
            "Refreshed {} metric producers in {:.3} ms",
            producers.len(),
            stopwatch.elapsed_secs_f64() * 1e3
        );
    }

    /// Returns a clone of all registered producers.
    pub fn get_all_producers(&self) -> Vec<Arc<dyn MetricProducer>> {
        match self.producers.read() {
            Ok(producers) => producers.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of registered producers.
    pub fn len(&self) -> usize {
        self.producers.read().map(|p| p.len()).unwrap_or(0)
    }

    /// Whether no producer is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every producer, releasing hooks and samplers they own.
    pub fn clear(&self) {
        let mut producers = match self.producers.write() {
            Ok(producers) => producers,
            Err(poisoned) => poisoned.into_inner(),
        };
        producers.clear();
    }
}

impl Default for ProducerSet {
    fn default() -> Self {
        Self::new()
    }
}

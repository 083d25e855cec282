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

use crate::storage::backend::MetricsBackend;
use pulse_core::telemetry::metrics::{Metric, MetricId, MetricsError, MetricsResult};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory metrics backend using RwLock<HashMap>
///
/// This implementation provides:
/// - Thread-safe concurrent access (multiple readers, single writer)
/// - O(1) average case lookup and insertion
/// - In-place updates and visits, so summary windows are never cloned on write
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    /// The core storage - RwLock allows concurrent reads
    storage: RwLock<HashMap<MetricId, Metric>>,
}

impl InMemoryBackend {
    /// Create a new in-memory backend
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsBackend for InMemoryBackend {
    fn register_metric(&self, metric: Metric) -> MetricsResult<()> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| MetricsError::StorageError("Failed to acquire write lock".to_string()))?;

        match storage.entry(metric.metadata.id.clone()) {
            Entry::Occupied(entry) => Err(MetricsError::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(metric);
                Ok(())
            }
        }
    }

    fn update_metric(
        &self,
        id: &MetricId,
        update: &mut dyn FnMut(&mut Metric) -> MetricsResult<()>,
    ) -> MetricsResult<()> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| MetricsError::StorageError("Failed to acquire write lock".to_string()))?;

        let metric = storage
            .get_mut(id)
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))?;
        update(metric)
    }

    fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        let storage = self
            .storage
            .read()
            .map_err(|_| MetricsError::StorageError("Failed to acquire read lock".to_string()))?;

        storage
            .get(id)
            .cloned()
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))
    }

    fn contains_metric(&self, id: &MetricId) -> bool {
        if let Ok(storage) = self.storage.read() {
            storage.contains_key(id)
        } else {
            false
        }
    }

    fn remove_metric(&self, id: &MetricId) -> MetricsResult<()> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| MetricsError::StorageError("Failed to acquire write lock".to_string()))?;

        storage
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))
    }

    fn list_metric_ids(&self) -> Vec<MetricId> {
        if let Ok(storage) = self.storage.read() {
            storage.keys().cloned().collect()
        } else {
            Vec::new()
        }
    }

    fn visit_metrics(&self, visit: &mut dyn FnMut(&mut Metric)) -> MetricsResult<()> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| MetricsError::StorageError("Failed to acquire write lock".to_string()))?;

        storage.values_mut().for_each(visit);
        Ok(())
    }

    fn clear_all(&self) -> MetricsResult<()> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| MetricsError::StorageError("Failed to acquire write lock".to_string()))?;

        storage.clear();
        Ok(())
    }

    fn metric_count(&self) -> usize {
        if let Ok(storage) = self.storage.read() {
            storage.len()
        } else {
            0
        }
    }
}

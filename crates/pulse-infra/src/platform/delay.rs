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

//! Event-loop-delay sampling.
//!
//! A sampler task sleeps for the requested resolution in a loop and records
//! how late each wake-up was. A busy runtime wakes the task late, so the
//! recorded overshoot is the scheduling delay other tasks experience too.

use pulse_core::platform::{DelayMonitor, DelaySampler};
use pulse_core::telemetry::{DelayHistogram, HistogramSnapshot, MetricsResult};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant};

const MIN_RESOLUTION: Duration = Duration::from_millis(1);

/// Starts one sampler task per [`enable`](DelayMonitor::enable) call.
#[derive(Debug, Clone)]
pub struct SamplingDelayMonitor {
    runtime: Handle,
}

impl SamplingDelayMonitor {
    /// Samples on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }
}

impl DelayMonitor for SamplingDelayMonitor {
    fn enable(&self, resolution: Duration) -> MetricsResult<Box<dyn DelaySampler>> {
        let resolution = resolution.max(MIN_RESOLUTION);
        let histogram = Arc::new(Mutex::new(DelayHistogram::new()?));
        let recorder = Arc::clone(&histogram);
        let task = self.runtime.spawn(async move {
            loop {
                let expected = Instant::now() + resolution;
                time::sleep_until(expected).await;
                let overshoot = Instant::now().saturating_duration_since(expected);
                let nanos = u64::try_from(overshoot.as_nanos()).unwrap_or(u64::MAX);
                lock(&recorder).record(nanos);
            }
        });
        log::debug!("Event-loop-delay sampling started every {:?}", resolution);
        Ok(Box::new(SamplerTask {
            histogram,
            task: task.abort_handle(),
            resolution,
        }))
    }
}

fn lock(histogram: &Mutex<DelayHistogram>) -> MutexGuard<'_, DelayHistogram> {
    match histogram.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Debug)]
struct SamplerTask {
    histogram: Arc<Mutex<DelayHistogram>>,
    task: AbortHandle,
    resolution: Duration,
}

impl DelaySampler for SamplerTask {
    fn snapshot(&self) -> HistogramSnapshot {
        lock(&self.histogram).snapshot()
    }
}

impl Drop for SamplerTask {
    fn drop(&mut self) {
        self.task.abort();
        log::debug!("Event-loop-delay sampling every {:?} stopped", self.resolution);
    }
}

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

//! Native event-loop-delay sampling.

use crate::telemetry::histogram::HistogramSnapshot;
use crate::telemetry::metrics::MetricsResult;
use std::fmt::Debug;
use std::time::Duration;

/// A running delay sampler. Dropping it stops the sampling.
pub trait DelaySampler: Send + Sync + Debug + 'static {
    /// Lifetime statistics of the observed scheduling delays, in nanoseconds.
    fn snapshot(&self) -> HistogramSnapshot;
}

/// A host facility that continuously samples scheduler delay into a histogram.
pub trait DelayMonitor: Send + Sync + Debug + 'static {
    /// Starts sampling with the requested `resolution`.
    fn enable(&self, resolution: Duration) -> MetricsResult<Box<dyn DelaySampler>>;
}

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

//! Provides the contract every metric producer implements.
//!
//! A producer is built once per collector activation. Building it registers its
//! series against the target registry; afterwards the collector only ever calls
//! [`MetricProducer::refresh`], which flushes whatever internal state the
//! producer maintains into those series.

use std::borrow::Cow;
use std::fmt::Debug;

/// The core trait for a metric producer.
///
/// Producers live in `pulse-telemetry`; the collector holds a fixed roster of
/// them and calls `refresh` on each, in roster order, on every tick.
pub trait MetricProducer: Send + Sync + Debug + 'static {
    /// Returns the stable roster name of this producer (e.g. "event_loop_lag").
    fn producer_id(&self) -> Cow<'static, str>;

    /// The unprefixed series names this producer owns.
    ///
    /// The list is fixed and independent of configuration, so the collector can
    /// use it for cleanup even for series that were never registered.
    fn metric_names(&self) -> &'static [&'static str];

    /// Flushes the producer's current state into the registry.
    ///
    /// Must be fast and non-blocking. Failures are logged, never propagated.
    fn refresh(&self);

    /// Allows downcasting to a concrete producer type.
    fn as_any(&self) -> &dyn std::any::Any;
}

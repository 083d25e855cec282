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

//! # Pulse Telemetry
//!
//! The registry collaborator, the default metric producers and the
//! [`Collector`] that keeps them refreshed.
//!
//! `pulse-core` defines the contracts; this crate implements them against an
//! injected [`Platform`](pulse_core::Platform), and `pulse-infra` provides the
//! concrete platform.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod monitoring;
pub mod producers;
pub mod service;
pub mod storage;

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
mod test_support;

pub use config::{ActivationConfig, CollectorOptions, NormalizedConfig};
pub use error::{CollectorError, CollectorResult};
pub use metrics::{GaugeHandle, GaugeOptions, MetricsRegistry, SummaryHandle, SummaryOptions};
pub use service::{Collector, CollectorHandle};

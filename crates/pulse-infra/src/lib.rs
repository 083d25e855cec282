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

//! # Pulse Infra
//!
//! Concrete implementations of the platform contracts declared in
//! `pulse_core::platform`, on top of tokio and sysinfo.
//!
//! [`HostPlatform::detect`] assembles everything the current process supports
//! into a [`Platform`](pulse_core::Platform) ready to hand to a collector.

#![warn(missing_docs)]

pub mod error;
pub mod host;
pub mod platform;
pub mod telemetry;

pub use error::{InfraError, InfraResult};
pub use host::{HostPlatform, HostPlatformBuilder};
pub use platform::{MonotonicClock, SamplingDelayMonitor, TokioScheduler};
pub use telemetry::{SysinfoProcessStats, TokioRuntimeStats};

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

//! # Pulse Core
//!
//! Foundational crate containing the traits, core types, and interface contracts
//! shared by the runtime telemetry collector.
//!
//! - [`telemetry`] defines what a metric is, how it is identified, and what a
//!   metric producer looks like.
//! - [`platform`] defines the host facilities the producers rely on (clock,
//!   deferred scheduler, lifecycle hooks, delay sampling, process statistics),
//!   so that concrete runtimes can be injected and tests can stay deterministic.

#![warn(missing_docs)]

pub mod platform;
pub mod telemetry;
pub mod utils;

pub use platform::{Capabilities, CapabilityQuery, Platform};
pub use utils::timer::Stopwatch;

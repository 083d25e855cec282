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

//! Errors surfaced by collector activation and configuration loading.

use pulse_core::telemetry::MetricsError;
use thiserror::Error;

/// Errors returned by [`Collector::activate`](crate::Collector::activate) and
/// the configuration loaders.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// The configuration is unusable as given.
    #[error("invalid collector configuration: {0}")]
    InvalidConfig(String),

    /// The registry rejected a series, typically a duplicate name.
    #[error("registry error: {0}")]
    Registry(#[from] MetricsError),

    /// A TOML configuration document could not be parsed.
    #[error("failed to parse collector configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A configuration file could not be read.
    #[error("failed to read collector configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for collector operations.
pub type CollectorResult<T> = Result<T, CollectorError>;

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

//! Collector configuration.
//!
//! [`CollectorOptions`] is a plain record with documented defaults. Callers
//! overlay the fields they care about, either with the `with_*` builders or by
//! loading a TOML document. [`ActivationConfig`] is what `activate` accepts: it
//! also admits a bare number, the legacy shorthand for the refresh period.

use crate::error::{CollectorError, CollectorResult};
use crate::metrics::MetricsRegistry;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default refresh period, in milliseconds.
pub const DEFAULT_REFRESH_TIMEOUT_MS: u64 = 10_000;

/// Default resolution of the event-loop-delay histogram, in milliseconds.
pub const DEFAULT_MONITORING_PRECISION_MS: u64 = 10;

/// Options recognized by the collector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorOptions {
    /// Attach the sample time to every published value.
    pub timestamps: bool,
    /// Resolution requested from the event-loop-delay histogram.
    #[serde(alias = "eventLoopMonitoringPrecision")]
    pub event_loop_monitoring_precision_ms: u64,
    /// Period of the shared refresh timer.
    #[serde(alias = "refreshTimeout")]
    pub refresh_timeout_ms: u64,
    /// Opt in to tracing deferred tick callbacks.
    #[serde(alias = "monitorNextTick")]
    pub monitor_next_tick: bool,
    /// Opt in to tracing immediate callbacks.
    #[serde(alias = "monitorImmediate")]
    pub monitor_immediate: bool,
    /// Prepended to every series name.
    pub prefix: String,
    /// Target registry; `None` selects the process-wide default.
    #[serde(skip)]
    pub register: Option<MetricsRegistry>,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            timestamps: true,
            event_loop_monitoring_precision_ms: DEFAULT_MONITORING_PRECISION_MS,
            refresh_timeout_ms: DEFAULT_REFRESH_TIMEOUT_MS,
            monitor_next_tick: false,
            monitor_immediate: false,
            prefix: String::new(),
            register: None,
        }
    }
}

impl CollectorOptions {
    /// Sets whether samples carry timestamps.
    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Sets the event-loop-delay histogram resolution.
    pub fn with_event_loop_monitoring_precision_ms(mut self, precision_ms: u64) -> Self {
        self.event_loop_monitoring_precision_ms = precision_ms;
        self
    }

    /// Sets the refresh period.
    pub fn with_refresh_timeout_ms(mut self, refresh_timeout_ms: u64) -> Self {
        self.refresh_timeout_ms = refresh_timeout_ms;
        self
    }

    /// Sets the tick-callback tracing opt-in.
    pub fn with_monitor_next_tick(mut self, enabled: bool) -> Self {
        self.monitor_next_tick = enabled;
        self
    }

    /// Sets the immediate-callback tracing opt-in.
    pub fn with_monitor_immediate(mut self, enabled: bool) -> Self {
        self.monitor_immediate = enabled;
        self
    }

    /// Sets the series name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Targets `registry` instead of the process-wide default.
    pub fn with_register(mut self, registry: MetricsRegistry) -> Self {
        self.register = Some(registry);
        self
    }

    /// The refresh period as a [`Duration`].
    pub fn refresh_period(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }

    /// The histogram resolution as a [`Duration`].
    pub fn lag_resolution(&self) -> Duration {
        Duration::from_millis(self.event_loop_monitoring_precision_ms)
    }

    /// The registry series are written into.
    pub fn registry(&self) -> MetricsRegistry {
        self.register.clone().unwrap_or_else(MetricsRegistry::global)
    }

    /// Rejects option values the collector cannot honor.
    pub fn validate(&self) -> CollectorResult<()> {
        if self.refresh_timeout_ms == 0 {
            return Err(CollectorError::InvalidConfig(
                "refresh_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.event_loop_monitoring_precision_ms == 0 {
            return Err(CollectorError::InvalidConfig(
                "event_loop_monitoring_precision_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(bad) = self
            .prefix
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == ':'))
        {
            return Err(CollectorError::InvalidConfig(format!(
                "prefix {:?} contains the invalid character {:?}",
                self.prefix, bad
            )));
        }
        Ok(())
    }

    /// Parses options from a TOML document, filling in defaults.
    pub fn from_toml_str(source: &str) -> CollectorResult<Self> {
        let options: CollectorOptions = toml::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads and parses a TOML options file.
    pub fn from_path(path: impl AsRef<Path>) -> CollectorResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        log::debug!("Loading collector options from {}", path.display());
        Self::from_toml_str(&source)
    }
}

/// What `activate` accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationConfig {
    /// A full options record.
    Options(CollectorOptions),
    /// Deprecated: a bare refresh period in milliseconds.
    LegacyTimeout(u64),
}

impl Default for ActivationConfig {
    fn default() -> Self {
        ActivationConfig::Options(CollectorOptions::default())
    }
}

impl From<CollectorOptions> for ActivationConfig {
    fn from(options: CollectorOptions) -> Self {
        ActivationConfig::Options(options)
    }
}

impl From<u64> for ActivationConfig {
    fn from(refresh_timeout_ms: u64) -> Self {
        ActivationConfig::LegacyTimeout(refresh_timeout_ms)
    }
}

impl From<Option<CollectorOptions>> for ActivationConfig {
    fn from(options: Option<CollectorOptions>) -> Self {
        ActivationConfig::Options(options.unwrap_or_default())
    }
}

/// Options after defaults and the legacy adapter have been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedConfig {
    /// The effective options.
    pub options: CollectorOptions,
    /// Whether the deprecated numeric shorthand was used.
    pub deprecated: bool,
}

impl ActivationConfig {
    /// Resolves the legacy shorthand and validates the result.
    ///
    /// Logs a deprecation warning when the numeric shorthand is used.
    pub fn normalize(self) -> CollectorResult<NormalizedConfig> {
        let normalized = match self {
            ActivationConfig::Options(options) => NormalizedConfig {
                options,
                deprecated: false,
            },
            ActivationConfig::LegacyTimeout(refresh_timeout_ms) => {
                log::warn!(
                    "Passing a bare refresh period ({} ms) is deprecated; \
                     pass CollectorOptions with refresh_timeout_ms instead",
                    refresh_timeout_ms
                );
                NormalizedConfig {
                    options: CollectorOptions::default().with_refresh_timeout_ms(refresh_timeout_ms),
                    deprecated: true,
                }
            }
        };
        normalized.options.validate()?;
        Ok(normalized)
    }
}

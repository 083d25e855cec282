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

//! The collector: builds the producer roster and keeps it refreshed.

use crate::config::ActivationConfig;
use crate::error::CollectorResult;
use crate::metrics::MetricsRegistry;
use crate::monitoring::ProducerSet;
use crate::producers::{self, ProducerContext, ROSTER};
use pulse_core::platform::{TickAction, TimerHandle};
use pulse_core::telemetry::{MetricProducer, MetricsError};
use pulse_core::Platform;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

struct HandleInner {
    timer: Box<dyn TimerHandle>,
    period: Duration,
    activation: u64,
    deprecated_config: bool,
}

/// The running refresh timer of one activation.
///
/// Cloning yields another handle on the same timer.
#[derive(Clone)]
pub struct CollectorHandle {
    inner: Arc<HandleInner>,
}

impl CollectorHandle {
    /// Whether the timer will fire again.
    pub fn is_active(&self) -> bool {
        self.inner.timer.is_active()
    }

    /// Stops the timer. Producers stay registered until the next activation.
    pub fn cancel(&self) {
        self.inner.timer.cancel();
    }

    /// The refresh period.
    pub fn period(&self) -> Duration {
        self.inner.period
    }

    /// Which activation of its collector this handle belongs to, starting at 1.
    pub fn activation(&self) -> u64 {
        self.inner.activation
    }

    /// Whether the activation used the deprecated numeric shorthand.
    pub fn used_deprecated_config(&self) -> bool {
        self.inner.deprecated_config
    }
}

impl fmt::Debug for CollectorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorHandle")
            .field("activation", &self.inner.activation)
            .field("period", &self.inner.period)
            .field("active", &self.is_active())
            .finish()
    }
}

/// What is left of the latest activation; used to clean up on the next one.
#[derive(Debug)]
struct Activation {
    registry: MetricsRegistry,
    series: Vec<String>,
    producers: ProducerSet,
    handle: Option<CollectorHandle>,
}

impl Activation {
    fn shut_down(&self) {
        if let Some(handle) = &self.handle {
            handle.cancel();
        }
        self.producers.clear();
    }

    fn remove_series(&self) {
        let removed = remove_created(&self.registry, &self.series);
        log::debug!("Removed {} series of the previous activation", removed);
    }
}

/// Removes `series` from `registry`, skipping names that are already gone.
fn remove_created(registry: &MetricsRegistry, series: &[String]) -> usize {
    let mut removed = 0;
    for name in series {
        match registry.remove_single_metric(name) {
            Ok(()) => removed += 1,
            Err(MetricsError::MetricNotFound(_)) => {}
            Err(e) => log::warn!("Failed to remove {}: {}", name, e),
        }
    }
    removed
}

/// Periodically samples the host and republishes the samples as series.
///
/// The collector is **idle** until [`activate`](Collector::activate) is called
/// and **active** while its timer is armed. Activating again tears down the
/// previous activation first, so there is at most one live timer per collector.
#[derive(Debug)]
pub struct Collector {
    platform: Platform,
    last: Option<Activation>,
    activations: u64,
}

impl Collector {
    /// Creates an idle collector over `platform`.
    pub fn new(platform: Platform) -> Self {
        log::debug!("Collector created with {:?}", platform.capabilities());
        Self {
            platform,
            last: None,
            activations: 0,
        }
    }

    /// Builds every producer, refreshes them once and arms the refresh timer.
    ///
    /// On re-activation the previous timer is cancelled, the previous producers
    /// are dropped and the series the previous activation created are removed
    /// before anything is rebuilt. Series registered by anyone else are never
    /// removed, so a name clash is reported as
    /// [`MetricsError::AlreadyRegistered`].
    ///
    /// If a producer fails to build, the series created so far are removed
    /// again and the collector is left idle. An invalid configuration is
    /// rejected before the running activation is touched.
    pub fn activate(&mut self, config: impl Into<ActivationConfig>) -> CollectorResult<CollectorHandle> {
        let normalized = config.into().normalize()?;
        let options = normalized.options;

        if let Some(previous) = self.last.take() {
            previous.shut_down();
            previous.remove_series();
        }

        let registry = options.registry();
        let producer_set = ProducerSet::new();
        let ctx = ProducerContext::new(&registry, &options, &self.platform);
        for spec in ROSTER {
            match (spec.build)(&ctx) {
                Ok(producer) => producer_set.register(producer),
                Err(e) => {
                    log::warn!("Failed to build producer {}: {}", spec.name, e);
                    producer_set.clear();
                    let removed = remove_created(&registry, &ctx.created_series());
                    log::debug!("Rolled back {} series of the failed activation", removed);
                    return Err(e.into());
                }
            }
        }
        let series = ctx.created_series();

        producer_set.refresh_all();

        let period = options.refresh_period();
        let action: TickAction = {
            let producer_set = producer_set.clone();
            Arc::new(move || producer_set.refresh_all())
        };
        let timer = self.platform.scheduler().every(period, action);

        self.activations += 1;
        let handle = CollectorHandle {
            inner: Arc::new(HandleInner {
                timer,
                period,
                activation: self.activations,
                deprecated_config: normalized.deprecated,
            }),
        };
        self.last = Some(Activation {
            registry,
            series,
            producers: producer_set.clone(),
            handle: Some(handle.clone()),
        });

        log::info!(
            "Collecting {} producers every {:?} (activation {})",
            producer_set.len(),
            period,
            self.activations
        );
        Ok(handle)
    }

    /// Cancels the timer and drops the producers. Series stay registered.
    pub fn stop(&mut self) {
        if let Some(activation) = &self.last {
            activation.shut_down();
            log::info!("Collector stopped");
        }
    }

    /// Whether a refresh timer is armed.
    pub fn is_active(&self) -> bool {
        self.last
            .as_ref()
            .and_then(|activation| activation.handle.as_ref())
            .is_some_and(CollectorHandle::is_active)
    }

    /// Names of the fixed producer roster, in refresh order.
    pub fn roster(&self) -> Vec<&'static str> {
        producers::roster_names()
    }

    /// The registry of the latest activation.
    pub fn registry(&self) -> Option<&MetricsRegistry> {
        self.last.as_ref().map(|activation| &activation.registry)
    }

    /// The live producers, in refresh order.
    pub fn producers(&self) -> Vec<Arc<dyn MetricProducer>> {
        self.last
            .as_ref()
            .map(|activation| activation.producers.get_all_producers())
            .unwrap_or_default()
    }

    /// The handle of the latest activation.
    pub fn handle(&self) -> Option<&CollectorHandle> {
        self.last.as_ref().and_then(|activation| activation.handle.as_ref())
    }

    /// The platform the collector samples.
    pub fn platform(&self) -> &Platform {
        &self.platform
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        if let Some(activation) = &self.last {
            activation.shut_down();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectorOptions;
    use crate::error::CollectorError;
    use crate::metrics::GaugeOptions;
    use crate::producers::{EventLoopLag, LagMode};
    use crate::test_support::Doubles;
    use pulse_core::platform::ProcessSnapshot;

    fn options(registry: &MetricsRegistry) -> CollectorOptions {
        CollectorOptions::default().with_register(registry.clone())
    }

    #[test]
    fn test_activation_refreshes_before_returning() {
        let doubles = Doubles::new();
        let registry = MetricsRegistry::new();
        let mut collector = Collector::new(doubles.full_platform());

        let handle = collector.activate(options(&registry)).unwrap();

        assert!(collector.is_active());
        assert_eq!(handle.activation(), 1);
        assert_eq!(handle.period(), Duration::from_secs(10));
        let fds = registry.get_single_metric("process_open_fds").unwrap();
        assert_eq!(fds.value.as_gauge(), Some(12.0));
    }

    #[test]
    fn test_timer_refreshes_in_roster_order() {
        let doubles = Doubles::new();
        let registry = MetricsRegistry::new();
        let mut collector = Collector::new(doubles.full_platform());
        collector.activate(options(&registry)).unwrap();

        let ids: Vec<String> = collector
            .producers()
            .iter()
            .map(|p| p.producer_id().into_owned())
            .collect();
        assert_eq!(ids, collector.roster());

        *doubles.process.0.lock().unwrap() = ProcessSnapshot {
            open_fds: Some(99),
            ..ProcessSnapshot::default()
        };
        assert_eq!(doubles.scheduler.fire_timers(), 1);

        let fds = registry.get_single_metric("process_open_fds").unwrap();
        assert_eq!(fds.value.as_gauge(), Some(99.0));
    }

    #[test]
    fn test_lag_mode_follows_capabilities() {
        let doubles = Doubles::new();
        let registry = MetricsRegistry::new();

        let mut precise = Collector::new(doubles.full_platform());
        precise.activate(options(&registry)).unwrap();
        let mode = |collector: &Collector| {
            collector
                .producers()
                .iter()
                .find_map(|p| p.as_any().downcast_ref::<EventLoopLag>().map(EventLoopLag::mode))
        };
        assert_eq!(mode(&precise), Some(LagMode::Precise));

        let other = MetricsRegistry::new();
        let mut fallback = Collector::new(doubles.minimal_platform());
        fallback.activate(options(&other)).unwrap();
        assert_eq!(mode(&fallback), Some(LagMode::Fallback));
        // The initial refresh queued one check.
        assert_eq!(doubles.scheduler.pending(), 1);
    }

    #[test]
    fn test_first_activation_rejects_existing_series() {
        let doubles = Doubles::new();
        let registry = MetricsRegistry::new();
        registry
            .create_gauge(GaugeOptions::new("process_max_fds", "taken"))
            .unwrap();

        let mut collector = Collector::new(doubles.full_platform());
        let err = collector.activate(options(&registry)).unwrap_err();

        assert!(matches!(
            err,
            CollectorError::Registry(MetricsError::AlreadyRegistered(_))
        ));
        assert!(!collector.is_active());
        assert_eq!(doubles.scheduler.active_timers(), 0);
        // Producers built before the failure were released.
        assert_eq!(doubles.delay.live_samplers(), 0);
    }

    #[test]
    fn test_failed_activation_never_removes_caller_series() {
        let doubles = Doubles::new();
        let registry = MetricsRegistry::new();
        let owned = registry
            .create_gauge(GaugeOptions::new("process_max_fds", "owned by the caller"))
            .unwrap();
        owned.set(42.0).unwrap();

        let mut collector = Collector::new(doubles.full_platform());
        for _ in 0..2 {
            let err = collector.activate(options(&registry)).unwrap_err();
            assert!(matches!(
                err,
                CollectorError::Registry(MetricsError::AlreadyRegistered(_))
            ));
            assert!(collector.registry().is_none());
            // Whatever the failed build created was rolled back.
            assert_eq!(registry.metric_names(), vec!["process_max_fds".to_string()]);
        }

        let metric = registry.get_single_metric("process_max_fds").unwrap();
        assert_eq!(metric.metadata.help, "owned by the caller");
        assert_eq!(metric.value.as_gauge(), Some(42.0));
        assert_eq!(doubles.scheduler.active_timers(), 0);
    }

    #[test]
    fn test_reactivation_leaves_unrelated_series_alone() {
        let doubles = Doubles::new();
        let registry = MetricsRegistry::new();
        let mut collector = Collector::new(doubles.full_platform());
        collector.activate(options(&registry)).unwrap();

        registry
            .create_gauge(GaugeOptions::new("app_requests", "owned by the caller"))
            .unwrap();
        collector.activate(options(&registry)).unwrap();

        assert_eq!(registry.metric_count(), 19);
        assert!(registry.get_single_metric("app_requests").is_some());
    }

    #[test]
    fn test_invalid_config_keeps_running_activation() {
        let doubles = Doubles::new();
        let registry = MetricsRegistry::new();
        let mut collector = Collector::new(doubles.full_platform());
        let handle = collector.activate(options(&registry)).unwrap();

        let err = collector
            .activate(options(&registry).with_refresh_timeout_ms(0))
            .unwrap_err();

        assert!(matches!(err, CollectorError::InvalidConfig(_)));
        assert!(handle.is_active());
        assert_eq!(registry.metric_count(), 18);
    }

    #[test]
    fn test_reactivation_moves_series_between_registries() {
        let doubles = Doubles::new();
        let first = MetricsRegistry::new();
        let second = MetricsRegistry::new();
        let mut collector = Collector::new(doubles.full_platform());

        collector
            .activate(options(&first).with_prefix("old_").with_monitor_immediate(true))
            .unwrap();
        assert_eq!(first.metric_count(), 19);

        collector.activate(options(&second).with_prefix("new_")).unwrap();

        assert_eq!(first.metric_count(), 0);
        assert_eq!(second.metric_count(), 18);
        assert!(collector.registry().unwrap().same_target(&second));
        assert!(second
            .metric_names()
            .iter()
            .all(|name| name.starts_with("new_")));
        assert_eq!(doubles.hooks.hook_count(), 0);
        assert_eq!(doubles.delay.live_samplers(), 1);
    }

    #[test]
    fn test_stop_and_restart() {
        let doubles = Doubles::new();
        let registry = MetricsRegistry::new();
        let mut collector = Collector::new(doubles.full_platform());
        let handle = collector.activate(options(&registry)).unwrap();

        collector.stop();
        assert!(!collector.is_active());
        assert!(!handle.is_active());
        assert!(collector.producers().is_empty());
        assert_eq!(doubles.scheduler.fire_timers(), 0);
        assert_eq!(registry.metric_count(), 18);

        let handle = collector.activate(options(&registry)).unwrap();
        assert_eq!(handle.activation(), 2);
        assert_eq!(doubles.scheduler.active_timers(), 1);
        assert_eq!(registry.metric_count(), 18);
    }

    #[test]
    fn test_drop_cancels_timer() {
        let doubles = Doubles::new();
        let registry = MetricsRegistry::new();
        let mut collector = Collector::new(doubles.full_platform());
        let handle = collector.activate(options(&registry)).unwrap();

        drop(collector);

        assert!(!handle.is_active());
        assert_eq!(doubles.scheduler.active_timers(), 0);
        assert_eq!(doubles.delay.live_samplers(), 0);
    }
}

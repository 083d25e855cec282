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

mod common;

use common::Doubles;
use pulse_core::platform::{DeferredScheduler, ResourceKind};
use pulse_core::telemetry::MetricsError;
use pulse_telemetry::metrics::SampleValue;
use pulse_telemetry::producers::all_metric_names;
use pulse_telemetry::{Collector, CollectorError, CollectorOptions, GaugeOptions, MetricsRegistry};
use std::time::Duration;

fn options(registry: &MetricsRegistry) -> CollectorOptions {
    CollectorOptions::default().with_register(registry.clone())
}

#[test]
fn test_activation_registers_exactly_the_roster_series() {
    let doubles = Doubles::new();
    let registry = MetricsRegistry::new();
    let mut collector = Collector::new(doubles.full_platform());

    collector
        .activate(
            options(&registry)
                .with_monitor_immediate(true)
                .with_monitor_next_tick(true),
        )
        .unwrap();

    let mut expected: Vec<String> = all_metric_names().iter().map(|n| n.to_string()).collect();
    expected.sort();
    assert_eq!(registry.metric_names(), expected);

    for series in registry.snapshot() {
        if let SampleValue::Gauge(value) = series.value {
            assert!(value.is_finite(), "{} has no numeric value", series.name);
        }
    }
}

#[test]
fn test_activating_twice_leaves_one_live_timer() {
    let doubles = Doubles::new();
    let registry = MetricsRegistry::new();
    let mut collector = Collector::new(doubles.full_platform());

    let first = collector
        .activate(options(&registry).with_monitor_immediate(true))
        .unwrap();
    let second = collector
        .activate(options(&registry).with_monitor_immediate(true))
        .unwrap();

    assert!(!first.is_active());
    assert!(second.is_active());
    assert_eq!(second.activation(), 2);
    assert_eq!(doubles.scheduler.active_timers(), 1);
    assert_eq!(doubles.hooks.hook_count(), 1);
    assert_eq!(doubles.delay.live_samplers(), 1);
    assert_eq!(registry.metric_count(), 19);
}

#[test]
fn test_legacy_numeric_config_matches_explicit_refresh_timeout() {
    let doubles = Doubles::new();
    let mut collector = Collector::new(doubles.full_platform());

    // The legacy shorthand always targets the process-wide registry.
    let legacy = collector.activate(5000u64).unwrap();
    assert!(legacy.used_deprecated_config());
    assert_eq!(legacy.period(), Duration::from_millis(5000));
    let legacy_names = MetricsRegistry::global().metric_names();

    let explicit = collector
        .activate(CollectorOptions::default().with_refresh_timeout_ms(5000))
        .unwrap();
    assert!(!explicit.used_deprecated_config());
    assert_eq!(explicit.period(), legacy.period());
    assert_eq!(MetricsRegistry::global().metric_names(), legacy_names);
    assert_eq!(doubles.scheduler.timer_periods(), vec![Duration::from_millis(5000)]);
}

#[test]
fn test_prefixed_activation_with_full_instrumentation() {
    let doubles = Doubles::new();
    let registry = MetricsRegistry::new();
    let mut collector = Collector::new(doubles.full_platform());

    collector
        .activate(
            options(&registry)
                .with_prefix("app_")
                .with_monitor_immediate(true),
        )
        .unwrap();

    let names = registry.metric_names();
    assert!(names.len() >= 9);
    assert!(names.iter().all(|name| name.starts_with("app_")));
    assert!(names.contains(&"app_nodejs_immediate_duration_summary".to_string()));
    assert!(names.contains(&"app_nodejs_eventloop_lag_p99_seconds".to_string()));
}

#[test]
fn test_traced_immediates_reach_the_summary() {
    let doubles = Doubles::new();
    let registry = MetricsRegistry::new();
    let mut collector = Collector::new(doubles.full_platform());
    collector
        .activate(options(&registry).with_monitor_immediate(true))
        .unwrap();

    let clock = doubles.clock.clone();
    doubles.scheduler.defer(
        ResourceKind::Immediate,
        Box::new(move || clock.advance(Duration::from_millis(2))),
    );
    doubles.scheduler.run_pending();

    let summary = registry
        .get_single_metric("nodejs_immediate_duration_summary")
        .unwrap();
    assert_eq!(summary.value.as_summary().unwrap().count(), 1);
}

#[test]
fn test_fallback_lag_reflects_scheduling_delay() {
    let doubles = Doubles::new();
    let registry = MetricsRegistry::new();
    let mut collector = Collector::new(doubles.minimal_platform());
    collector.activate(options(&registry)).unwrap();

    doubles.clock.advance(Duration::from_millis(7));
    doubles.scheduler.run_pending();
    let lag = |r: &MetricsRegistry| {
        r.get_single_metric("nodejs_eventloop_lag_seconds")
            .and_then(|m| m.value.as_gauge())
            .unwrap()
    };
    assert_eq!(lag(&registry), 0.007);

    // The next tick checks again.
    doubles.scheduler.fire_timers();
    doubles.scheduler.run_pending();
    assert_eq!(lag(&registry), 0.0);
}

#[test]
fn test_duplicate_series_on_first_activation_is_fatal() {
    let doubles = Doubles::new();
    let registry = MetricsRegistry::new();
    registry
        .create_gauge(GaugeOptions::new("nodejs_eventloop_lag_seconds", "taken"))
        .unwrap();

    let mut collector = Collector::new(doubles.full_platform());
    let result = collector.activate(options(&registry));

    assert!(matches!(
        result,
        Err(CollectorError::Registry(MetricsError::AlreadyRegistered(_)))
    ));
}

#[test]
fn test_lag_checks_queued_before_reactivation_are_discarded() {
    let doubles = Doubles::new();
    let registry = MetricsRegistry::new();
    let mut collector = Collector::new(doubles.minimal_platform());
    collector.activate(options(&registry)).unwrap();
    collector.activate(options(&registry)).unwrap();
    assert_eq!(doubles.scheduler.pending(), 2);

    doubles.clock.advance(Duration::from_millis(4));
    let lag = |r: &MetricsRegistry| {
        r.get_single_metric("nodejs_eventloop_lag_seconds")
            .and_then(|m| m.value.as_gauge())
            .unwrap()
    };

    assert!(doubles.scheduler.run_next());
    assert_eq!(lag(&registry), 0.0);
    assert!(doubles.scheduler.run_next());
    assert_eq!(lag(&registry), 0.004);
}

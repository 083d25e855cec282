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

//! Duration of deferred callbacks, measured through lifecycle hooks.
//!
//! A tracer follows one [`ResourceKind`]. Each resource of that kind moves
//! through `Started -> PreExecuted -> PostExecuted` and is evicted on destroy,
//! at which point the time between the pre- and post-execution marks is
//! observed into a sliding-window summary, stamped with the wall time of the
//! pre-execution mark. Events that do not follow that order are ignored.
//!
//! A resource that never reaches destroy stays in the pending map for the life
//! of the tracer. Nothing bounds or flushes that map.

use super::{ProducerContext, ProducerSpec, Stamp};
use crate::config::CollectorOptions;
use crate::metrics::{SummaryHandle, SummaryOptions};
use pulse_core::platform::{AsyncHook, AsyncId, Clock, HookId, LifecycleHooks, Mark, ResourceKind};
use pulse_core::telemetry::{MetricProducer, MetricsResult};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const NODEJS_TICK_DURATION_SUMMARY: &str = "nodejs_tick_duration_summary";
const NODEJS_IMMEDIATE_DURATION_SUMMARY: &str = "nodejs_immediate_duration_summary";

const PERCENTILES: [f64; 4] = [0.5, 0.75, 0.9, 0.99];
const MAX_AGE: Duration = Duration::from_secs(600);
const AGE_BUCKETS: usize = 5;

/// Tick callback durations; opt in with `monitor_next_tick`.
pub const TICK: ProducerSpec = ProducerSpec {
    name: "tick",
    metric_names: &[NODEJS_TICK_DURATION_SUMMARY],
    build: build_tick,
};

/// Immediate callback durations; opt in with `monitor_immediate`.
pub const IMMEDIATE: ProducerSpec = ProducerSpec {
    name: "immediate",
    metric_names: &[NODEJS_IMMEDIATE_DURATION_SUMMARY],
    build: build_immediate,
};

fn build_tick(ctx: &ProducerContext<'_>) -> MetricsResult<Arc<dyn MetricProducer>> {
    Ok(Arc::new(CallbackDurationTracer::new(ctx, &TICK_TRACE)?))
}

fn build_immediate(ctx: &ProducerContext<'_>) -> MetricsResult<Arc<dyn MetricProducer>> {
    Ok(Arc::new(CallbackDurationTracer::new(ctx, &IMMEDIATE_TRACE)?))
}

/// What a tracer follows and where it reports.
#[derive(Debug)]
pub struct TraceTarget {
    /// Roster entry of the tracer.
    pub spec: &'static ProducerSpec,
    /// The resource kind whose callbacks are timed.
    pub kind: ResourceKind,
    /// Unprefixed summary name.
    pub series: &'static str,
    /// Summary help text.
    pub help: &'static str,
    /// Reads the opt-in flag.
    pub opted_in: fn(&CollectorOptions) -> bool,
}

/// Target of the tick tracer.
pub static TICK_TRACE: TraceTarget = TraceTarget {
    spec: &TICK,
    kind: ResourceKind::Tick,
    series: NODEJS_TICK_DURATION_SUMMARY,
    help: "Summary of callbacks executed by process.nextTick()",
    opted_in: |options| options.monitor_next_tick,
};

/// Target of the immediate tracer.
pub static IMMEDIATE_TRACE: TraceTarget = TraceTarget {
    spec: &IMMEDIATE,
    kind: ResourceKind::Immediate,
    series: NODEJS_IMMEDIATE_DURATION_SUMMARY,
    help: "Summary of callbacks executed by setImmediate()",
    opted_in: |options| options.monitor_immediate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Started,
    PreExecuted {
        before: Mark,
        started_at: Option<i64>,
    },
    PostExecuted {
        before: Mark,
        after: Mark,
        started_at: Option<i64>,
    },
}

#[derive(Debug)]
struct PendingCallback {
    name: String,
    phase: Phase,
}

/// The lifecycle hook that does the bookkeeping.
#[derive(Debug)]
struct DurationHook {
    kind: ResourceKind,
    clock: Arc<dyn Clock>,
    summary: SummaryHandle,
    stamp: Stamp,
    pending: Mutex<HashMap<AsyncId, PendingCallback>>,
}

impl DurationHook {
    fn pending(&self) -> MutexGuard<'_, HashMap<AsyncId, PendingCallback>> {
        match self.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn display_name(kind: ResourceKind, id: AsyncId, callback_name: Option<&str>) -> String {
    match callback_name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{}-{}", kind.label(), id),
    }
}

impl AsyncHook for DurationHook {
    fn init(&self, id: AsyncId, kind: ResourceKind, callback_name: Option<&str>) {
        if kind != self.kind {
            return;
        }
        let name = display_name(kind, id, callback_name);
        self.pending().insert(
            id,
            PendingCallback {
                name,
                phase: Phase::Started,
            },
        );
    }

    fn before(&self, id: AsyncId) {
        let mut pending = self.pending();
        if let Some(callback) = pending.get_mut(&id) {
            match callback.phase {
                Phase::Started => {
                    callback.phase = Phase::PreExecuted {
                        before: self.clock.now(),
                        started_at: self.stamp.now(),
                    }
                }
                phase => log::debug!("Ignoring before({}) for {} in {:?}", id, callback.name, phase),
            }
        }
    }

    fn after(&self, id: AsyncId) {
        let mut pending = self.pending();
        if let Some(callback) = pending.get_mut(&id) {
            match callback.phase {
                Phase::PreExecuted { before, started_at } => {
                    callback.phase = Phase::PostExecuted {
                        before,
                        after: self.clock.now(),
                        started_at,
                    }
                }
                phase => log::debug!("Ignoring after({}) for {} in {:?}", id, callback.name, phase),
            }
        }
    }

    fn destroy(&self, id: AsyncId) {
        let Some(callback) = self.pending().remove(&id) else {
            return;
        };
        match callback.phase {
            Phase::PostExecuted {
                before,
                after,
                started_at,
            } => {
                let seconds = after.saturating_duration_since(before).as_secs_f64();
                log::trace!("{} ran for {:.6} s", callback.name, seconds);
                if let Err(e) = self.summary.observe_with(&[], seconds, started_at) {
                    log::warn!("Failed to observe {}: {}", self.summary.id(), e);
                }
            }
            phase => log::debug!(
                "{} destroyed in {:?} without completing, nothing observed",
                callback.name,
                phase
            ),
        }
    }
}

#[derive(Debug)]
enum TracerState {
    /// Not opted in: nothing registered.
    Disabled,
    /// Opted in without a hook subsystem: the summary exists but is never observed.
    Untraced,
    /// Hook installed.
    Tracing {
        hooks: Arc<dyn LifecycleHooks>,
        hook_id: HookId,
        hook: Arc<DurationHook>,
    },
}

/// Times the callbacks of one deferred-work kind.
#[derive(Debug)]
pub struct CallbackDurationTracer {
    target: &'static TraceTarget,
    summary: Option<SummaryHandle>,
    state: TracerState,
}

impl CallbackDurationTracer {
    /// Registers the summary if opted in, and installs the hook if the
    /// platform has a lifecycle-hook subsystem.
    pub fn new(ctx: &ProducerContext<'_>, target: &'static TraceTarget) -> MetricsResult<Self> {
        if !(target.opted_in)(ctx.options) {
            return Ok(Self {
                target,
                summary: None,
                state: TracerState::Disabled,
            });
        }

        let summary = ctx.create_summary(
            SummaryOptions::new(ctx.series_name(target.series), target.help)
                .percentiles(PERCENTILES.to_vec())
                .window_of(MAX_AGE, AGE_BUCKETS),
        )?;

        let state = match ctx.platform.lifecycle_hooks() {
            Some(hooks) => {
                let hook = Arc::new(DurationHook {
                    kind: target.kind,
                    clock: Arc::clone(ctx.platform.clock()),
                    summary: summary.clone(),
                    stamp: ctx.stamp(),
                    pending: Mutex::new(HashMap::new()),
                });
                let hook_id = hooks.enable(hook.clone());
                TracerState::Tracing {
                    hooks: Arc::clone(hooks),
                    hook_id,
                    hook,
                }
            }
            None => {
                log::debug!(
                    "No lifecycle hooks available, {} callbacks will not be timed",
                    target.kind
                );
                TracerState::Untraced
            }
        };

        Ok(Self {
            target,
            summary: Some(summary),
            state,
        })
    }

    /// Whether lifecycle events are being followed.
    pub fn is_tracing(&self) -> bool {
        matches!(self.state, TracerState::Tracing { .. })
    }

    /// The summary, if the tracer was opted in.
    pub fn summary(&self) -> Option<&SummaryHandle> {
        self.summary.as_ref()
    }

    /// Callbacks created but not yet destroyed.
    pub fn pending_callbacks(&self) -> usize {
        match &self.state {
            TracerState::Tracing { hook, .. } => hook.pending().len(),
            _ => 0,
        }
    }
}

impl MetricProducer for CallbackDurationTracer {
    fn producer_id(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.target.spec.name)
    }

    fn metric_names(&self) -> &'static [&'static str] {
        self.target.spec.metric_names
    }

    // Observations are made by the hook as callbacks finish.
    fn refresh(&self) {}

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Drop for CallbackDurationTracer {
    fn drop(&mut self) {
        if let TracerState::Tracing { hooks, hook_id, .. } = &self.state {
            hooks.disable(*hook_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRegistry;
    use crate::test_support::Doubles;
    use pulse_core::platform::DeferredScheduler;

    fn immediate_options() -> CollectorOptions {
        CollectorOptions::default().with_monitor_immediate(true)
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(ResourceKind::Immediate, 7, Some("flush")), "flush");
        assert_eq!(display_name(ResourceKind::Immediate, 7, None), "Immediate-7");
        assert_eq!(display_name(ResourceKind::Tick, 3, Some("")), "TickObject-3");
    }

    #[test]
    fn test_completed_callback_is_observed_once() {
        let doubles = Doubles::new();
        let platform = doubles.full_platform();
        let registry = MetricsRegistry::new();
        let options = immediate_options();
        let ctx = ProducerContext::new(&registry, &options, &platform);

        let tracer = CallbackDurationTracer::new(&ctx, &IMMEDIATE_TRACE).unwrap();
        assert!(tracer.is_tracing());

        let clock = doubles.clock.clone();
        doubles.scheduler.defer_named(
            ResourceKind::Immediate,
            Some(Cow::Borrowed("flush")),
            Box::new(move || clock.advance(Duration::from_millis(5))),
        );
        assert_eq!(tracer.pending_callbacks(), 1);
        doubles.scheduler.run_pending();
        assert_eq!(tracer.pending_callbacks(), 0);

        let summary = tracer.summary().unwrap();
        assert_eq!(summary.count().unwrap(), 1);
        assert_eq!(
            summary.quantiles().unwrap(),
            vec![(0.5, 0.005), (0.75, 0.005), (0.9, 0.005), (0.99, 0.005)]
        );
    }

    #[test]
    fn test_observation_is_stamped_when_the_callback_started() {
        let doubles = Doubles::new();
        let platform = doubles.full_platform();
        let registry = MetricsRegistry::new();
        let options = immediate_options();
        let ctx = ProducerContext::new(&registry, &options, &platform);
        let _tracer = CallbackDurationTracer::new(&ctx, &IMMEDIATE_TRACE).unwrap();

        let id = doubles.hooks.next_async_id();
        doubles.hooks.emit_init(id, ResourceKind::Immediate, None);
        doubles.clock.advance(Duration::from_millis(2));
        doubles.hooks.emit_before(id);
        doubles.clock.advance(Duration::from_millis(7));
        doubles.hooks.emit_after(id);
        doubles.clock.advance(Duration::from_millis(30));
        doubles.hooks.emit_destroy(id);

        let metric = registry
            .get_single_metric("nodejs_immediate_duration_summary")
            .unwrap();
        assert_eq!(metric.timestamp_ms, Some(1_700_000_000_002));
        assert_eq!(metric.value.as_summary().unwrap().count(), 1);
    }

    #[test]
    fn test_other_kinds_are_ignored() {
        let doubles = Doubles::new();
        let platform = doubles.full_platform();
        let registry = MetricsRegistry::new();
        let options = immediate_options();
        let ctx = ProducerContext::new(&registry, &options, &platform);

        let tracer = CallbackDurationTracer::new(&ctx, &IMMEDIATE_TRACE).unwrap();
        doubles
            .scheduler
            .defer(ResourceKind::Tick, Box::new(|| {}));
        doubles.scheduler.run_pending();

        assert_eq!(tracer.summary().unwrap().count().unwrap(), 0);
    }

    #[test]
    fn test_incomplete_lifecycles_are_dropped_silently() {
        let doubles = Doubles::new();
        let platform = doubles.full_platform();
        let registry = MetricsRegistry::new();
        let options = immediate_options();
        let ctx = ProducerContext::new(&registry, &options, &platform);
        let tracer = CallbackDurationTracer::new(&ctx, &IMMEDIATE_TRACE).unwrap();

        // Destroyed without ever running.
        let never_ran = doubles.hooks.next_async_id();
        doubles.hooks.emit_init(never_ran, ResourceKind::Immediate, None);
        doubles.hooks.emit_destroy(never_ran);

        // Out of order: after without before.
        let out_of_order = doubles.hooks.next_async_id();
        doubles.hooks.emit_init(out_of_order, ResourceKind::Immediate, None);
        doubles.hooks.emit_after(out_of_order);
        doubles.hooks.emit_destroy(out_of_order);

        // Started but never destroyed stays pending.
        let leaked = doubles.hooks.next_async_id();
        doubles.hooks.emit_init(leaked, ResourceKind::Immediate, None);
        doubles.hooks.emit_before(leaked);

        assert_eq!(tracer.summary().unwrap().count().unwrap(), 0);
        assert_eq!(tracer.pending_callbacks(), 1);
    }

    #[test]
    fn test_not_opted_in_registers_nothing() {
        let doubles = Doubles::new();
        let platform = doubles.full_platform();
        let registry = MetricsRegistry::new();
        let options = CollectorOptions::default();
        let ctx = ProducerContext::new(&registry, &options, &platform);

        let tracer = CallbackDurationTracer::new(&ctx, &IMMEDIATE_TRACE).unwrap();
        doubles
            .scheduler
            .defer(ResourceKind::Immediate, Box::new(|| {}));
        doubles.scheduler.run_pending();

        assert!(tracer.summary().is_none());
        assert_eq!(registry.metric_count(), 0);
        assert_eq!(doubles.hooks.hook_count(), 0);
        assert_eq!(tracer.metric_names(), &[NODEJS_IMMEDIATE_DURATION_SUMMARY]);
    }

    #[test]
    fn test_opted_in_without_hooks_keeps_series() {
        let doubles = Doubles::new();
        let platform = doubles.minimal_platform();
        let registry = MetricsRegistry::new();
        let options = CollectorOptions::default()
            .with_monitor_next_tick(true)
            .with_prefix("app_");
        let ctx = ProducerContext::new(&registry, &options, &platform);

        let tracer = CallbackDurationTracer::new(&ctx, &TICK_TRACE).unwrap();
        assert!(!tracer.is_tracing());
        tracer.refresh();

        let metric = registry
            .get_single_metric("app_nodejs_tick_duration_summary")
            .unwrap();
        assert_eq!(metric.metadata.help, "Summary of callbacks executed by process.nextTick()");
        assert_eq!(metric.value.as_summary().unwrap().count(), 0);
    }

    #[test]
    fn test_drop_disables_hook() {
        let doubles = Doubles::new();
        let platform = doubles.full_platform();
        let registry = MetricsRegistry::new();
        let options = immediate_options();
        let ctx = ProducerContext::new(&registry, &options, &platform);

        let tracer = (IMMEDIATE.build)(&ctx).unwrap();
        assert_eq!(doubles.hooks.hook_count(), 1);
        drop(tracer);
        assert_eq!(doubles.hooks.hook_count(), 0);
    }
}

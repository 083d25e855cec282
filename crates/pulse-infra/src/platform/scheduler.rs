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

//! A [`DeferredScheduler`] that runs deferred work as tokio tasks.
//!
//! Every deferred unit of work is a resource announced to the scheduler's
//! [`HookDispatcher`]: `init` when queued, `before`/`after` around the
//! callback, `destroy` when the task is released. `destroy` is emitted even
//! when the callback never runs because the runtime shut down first.

use pulse_core::platform::{
    AsyncId, DeferredScheduler, DeferredWork, HookDispatcher, ResourceKind, TickAction,
    TimerHandle,
};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Emits `destroy` when the task owning it is dropped.
struct DeferredResource {
    id: AsyncId,
    hooks: Arc<HookDispatcher>,
}

impl Drop for DeferredResource {
    fn drop(&mut self) {
        self.hooks.emit_destroy(self.id);
    }
}

/// Schedules deferred work and periodic timers on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
    hooks: Arc<HookDispatcher>,
}

impl TokioScheduler {
    /// Schedules onto `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            hooks: Arc::new(HookDispatcher::new()),
        }
    }

    /// The dispatcher announcing this scheduler's resources.
    pub fn hooks(&self) -> Arc<HookDispatcher> {
        Arc::clone(&self.hooks)
    }

    /// The runtime tasks are spawned on.
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }
}

impl DeferredScheduler for TokioScheduler {
    fn defer_named(
        &self,
        kind: ResourceKind,
        callback_name: Option<Cow<'static, str>>,
        work: DeferredWork,
    ) {
        let id = self.hooks.next_async_id();
        self.hooks.emit_init(id, kind, callback_name.as_deref());
        let resource = DeferredResource {
            id,
            hooks: Arc::clone(&self.hooks),
        };
        self.runtime.spawn(async move {
            resource.hooks.emit_before(resource.id);
            work();
            resource.hooks.emit_after(resource.id);
        });
    }

    fn every(&self, period: Duration, action: TickAction) -> Box<dyn TimerHandle> {
        let period = period.max(MIN_PERIOD);
        let active = Arc::new(AtomicBool::new(true));
        let running = Arc::clone(&active);
        let task = self.runtime.spawn(async move {
            let mut ticks = time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if !running.load(Ordering::Acquire) {
                    break;
                }
                log::trace!("Refresh timer fired");
                action();
            }
        });
        Box::new(TokioTimer {
            task: task.abort_handle(),
            active,
        })
    }
}

/// A periodic task; aborted on cancel or drop.
#[derive(Debug)]
struct TokioTimer {
    task: AbortHandle,
    active: Arc<AtomicBool>,
}

impl TimerHandle for TokioTimer {
    fn cancel(&self) {
        self.active.store(false, Ordering::Release);
        self.task.abort();
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && !self.task.is_finished()
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::platform::{AsyncHook, LifecycleHooks};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl AsyncHook for Recorder {
        fn init(&self, id: AsyncId, kind: ResourceKind, callback_name: Option<&str>) {
            self.events
                .lock()
                .unwrap()
                .push(format!("init {id} {kind} {}", callback_name.unwrap_or("-")));
        }
        fn before(&self, id: AsyncId) {
            self.events.lock().unwrap().push(format!("before {id}"));
        }
        fn after(&self, id: AsyncId) {
            self.events.lock().unwrap().push(format!("after {id}"));
        }
        fn destroy(&self, id: AsyncId) {
            self.events.lock().unwrap().push(format!("destroy {id}"));
        }
    }

    #[tokio::test]
    async fn test_deferred_work_emits_full_lifecycle() {
        let scheduler = TokioScheduler::new(Handle::current());
        let recorder = Arc::new(Recorder::default());
        scheduler.hooks().enable(recorder.clone());

        let (done, ran) = tokio::sync::oneshot::channel();
        scheduler.defer_named(
            ResourceKind::Immediate,
            Some(Cow::Borrowed("flush")),
            Box::new(move || {
                let _ = done.send(());
            }),
        );
        ran.await.unwrap();
        tokio::task::yield_now().await;

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["init 1 Immediate flush", "before 1", "after 1", "destroy 1"]
        );
    }

    #[test]
    fn test_unrun_work_is_destroyed_on_shutdown() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let scheduler = TokioScheduler::new(runtime.handle().clone());
        let recorder = Arc::new(Recorder::default());
        scheduler.hooks().enable(recorder.clone());

        scheduler.defer(ResourceKind::Tick, Box::new(|| {}));
        drop(runtime);

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events, vec!["init 1 TickObject -", "destroy 1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once_per_period_after_the_first_period() {
        let scheduler = TokioScheduler::new(Handle::current());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let timer = scheduler.every(
            Duration::from_millis(100),
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(300)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert!(timer.is_active());

        timer.cancel();
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 3);
        assert!(!timer.is_active());
    }
}

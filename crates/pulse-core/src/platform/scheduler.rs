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

//! The host's cooperative scheduler, as seen by the collector.

use super::hooks::ResourceKind;
use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// A unit of work queued for a later scheduler pass.
pub type DeferredWork = Box<dyn FnOnce() + Send + 'static>;

/// The action a repeating timer runs on every tick.
pub type TickAction = Arc<dyn Fn() + Send + Sync + 'static>;

/// A live repeating timer.
pub trait TimerHandle: Send + Sync + Debug + 'static {
    /// Stops the timer. An in-flight tick is not interrupted.
    fn cancel(&self);

    /// Whether the timer will fire again.
    fn is_active(&self) -> bool;
}

/// Queues deferred work and arms repeating timers.
pub trait DeferredScheduler: Send + Sync + Debug + 'static {
    /// Queues `work` to run once on a later scheduler pass.
    ///
    /// `callback_name` is reported to lifecycle hooks when present.
    fn defer_named(
        &self,
        kind: ResourceKind,
        callback_name: Option<Cow<'static, str>>,
        work: DeferredWork,
    );

    /// Queues anonymous `work` to run once on a later scheduler pass.
    fn defer(&self, kind: ResourceKind, work: DeferredWork) {
        self.defer_named(kind, None, work);
    }

    /// Runs `action` every `period`, first one full period from now.
    ///
    /// The timer is background work: it must never be the reason the host
    /// process keeps running.
    fn every(&self, period: Duration, action: TickAction) -> Box<dyn TimerHandle>;
}

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

//! Lifecycle hooks for asynchronous resources.
//!
//! A scheduler that supports hooks announces four events for every deferred
//! unit of work it owns: creation (`init`), right before the callback runs
//! (`before`), right after it returns (`after`), and when the resource is
//! released (`destroy`).

use std::fmt::{self, Debug, Display};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Runtime-assigned identifier of an asynchronous resource.
///
/// Unique for the lifetime of the resource.
pub type AsyncId = u64;

/// The class of deferred-callback primitive a resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Fire once on the next scheduler pass.
    Immediate,
    /// Fire once before the scheduler moves on to other work.
    Tick,
    /// Fire once after a delay.
    Timeout,
}

impl ResourceKind {
    /// The label used when no callback name can be introspected.
    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Immediate => "Immediate",
            ResourceKind::Tick => "TickObject",
            ResourceKind::Timeout => "Timeout",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An observer of asynchronous resource lifecycles.
pub trait AsyncHook: Send + Sync + 'static {
    /// A resource of `kind` was created. `callback_name` is the name of the
    /// scheduled callback when the scheduler could determine it.
    fn init(&self, id: AsyncId, kind: ResourceKind, callback_name: Option<&str>);

    /// The resource's callback is about to run.
    fn before(&self, id: AsyncId);

    /// The resource's callback returned.
    fn after(&self, id: AsyncId);

    /// The resource was released.
    fn destroy(&self, id: AsyncId);
}

/// Handle of an enabled hook, used to disable it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// The lifecycle-hook subsystem of a host.
pub trait LifecycleHooks: Send + Sync + Debug + 'static {
    /// Starts delivering lifecycle events to `hook`.
    fn enable(&self, hook: Arc<dyn AsyncHook>) -> HookId;

    /// Stops delivering events to the hook. Returns `false` if it was not enabled.
    fn disable(&self, id: HookId) -> bool;
}

/// Fan-out of lifecycle events to every enabled hook.
///
/// Schedulers own one of these, allocate resource ids from it and emit
/// events through it; observers enable themselves through [`LifecycleHooks`].
#[derive(Default)]
pub struct HookDispatcher {
    next_hook: AtomicU64,
    next_async_id: AtomicU64,
    hooks: RwLock<Vec<(HookId, Arc<dyn AsyncHook>)>>,
}

impl HookDispatcher {
    /// Creates a dispatcher with no hooks enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh resource identifier.
    pub fn next_async_id(&self) -> AsyncId {
        self.next_async_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Number of currently enabled hooks.
    pub fn hook_count(&self) -> usize {
        self.hooks.read().map(|hooks| hooks.len()).unwrap_or(0)
    }

    /// Announces the creation of a resource.
    pub fn emit_init(&self, id: AsyncId, kind: ResourceKind, callback_name: Option<&str>) {
        for hook in self.current() {
            hook.init(id, kind, callback_name);
        }
    }

    /// Announces that a resource's callback is about to run.
    pub fn emit_before(&self, id: AsyncId) {
        for hook in self.current() {
            hook.before(id);
        }
    }

    /// Announces that a resource's callback returned.
    pub fn emit_after(&self, id: AsyncId) {
        for hook in self.current() {
            hook.after(id);
        }
    }

    /// Announces that a resource was released.
    pub fn emit_destroy(&self, id: AsyncId) {
        for hook in self.current() {
            hook.destroy(id);
        }
    }

    // Hooks are called outside the lock so they may enable or disable hooks.
    fn current(&self) -> Vec<Arc<dyn AsyncHook>> {
        match self.hooks.read() {
            Ok(hooks) => hooks.iter().map(|(_, hook)| Arc::clone(hook)).collect(),
            Err(poisoned) => poisoned
                .into_inner()
                .iter()
                .map(|(_, hook)| Arc::clone(hook))
                .collect(),
        }
    }
}

impl Debug for HookDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDispatcher")
            .field("hooks", &self.hook_count())
            .finish()
    }
}

impl LifecycleHooks for HookDispatcher {
    fn enable(&self, hook: Arc<dyn AsyncHook>) -> HookId {
        let id = HookId(self.next_hook.fetch_add(1, Ordering::Relaxed));
        let mut hooks = match self.hooks.write() {
            Ok(hooks) => hooks,
            Err(poisoned) => poisoned.into_inner(),
        };
        hooks.push((id, hook));
        log::debug!("Enabled lifecycle hook {:?} ({} active)", id, hooks.len());
        id
    }

    fn disable(&self, id: HookId) -> bool {
        let mut hooks = match self.hooks.write() {
            Ok(hooks) => hooks,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = hooks.len();
        hooks.retain(|(hook_id, _)| *hook_id != id);
        before != hooks.len()
    }
}

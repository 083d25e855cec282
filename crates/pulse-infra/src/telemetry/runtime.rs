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

//! Worker and task counts of a tokio runtime.

use pulse_core::platform::{RuntimeSnapshot, RuntimeStatsSource};
use tokio::runtime::Handle;

/// Reads the stable subset of tokio's runtime metrics.
#[derive(Debug, Clone)]
pub struct TokioRuntimeStats {
    runtime: Handle,
}

impl TokioRuntimeStats {
    /// Reports on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }
}

impl RuntimeStatsSource for TokioRuntimeStats {
    fn snapshot(&self) -> RuntimeSnapshot {
        let metrics = self.runtime.metrics();
        RuntimeSnapshot {
            workers: metrics.num_workers() as u64,
            alive_tasks: metrics.num_alive_tasks() as u64,
            global_queue_depth: metrics.global_queue_depth() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_current_thread_runtime_has_one_worker() {
        let stats = TokioRuntimeStats::new(Handle::current());
        let (release, wait) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _ = wait.await;
        });
        tokio::task::yield_now().await;

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.workers, 1);
        assert!(snapshot.alive_tasks >= 1);

        release.send(()).unwrap();
        task.await.unwrap();
    }
}

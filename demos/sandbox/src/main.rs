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

//! Collects the default metrics for a few seconds while generating some
//! scheduler load through deferred immediates, then prints the registry as
//! JSON.
//!
//! Usage: `sandbox [options.toml]`

use anyhow::{Context, Result};
use pulse_sdk::{collect_default_metrics, defer_immediate, next_tick, CollectorOptions};
use std::time::Duration;

const RUN_FOR: Duration = Duration::from_secs(3);

fn load_options() -> Result<CollectorOptions> {
    match std::env::args().nth(1) {
        Some(path) => CollectorOptions::from_path(&path)
            .with_context(|| format!("failed to load collector options from {path}")),
        None => Ok(CollectorOptions::default()
            .with_refresh_timeout_ms(1000)
            .with_monitor_immediate(true)
            .with_monitor_next_tick(true)),
    }
}

fn spin_for(spin: Duration) {
    let start = std::time::Instant::now();
    while start.elapsed() < spin {
        std::hint::spin_loop();
    }
}

/// Busy callbacks that hold a worker so the lag gauges and duration summaries move.
async fn generate_load() -> Result<()> {
    for round in 0..20u64 {
        let spin = Duration::from_micros(200 * (round % 5 + 1));
        defer_immediate(move || spin_for(spin))?;
        next_tick(move || spin_for(spin / 4))?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Ok(())
}

async fn run(options: CollectorOptions) -> Result<()> {
    let registry = options.registry();
    let handle = collect_default_metrics(options)?;
    log::info!("Collecting every {:?} for {:?}", handle.period(), RUN_FOR);

    let (load, ()) = tokio::join!(generate_load(), tokio::time::sleep(RUN_FOR));
    load?;

    println!("{}", serde_json::to_string_pretty(&registry.snapshot())?);
    Ok(())
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let options = load_options()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the tokio runtime")?;
    runtime.block_on(run(options))
}

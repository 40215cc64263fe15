// Copyright 2026 Pulse Scheduler Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! The background scheduling cycle: a loop that ticks once per second,
//! advancing running jobs and admitting pending ones. Errors are logged and
//! the loop pauses and continues rather than terminating.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::SchedulerConfig;
use crate::scheduler::Scheduler;

/// Spawn the scheduling cycle as a background task. The returned handle is
/// not normally awaited — the process runs it for its lifetime, mirroring
/// the original service's lifespan-managed background task.
pub fn spawn(scheduler: Arc<Scheduler>, config: SchedulerConfig) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn(run_forever(scheduler, config))
}

async fn run_forever(scheduler: Arc<Scheduler>, config: SchedulerConfig) {
    tracing::info!("scheduling cycle starting");
    scheduler.mark_ready();
    loop {
        let start = Instant::now();

        let cycle_result =
            std::panic::catch_unwind(AssertUnwindSafe(|| scheduler.run_cycle()));

        match cycle_result {
            Ok(admitted) => {
                let elapsed = start.elapsed();
                scheduler
                    .metrics()
                    .scheduler_cycle_seconds
                    .observe(elapsed.as_secs_f64());
                if admitted > 0 {
                    tracing::debug!(admitted, "scheduling cycle admitted jobs");
                }

                let target = Duration::from_secs_f64(config.cycle_target_secs.max(0.0));
                let min_sleep = Duration::from_secs_f64(config.cycle_min_sleep_secs.max(0.0));
                let sleep_for = target.saturating_sub(elapsed).max(min_sleep);
                tokio::time::sleep(sleep_for).await;
            }
            Err(panic) => {
                let message = panic_message(&panic);
                tracing::error!(error = %message, "scheduling cycle failed, retrying after pause");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

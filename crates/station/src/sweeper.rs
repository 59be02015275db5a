// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! Liveness sweeper: periodically evicts devices whose last-seen timestamp
//! has aged past the threshold (§4.2, §5). Grounded in the teacher's
//! upstream health-check loop (snapshot-then-iterate, no I/O under lock).

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::device::Device;
use crate::dispatcher::Dispatcher;
use crate::issue::Fingerprint;
use crate::state::Coordinator;

pub fn spawn(coordinator: Arc<Coordinator>, dispatcher: Arc<Dispatcher>, threshold: Duration, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = coordinator.shutdown.cancelled() => {
                    info!("liveness sweeper shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let evicted = coordinator.registry.evict_stale(threshold).await;
                    for device in &evicted {
                        info!(device_id = %device.id, "evicted stale device");
                    }
                    if requeue_abandoned(&coordinator, evicted).await {
                        dispatcher.on_queue_drain().await;
                    }
                }
            }
        }
    });
}

/// For each device that held an assignment when it left the registry
/// (evicted for staleness, or dropped with its inbound stream), abandon its
/// Task and re-queue the underlying issue for one replacement agent. This
/// resolves the open question of what happens to a Task whose agent
/// disappears mid-flight: the issue is not considered complete, so it goes
/// back on the queue rather than being silently forgotten.
///
/// Returns `true` if at least one issue was re-queued and a drain should run.
pub async fn requeue_abandoned(coordinator: &Arc<Coordinator>, devices: Vec<Device>) -> bool {
    let mut needs_drain = false;
    for device in devices {
        let Some(task_id) = device.assignment else { continue };
        let task = coordinator.active_tasks.write().await.remove(&task_id);
        let Some(task) = task else { continue };
        let fingerprint = Fingerprint::new(task.issue_kind.clone(), task.coordinate);
        if let Some(issue) = coordinator.issues.get(&fingerprint).await {
            info!(task_id, agent_id = %task.agent_id, "re-queueing issue abandoned by departed agent");
            coordinator.queue.enqueue(issue, 1).await;
            needs_drain = true;
        }
    }
    needs_drain
}

#[cfg(test)]
#[path = "sweeper_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! Binds admitted issues to available agents via the policy engine, emits
//! `MOVEMENT_COMMAND` frames, and records active assignments (§4.6).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::device::{Device, DeviceKind};
use crate::error::StationError;
use crate::frame::movement_command;
use crate::issue::Issue;
use crate::policy::{Bucket, Candidate, State};
use crate::state::Coordinator;
use crate::task::Task;

/// Abstraction over "deliver this payload to this device", so the
/// dispatcher's selection/bookkeeping logic can be tested without opening a
/// socket. The real implementation dials the device's outbound TCP port
/// (`crate::transport::tcp_out`).
pub trait CommandSink: Send + Sync {
    fn send<'a>(
        &'a self,
        device: &'a Device,
        payload: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), StationError>> + Send + 'a>>;
}

pub struct Dispatcher {
    coordinator: Arc<Coordinator>,
    sink: Arc<dyn CommandSink>,
}

/// Outcome of attempting to staff an issue against currently available
/// agents.
struct DispatchOutcome {
    dispatched: usize,
    required: usize,
}

impl Dispatcher {
    pub fn new(coordinator: Arc<Coordinator>, sink: Arc<dyn CommandSink>) -> Self {
        Self { coordinator, sink }
    }

    /// §4.6 entry point `on_issue`.
    pub async fn on_issue(&self, issue: Issue) {
        let required = issue.required_count;
        let fingerprint = issue.fingerprint();
        if !self.coordinator.issues.admit(issue.clone()).await {
            debug!(?fingerprint, "duplicate issue, ignored");
            return;
        }
        let outcome = self.attempt_dispatch(&issue).await;
        if outcome.dispatched == 0 {
            info!(?fingerprint, required, "issue queued, no agents available");
            self.coordinator.queue.enqueue(issue, required).await;
        } else {
            info!(?fingerprint, dispatched = outcome.dispatched, required, "issue dispatched");
        }
    }

    /// §4.6 entry point `on_queue_drain`. Single-flight via the queue's
    /// non-blocking gate (§4.4, §5).
    pub async fn on_queue_drain(&self) {
        let Some(_guard) = self.coordinator.queue.try_begin_drain() else {
            debug!("drain already in progress, skipping");
            return;
        };
        loop {
            let Some(entry) = self.coordinator.queue.peek_front().await else {
                break;
            };
            let outcome = self.attempt_dispatch(&entry.issue).await;
            if outcome.dispatched == outcome.required {
                self.coordinator.queue.pop_front_matching(&entry.issue.fingerprint()).await;
                continue;
            }
            break;
        }
    }

    /// Select up to `issue.required_count` agents, assign and dispatch each.
    /// Returns how many of the required slots were actually staffed.
    async fn attempt_dispatch(&self, issue: &Issue) -> DispatchOutcome {
        let required = issue.required_count;
        let available = self.coordinator.registry.all_available(DeviceKind::Agent).await;
        if available.len() < required {
            return DispatchOutcome { dispatched: 0, required };
        }
        let candidates: Vec<Candidate> = available
            .into_iter()
            .map(|device| {
                let distance = device.position.distance_2d(&issue.coordinate);
                let state = State { kind: issue.kind.clone(), bucket: Bucket::from_distance(distance) };
                Candidate { device, state }
            })
            .collect();

        let selected = self.coordinator.policy.select_agents(&candidates, required).await;
        let mut dispatched = 0usize;
        for idx in selected {
            let device = candidates[idx].device.clone();
            let task_id = self.coordinator.next_task_id();
            if !self.coordinator.registry.assign(&device.id, task_id).await {
                warn!(device_id = %device.id, "agent already assigned, skipping slot");
                continue;
            }
            let payload = movement_command(task_id, issue.kind.clone(), issue.coordinate);
            match self.sink.send(&device, payload).await {
                Ok(()) => {
                    let task = Task::new(
                        task_id,
                        device.id.clone(),
                        issue.kind.clone(),
                        issue.coordinate,
                        candidates[idx].state.bucket,
                        Instant::now(),
                    );
                    self.coordinator.active_tasks.write().await.insert(task_id, task);
                    self.coordinator
                        .command_log
                        .push(task_id, device.id.clone(), "MOVEMENT_COMMAND", true)
                        .await;
                    dispatched += 1;
                }
                Err(err) => {
                    warn!(device_id = %device.id, %err, "movement command delivery failed");
                    self.coordinator.registry.release(&device.id).await;
                    self.coordinator
                        .command_log
                        .push(task_id, device.id.clone(), "MOVEMENT_COMMAND", false)
                        .await;
                }
            }
        }
        DispatchOutcome { dispatched, required }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! Completion reconciliation (§4.7): releases the agent, attributes reward
//! to the policy engine, resolves the issue, and re-triggers queue drain.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::frame::Position;
use crate::issue::{Fingerprint, IssueKind};
use crate::state::Coordinator;

pub struct CompletionReport {
    pub sender_id: Option<String>,
    pub source_addr: String,
    pub task_id: String,
    pub issue_type: IssueKind,
    pub coordinates: Position,
    pub status: String,
}

pub struct Reconciler {
    coordinator: Arc<Coordinator>,
    dispatcher: Arc<Dispatcher>,
}

impl Reconciler {
    pub fn new(coordinator: Arc<Coordinator>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { coordinator, dispatcher }
    }

    pub async fn on_task_completed(&self, report: CompletionReport) {
        let agent_id = match &report.sender_id {
            Some(id) => Some(id.clone()),
            None => match self.coordinator.registry.find_by_address(&report.source_addr).await {
                Some(device) => Some(device.id),
                None => None,
            },
        };
        let Some(agent_id) = agent_id else {
            warn!(addr = %report.source_addr, "task completion from unknown device, dropped");
            return;
        };

        self.coordinator.registry.release(&agent_id).await;

        if let Ok(task_id) = report.task_id.parse::<u64>() {
            let task = self.coordinator.active_tasks.write().await.remove(&task_id);
            if let Some(task) = task {
                if report.status == "completed" {
                    let reward = -(task.assigned_at.elapsed().as_secs_f64());
                    self.coordinator.policy.update(task.state, &agent_id, reward).await;
                    info!(task_id, agent_id = %agent_id, reward, "task completed, policy updated");
                } else {
                    info!(task_id, agent_id = %agent_id, status = %report.status, "task ended without completion, policy unchanged");
                }
            } else {
                debug!(task_id, "completion for unknown active task");
            }
        } else {
            warn!(task_id = %report.task_id, "completion carried non-numeric task id");
        }

        let fingerprint = Fingerprint::new(report.issue_type, report.coordinates);
        self.coordinator.issues.resolve(&fingerprint).await;

        self.dispatcher.on_queue_drain().await;
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;

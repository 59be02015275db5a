// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::StationConfig;
use crate::issue_store::IssueStore;
use crate::logs::{CommandLog, NetworkLog};
use crate::policy::PolicyEngine;
use crate::queue::PendingQueue;
use crate::registry::DeviceRegistry;
use crate::task::Task;

/// All shared state the coordination core operates over, grouped into one
/// value so every worker task holds a single `Arc<Coordinator>` (§9).
pub struct Coordinator {
    pub registry: DeviceRegistry,
    pub issues: IssueStore,
    pub queue: PendingQueue,
    pub policy: PolicyEngine,
    pub active_tasks: RwLock<HashMap<u64, Task>>,
    pub command_log: CommandLog,
    pub network_log: NetworkLog,
    pub config: StationConfig,
    pub shutdown: CancellationToken,
    next_task_id: AtomicU64,
}

impl Coordinator {
    pub fn new(config: StationConfig, shutdown: CancellationToken) -> Self {
        let policy = PolicyEngine::new(
            config.epsilon,
            config.alpha,
            config.snapshot_probability,
            config.snapshot_path.clone(),
        );
        let command_log = CommandLog::new(config.command_log_capacity);
        let network_log = NetworkLog::new(config.network_log_capacity);
        Self {
            registry: DeviceRegistry::new(),
            issues: IssueStore::new(),
            queue: PendingQueue::new(),
            policy,
            active_tasks: RwLock::new(HashMap::new()),
            command_log,
            network_log,
            config,
            shutdown,
            next_task_id: AtomicU64::new(1),
        }
    }

    pub fn next_task_id(&self) -> u64 {
        self.next_task_id.fetch_add(1, Ordering::Relaxed)
    }
}

pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

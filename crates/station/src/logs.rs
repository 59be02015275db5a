// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! Bounded in-memory logs for operator inspection via the status surface
//! (§3 Command log / Network log). Fixed capacity, oldest entry evicted
//! first; no persistence.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::frame::epoch_seconds;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEntry {
    pub task_id: u64,
    pub device_id: String,
    pub message_type: String,
    pub at: f64,
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameEntry {
    pub direction: &'static str,
    pub peer: String,
    pub message_type: String,
    pub at: f64,
}

struct Ring<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> Ring<T> {
    fn new(capacity: usize) -> Self {
        Self { capacity, items: VecDeque::with_capacity(capacity) }
    }

    fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }
}

pub struct CommandLog {
    ring: RwLock<Ring<CommandEntry>>,
}

impl CommandLog {
    pub fn new(capacity: usize) -> Self {
        Self { ring: RwLock::new(Ring::new(capacity)) }
    }

    pub async fn push(&self, task_id: u64, device_id: impl Into<String>, message_type: impl Into<String>, ok: bool) {
        self.ring.write().await.push(CommandEntry {
            task_id,
            device_id: device_id.into(),
            message_type: message_type.into(),
            at: epoch_seconds(),
            ok,
        });
    }

    pub async fn recent(&self) -> Vec<CommandEntry> {
        self.ring.read().await.items.iter().cloned().collect()
    }
}

pub struct NetworkLog {
    ring: RwLock<Ring<FrameEntry>>,
}

impl NetworkLog {
    pub fn new(capacity: usize) -> Self {
        Self { ring: RwLock::new(Ring::new(capacity)) }
    }

    pub async fn push(&self, direction: &'static str, peer: impl Into<String>, message_type: impl Into<String>) {
        self.ring.write().await.push(FrameEntry {
            direction,
            peer: peer.into(),
            message_type: message_type.into(),
            at: epoch_seconds(),
        });
    }

    pub async fn recent(&self) -> Vec<FrameEntry> {
        self.ring.read().await.items.iter().cloned().collect()
    }

    pub async fn clear(&self) {
        self.ring.write().await.items.clear();
    }
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;

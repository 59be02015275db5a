// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! The pending-issue queue (§4.4): FIFO by admission time, single-flight
//! draining, head-of-line staffing policy enforced by the dispatcher.

use std::collections::VecDeque;

use tokio::sync::{Mutex, MutexGuard};

use crate::issue::{Fingerprint, Issue};

#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub issue: Issue,
    pub required_count: usize,
}

pub struct PendingQueue {
    entries: Mutex<VecDeque<PendingEntry>>,
    draining: Mutex<()>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self { entries: Mutex::new(VecDeque::new()), draining: Mutex::new(()) }
    }

    /// Enqueue `issue`, skipping it if an entry with the same fingerprint is
    /// already queued (§4.4).
    pub async fn enqueue(&self, issue: Issue, required_count: usize) {
        let fingerprint = issue.fingerprint();
        let mut entries = self.entries.lock().await;
        if entries.iter().any(|e| e.issue.fingerprint() == fingerprint) {
            return;
        }
        entries.push_back(PendingEntry { issue, required_count });
    }

    pub async fn peek_front(&self) -> Option<PendingEntry> {
        self.entries.lock().await.front().cloned()
    }

    /// Remove the head entry if its fingerprint matches `fingerprint` —
    /// called once the dispatcher has fully staffed it.
    pub async fn pop_front_matching(&self, fingerprint: &Fingerprint) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.front() {
            Some(entry) if &entry.issue.fingerprint() == fingerprint => {
                entries.pop_front();
                true
            }
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn snapshot(&self) -> Vec<PendingEntry> {
        self.entries.lock().await.iter().cloned().collect()
    }

    /// Non-blocking single-flight gate: `None` means a drain is already in
    /// progress and the caller should return immediately (§4.4, §5).
    pub fn try_begin_drain(&self) -> Option<MutexGuard<'_, ()>> {
        self.draining.try_lock().ok()
    }
}

impl Default for PendingQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! Issue admission and dedup (§4.3). At most one live issue may exist per
//! fingerprint; `resolve` is the only way a kind+coordinate becomes
//! re-admissible.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::issue::{Fingerprint, Issue};

#[derive(Default)]
pub struct IssueStore {
    issues: RwLock<HashMap<Fingerprint, Issue>>,
}

impl IssueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `issue` if its fingerprint is not already present. Returns
    /// `true` if admitted, `false` if it was a duplicate (silently ignored
    /// per §4.3, counted by the caller).
    pub async fn admit(&self, issue: Issue) -> bool {
        let fingerprint = issue.fingerprint();
        let mut issues = self.issues.write().await;
        if issues.contains_key(&fingerprint) {
            false
        } else {
            issues.insert(fingerprint, issue);
            true
        }
    }

    /// Remove the issue for `fingerprint`, making that kind+coordinate
    /// re-admissible. Unknown fingerprints are a no-op (§7 state errors).
    pub async fn resolve(&self, fingerprint: &Fingerprint) -> Option<Issue> {
        self.issues.write().await.remove(fingerprint)
    }

    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<Issue> {
        self.issues.read().await.get(fingerprint).cloned()
    }

    pub async fn snapshot(&self) -> Vec<Issue> {
        self.issues.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.issues.read().await.len()
    }
}

#[cfg(test)]
#[path = "issue_store_tests.rs"]
mod tests;

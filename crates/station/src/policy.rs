// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! The learned agent-selection policy: a tabular Q-value function over
//! `(issue kind, distance bucket)` states and agent identities as actions
//! (§4.5), with ε-greedy selection and a TD(0) update.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::issue::IssueKind;

const SNAPSHOT_MAGIC: [u8; 4] = *b"QTB1";
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bucket {
    Near,
    Medium,
    Far,
}

impl Bucket {
    /// Bucket boundaries from §3: near<30, medium<60, far≥60 (2D distance).
    pub fn from_distance(distance: f64) -> Self {
        if distance < 30.0 {
            Self::Near
        } else if distance < 60.0 {
            Self::Medium
        } else {
            Self::Far
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub kind: IssueKind,
    pub bucket: Bucket,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct QTable {
    values: HashMap<State, HashMap<String, f64>>,
}

impl QTable {
    fn get(&self, state: &State, agent_id: &str) -> f64 {
        self.values.get(state).and_then(|row| row.get(agent_id)).copied().unwrap_or(0.0)
    }

    fn update(&mut self, state: State, agent_id: &str, reward: f64, alpha: f64) {
        let row = self.values.entry(state).or_default();
        let current = row.get(agent_id).copied().unwrap_or(0.0);
        row.insert(agent_id.to_owned(), current + alpha * (reward - current));
    }
}

/// One candidate for selection: an available agent plus the state its
/// distance to the issue resolves to.
pub struct Candidate {
    pub device: Device,
    pub state: State,
}

pub struct PolicyEngine {
    table: RwLock<QTable>,
    epsilon: f64,
    alpha: f64,
    snapshot_probability: f64,
    snapshot_path: PathBuf,
}

impl PolicyEngine {
    pub fn new(epsilon: f64, alpha: f64, snapshot_probability: f64, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            table: RwLock::new(QTable::default()),
            epsilon,
            alpha,
            snapshot_probability,
            snapshot_path: snapshot_path.into(),
        }
    }

    /// Load a persisted snapshot at startup. A missing or corrupt file is
    /// logged and ignored; the table starts at zero (§4.5).
    pub async fn load(&self) {
        let path = self.snapshot_path.clone();
        match tokio::fs::read(&path).await {
            Ok(bytes) => match decode_snapshot(&bytes) {
                Ok(table) => {
                    *self.table.write().await = table;
                    info!(path = %path.display(), "loaded q-table snapshot");
                }
                Err(err) => warn!(path = %path.display(), %err, "q-table snapshot corrupt, starting fresh"),
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no q-table snapshot present, starting fresh");
            }
            Err(err) => warn!(path = %path.display(), %err, "failed to read q-table snapshot, starting fresh"),
        }
    }

    /// ε-greedy selection of up to `required_count` candidates (§4.5 step 1-3).
    pub fn select(&self, candidates: &[Candidate], required_count: usize, table: &QTable) -> Vec<usize> {
        let n = candidates.len().min(required_count);
        if n == 0 {
            return Vec::new();
        }
        let mut rng = rand::rng();
        if rng.random_bool(self.epsilon) {
            let mut indices: Vec<usize> = (0..candidates.len()).collect();
            indices.shuffle(&mut rng);
            indices.truncate(n);
            indices
        } else {
            let mut scored: Vec<(usize, f64)> = candidates
                .iter()
                .enumerate()
                .map(|(i, c)| (i, table.get(&c.state, &c.device.id)))
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            scored.into_iter().take(n).map(|(i, _)| i).collect()
        }
    }

    pub async fn select_agents(&self, candidates: &[Candidate], required_count: usize) -> Vec<usize> {
        let table = self.table.read().await;
        self.select(candidates, required_count, &table)
    }

    /// TD(0) update plus probabilistic snapshot (§4.5 Update/Persistence).
    pub async fn update(&self, state: State, agent_id: &str, reward: f64) {
        {
            let mut table = self.table.write().await;
            table.update(state, agent_id, reward, self.alpha);
        }
        if rand::rng().random_bool(self.snapshot_probability) {
            self.snapshot().await;
        }
    }

    async fn snapshot(&self) {
        let bytes = {
            let table = self.table.read().await;
            encode_snapshot(&table)
        };
        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%err, "failed to encode q-table snapshot");
                return;
            }
        };
        if let Err(err) = write_atomic(&self.snapshot_path, &bytes).await {
            warn!(path = %self.snapshot_path.display(), %err, "failed to persist q-table snapshot");
        } else {
            debug!(path = %self.snapshot_path.display(), "persisted q-table snapshot");
        }
    }
}

fn encode_snapshot(table: &QTable) -> anyhow::Result<Vec<u8>> {
    let body = bincode::serialize(table)?;
    let mut out = Vec::with_capacity(body.len() + 8);
    out.extend_from_slice(&SNAPSHOT_MAGIC);
    out.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

fn decode_snapshot(bytes: &[u8]) -> anyhow::Result<QTable> {
    if bytes.len() < 8 || bytes[0..4] != SNAPSHOT_MAGIC {
        anyhow::bail!("bad magic");
    }
    let version = u32::from_le_bytes(bytes[4..8].try_into()?);
    if version != SNAPSHOT_VERSION {
        anyhow::bail!("unsupported snapshot version {version}");
    }
    Ok(bincode::deserialize(&bytes[8..])?)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;

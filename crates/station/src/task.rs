// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

use std::time::Instant;

use crate::frame::Position;
use crate::issue::IssueKind;
use crate::policy::{Bucket, State};

/// An outstanding assignment of one agent to one issue slot. Tasks are keyed
/// by `task_id` in the active-task table; devices hold only the id, never a
/// pointer to a `Task`, so eviction and completion can never race on a
/// dangling reference (§9 "cyclic references" design note).
#[derive(Debug, Clone)]
pub struct Task {
    pub task_id: u64,
    pub agent_id: String,
    pub issue_kind: IssueKind,
    pub coordinate: Position,
    pub state: State,
    pub assigned_at: Instant,
}

impl Task {
    pub fn new(
        task_id: u64,
        agent_id: String,
        issue_kind: IssueKind,
        coordinate: Position,
        bucket: Bucket,
        assigned_at: Instant,
    ) -> Self {
        let state = State { kind: issue_kind.clone(), bucket };
        Self { task_id, agent_id, issue_kind, coordinate, state, assigned_at }
    }
}

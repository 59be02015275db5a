// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

use serde::{Deserialize, Serialize};

use crate::frame::Position;

/// Issue category, as resolved from a scanned tag. The set is extensible —
/// `Other` carries through any kind the base station doesn't recognize by
/// name, so a new sensor tag never gets silently dropped at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    Rust,
    OverheatedCircuit,
    TiltedAntenna,
    Other(String),
}

impl IssueKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "rust" => Self::Rust,
            "overheated_circuit" => Self::OverheatedCircuit,
            "tilted_antenna" => Self::TiltedAntenna,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Rust => "rust",
            Self::OverheatedCircuit => "overheated_circuit",
            Self::TiltedAntenna => "tilted_antenna",
            Self::Other(s) => s,
        }
    }

    /// Number of agents required to remediate an issue of this kind.
    pub fn required_count(&self) -> usize {
        match self {
            Self::Rust => 1,
            Self::OverheatedCircuit => 2,
            Self::TiltedAntenna => 1,
            Self::Other(_) => 1,
        }
    }
}

/// Canonical dedup key: kind plus the coordinate rounded to the nearest
/// integer unit. At most one live issue may exist per fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub kind: IssueKind,
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Fingerprint {
    pub fn new(kind: IssueKind, coordinate: Position) -> Self {
        Self {
            kind,
            x: coordinate.x.round() as i64,
            y: coordinate.y.round() as i64,
            z: coordinate.z.round() as i64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub coordinate: Position,
    pub required_count: usize,
    pub reporter: Option<String>,
    pub first_seen: f64,
    pub auxiliary: Option<serde_json::Value>,
}

impl Issue {
    pub fn new(
        kind: IssueKind,
        coordinate: Position,
        reporter: Option<String>,
        first_seen: f64,
        auxiliary: Option<serde_json::Value>,
    ) -> Self {
        let required_count = kind.required_count();
        Self { kind, coordinate, required_count, reporter, first_seen, auxiliary }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(self.kind.clone(), self.coordinate)
    }
}

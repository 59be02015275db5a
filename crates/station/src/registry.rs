// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! The device registry: authoritative mapping of device identity to live
//! state (§4.2). Backed by an `IndexMap` so `find_available` can return
//! devices in insertion order without an auxiliary ordering structure.

use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::device::{Device, DeviceKind, DeviceStatus};
use crate::frame::Position;

#[derive(Debug, Default, Clone)]
pub struct UpsertFields {
    pub kind: Option<DeviceKind>,
    pub address: Option<String>,
    pub reply_tcp_port: Option<u16>,
    pub position: Option<Position>,
    pub battery: Option<f64>,
    pub status: Option<DeviceStatus>,
}

pub struct DeviceRegistry {
    devices: RwLock<IndexMap<String, Device>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self { devices: RwLock::new(IndexMap::new()) }
    }

    /// Create or update a device, bumping its liveness timestamp.
    pub async fn upsert(&self, device_id: &str, fields: UpsertFields) {
        let mut devices = self.devices.write().await;
        match devices.get_mut(device_id) {
            Some(existing) => {
                if let Some(kind) = fields.kind {
                    existing.kind = kind;
                }
                if let Some(address) = fields.address {
                    existing.address = address;
                }
                if let Some(port) = fields.reply_tcp_port {
                    existing.reply_tcp_port = port;
                }
                if let Some(position) = fields.position {
                    existing.position = position;
                }
                if let Some(battery) = fields.battery {
                    existing.battery = battery;
                }
                if let Some(status) = fields.status {
                    existing.status = status;
                }
                existing.last_seen = Instant::now();
            }
            None => {
                devices.insert(
                    device_id.to_owned(),
                    Device {
                        id: device_id.to_owned(),
                        kind: fields.kind.unwrap_or(DeviceKind::Drone),
                        address: fields.address.unwrap_or_default(),
                        reply_tcp_port: fields.reply_tcp_port.unwrap_or(9999),
                        position: fields.position.unwrap_or(Position { x: 0.0, y: 0.0, z: 0.0 }),
                        battery: fields.battery.unwrap_or(100.0),
                        status: fields.status.unwrap_or(DeviceStatus::Ready),
                        last_seen: Instant::now(),
                        assignment: None,
                    },
                );
            }
        }
    }

    /// Fallback update path for frames lacking device identity (e.g. a
    /// `HEARTBEAT` with no `device_id`): touches the first device whose last
    /// known address matches.
    pub async fn touch_by_address(&self, addr: &str, battery: Option<f64>) -> Option<String> {
        let mut devices = self.devices.write().await;
        for (id, device) in devices.iter_mut() {
            if device.address == addr {
                device.last_seen = Instant::now();
                if let Some(battery) = battery {
                    device.battery = battery;
                }
                return Some(id.clone());
            }
        }
        None
    }

    /// Up to `n` devices of `kind` with no current assignment, in insertion
    /// order. Never returns an already-assigned device.
    pub async fn find_available(&self, kind: DeviceKind, n: usize) -> Vec<Device> {
        let devices = self.devices.read().await;
        devices
            .values()
            .filter(|d| d.kind == kind && !d.is_assigned())
            .take(n)
            .cloned()
            .collect()
    }

    /// All currently-available devices of `kind`, in insertion order.
    pub async fn all_available(&self, kind: DeviceKind) -> Vec<Device> {
        self.find_available(kind, usize::MAX).await
    }

    /// Every device of `kind`, in insertion order, regardless of assignment.
    /// Unlike `all_available`, this does not exclude busy devices — used for
    /// operator broadcasts, which reach an agent mid-task just as well.
    pub async fn all_of_kind(&self, kind: DeviceKind) -> Vec<Device> {
        self.devices.read().await.values().filter(|d| d.kind == kind).cloned().collect()
    }

    /// Assign `device_id` to `task_id`. Rejected (returns `false`) if the
    /// device is unknown or already assigned.
    pub async fn assign(&self, device_id: &str, task_id: u64) -> bool {
        let mut devices = self.devices.write().await;
        match devices.get_mut(device_id) {
            Some(device) if !device.is_assigned() => {
                device.assignment = Some(task_id);
                true
            }
            _ => false,
        }
    }

    /// Clear a device's assignment slot. Idempotent: releasing an already-free
    /// or unknown device is a no-op.
    pub async fn release(&self, device_id: &str) {
        let mut devices = self.devices.write().await;
        if let Some(device) = devices.get_mut(device_id) {
            device.assignment = None;
            device.status = DeviceStatus::Ready;
        }
    }

    /// Remove devices whose liveness is older than `threshold`. Returns the
    /// evicted devices (so the caller can clean up any assignment they held).
    pub async fn evict_stale(&self, threshold: Duration) -> Vec<Device> {
        let mut devices = self.devices.write().await;
        let stale: Vec<String> = devices
            .iter()
            .filter(|(_, d)| d.last_seen.elapsed() > threshold)
            .map(|(id, _)| id.clone())
            .collect();
        stale.iter().filter_map(|id| devices.shift_remove(id)).collect()
    }

    /// Remove all devices currently mapped to `addr` — invoked when an
    /// inbound stream from that address closes. Returns the removed devices.
    pub async fn drop_by_address(&self, addr: &str) -> Vec<Device> {
        let mut devices = self.devices.write().await;
        let matching: Vec<String> = devices
            .iter()
            .filter(|(_, d)| d.address == addr)
            .map(|(id, _)| id.clone())
            .collect();
        matching.iter().filter_map(|id| devices.shift_remove(id)).collect()
    }

    pub async fn get(&self, device_id: &str) -> Option<Device> {
        self.devices.read().await.get(device_id).cloned()
    }

    pub async fn find_by_address(&self, addr: &str) -> Option<Device> {
        self.devices.read().await.values().find(|d| d.address == addr).cloned()
    }

    pub async fn snapshot(&self) -> Vec<Device> {
        self.devices.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

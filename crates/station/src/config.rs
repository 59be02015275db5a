// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

/// Configuration for the base station coordinator.
#[derive(Debug, Clone, clap::Parser)]
pub struct StationConfig {
    /// Host to bind all listeners on.
    #[arg(long, default_value = "0.0.0.0", env = "STATION_HOST")]
    pub host: String,

    /// UDP port for discovery/heartbeat/position frames.
    #[arg(long, default_value_t = 8888, env = "STATION_UDP_PORT")]
    pub udp_port: u16,

    /// TCP port for inbound device streams (QR scans, completions, forward replies).
    #[arg(long, default_value_t = 9998, env = "STATION_TCP_IN_PORT")]
    pub tcp_in_port: u16,

    /// TCP port devices listen on for outbound commands from the base station.
    #[arg(long, default_value_t = 9999, env = "STATION_TCP_OUT_PORT")]
    pub tcp_out_port: u16,

    /// Host/port the read-only HTTP status surface binds to.
    #[arg(long, default_value = "127.0.0.1", env = "STATION_HTTP_HOST")]
    pub http_host: String,

    #[arg(long, default_value_t = 8899, env = "STATION_HTTP_PORT")]
    pub http_port: u16,

    /// Liveness threshold: a device idle longer than this is evicted.
    #[arg(long, default_value_t = 60_000, env = "STATION_LIVENESS_TIMEOUT_MS")]
    pub liveness_timeout_ms: u64,

    /// How often the liveness sweeper scans the registry.
    #[arg(long, default_value_t = 10_000, env = "STATION_SWEEP_INTERVAL_MS")]
    pub sweep_interval_ms: u64,

    /// Outbound connect timeout for command dialing.
    #[arg(long, default_value_t = 2_000, env = "STATION_CONNECT_TIMEOUT_MS")]
    pub connect_timeout_ms: u64,

    /// Idle read timeout for inbound device streams.
    #[arg(long, default_value_t = 120_000, env = "STATION_IDLE_TIMEOUT_MS")]
    pub idle_timeout_ms: u64,

    /// Exploration rate for the policy engine's agent selector.
    #[arg(long, default_value_t = 0.15, env = "STATION_EPSILON")]
    pub epsilon: f64,

    /// Learning rate for the Q-table update.
    #[arg(long, default_value_t = 0.1, env = "STATION_ALPHA")]
    pub alpha: f64,

    /// Probability of snapshotting the Q-table to disk after an update.
    #[arg(long, default_value_t = 0.1, env = "STATION_SNAPSHOT_PROBABILITY")]
    pub snapshot_probability: f64,

    /// Path to the Q-table snapshot file.
    #[arg(long, default_value = "station_qtable.bin", env = "STATION_SNAPSHOT_PATH")]
    pub snapshot_path: std::path::PathBuf,

    /// Capacity of the bounded outbound-command ring.
    #[arg(long, default_value_t = 200, env = "STATION_COMMAND_LOG_CAPACITY")]
    pub command_log_capacity: usize,

    /// Capacity of the bounded in/out frame ring.
    #[arg(long, default_value_t = 500, env = "STATION_NETWORK_LOG_CAPACITY")]
    pub network_log_capacity: usize,
}

impl StationConfig {
    pub fn liveness_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.liveness_timeout_ms)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn idle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn udp_addr(&self) -> String {
        format!("{}:{}", self.host, self.udp_port)
    }

    pub fn tcp_in_addr(&self) -> String {
        format!("{}:{}", self.host, self.tcp_in_port)
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    #[cfg(test)]
    pub fn for_test() -> Self {
        Self {
            host: "127.0.0.1".into(),
            udp_port: 0,
            tcp_in_port: 0,
            tcp_out_port: 0,
            http_host: "127.0.0.1".into(),
            http_port: 0,
            liveness_timeout_ms: 60_000,
            sweep_interval_ms: 10_000,
            connect_timeout_ms: 2_000,
            idle_timeout_ms: 120_000,
            epsilon: 0.0,
            alpha: 0.1,
            snapshot_probability: 0.0,
            snapshot_path: "unused.bin".into(),
            command_log_capacity: 200,
            network_log_capacity: 500,
        }
    }
}

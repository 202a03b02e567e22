//! Runtime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the host runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Dispatcher configuration.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Executor configuration.
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Capacity of the internal trigger channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Base delay before retrying a failed reconcile, in milliseconds.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    /// Upper bound on the retry delay, in milliseconds.
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_retry_base_ms() -> u64 {
    500
}

fn default_retry_max_ms() -> u64 {
    30_000
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            retry_base_ms: default_retry_base_ms(),
            retry_max_ms: default_retry_max_ms(),
        }
    }
}

impl DispatcherConfig {
    /// Retry delay after `failures` consecutive errors on one key.
    ///
    /// Doubles per failure, capped at `retry_max_ms`.
    pub fn backoff(&self, failures: u32) -> Duration {
        let shift = failures.saturating_sub(1).min(16);
        let ms = self
            .retry_base_ms
            .saturating_mul(1u64 << shift)
            .min(self.retry_max_ms);
        Duration::from_millis(ms)
    }
}

/// Executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Namespace scanned at startup for workloads created while the
    /// executor was down. Watch events cover all namespaces.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Additional attempts for OnFailure workloads before giving up.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,

    /// Per-attempt command timeout in seconds (None = unlimited).
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_max_restarts() -> u32 {
    3
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            max_restarts: default_max_restarts(),
            command_timeout_secs: None,
        }
    }
}

impl ExecutorConfig {
    /// Per-attempt command timeout as a Duration.
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

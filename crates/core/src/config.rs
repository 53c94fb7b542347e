use serde::Deserialize;

/// Root SDK configuration. Loaded from environment variables with the
/// prefix `OFFERPULSE__` and applied once at widget mount; immutable for
/// the lifetime of a queue instance.
#[derive(Debug, Clone, Deserialize)]
pub struct SdkConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub beacon: BeaconConfig,
}

/// Click queue batching, retry, and persistence settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Buffered events before a forced flush.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Quiet period after the last enqueue before a timed flush (debounce).
    #[serde(default = "default_max_batch_delay_ms")]
    pub max_batch_delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    /// Persistence namespace. One queue instance per key; sharing a key
    /// across instances races on read-merge-write and is unsupported.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

/// Analytics beacon transport settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BeaconConfig {
    /// Payload ceiling for the fire-and-forget beacon primitive; larger
    /// payloads fall back to a standard async POST.
    #[serde(default = "default_max_beacon_bytes")]
    pub max_beacon_bytes: usize,
}

fn default_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_user_agent() -> String {
    format!("offerpulse-widget/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_batch_size() -> usize {
    10
}

fn default_max_batch_delay_ms() -> u64 {
    5_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_retry_delay_ms() -> u64 {
    1_000
}

fn default_max_retry_delay_ms() -> u64 {
    30_000
}

fn default_storage_key() -> String {
    "offerpulse_pending_clicks".to_string()
}

fn default_max_beacon_bytes() -> usize {
    65_536
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            user_agent: default_user_agent(),
            queue: QueueConfig::default(),
            beacon: BeaconConfig::default(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_batch_delay_ms: default_max_batch_delay_ms(),
            max_retries: default_max_retries(),
            initial_retry_delay_ms: default_initial_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            storage_key: default_storage_key(),
        }
    }
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            max_beacon_bytes: default_max_beacon_bytes(),
        }
    }
}

impl SdkConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("OFFERPULSE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.max_batch_size, 10);
        assert_eq!(config.max_batch_delay_ms, 5_000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_retry_delay_ms, 1_000);
        assert_eq!(config.max_retry_delay_ms, 30_000);
    }
}

//! Service configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use pipeline::{PipelineConfig, RetryPolicy};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Service configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `ORDERS_TOPIC` — inbound orders stream (default: `"orders"`)
/// - `SHIPMENTS_TOPIC` — inbound shipments stream (default: `"shipments"`)
/// - `RESERVED_STOCK_TOPIC` — outbound delta stream (default: `"reserved-stock"`)
/// - `DATA_DIR` — directory holding `<topic>.jsonl` files (default: `"./data"`)
/// - `HOST` / `PORT` — health and metrics listener (default: `"0.0.0.0"`, `9090`)
/// - `CHANNEL_BUFFER` — worker → combiner channel capacity (default: `256`)
/// - `PUBLISH_MAX_ATTEMPTS` — publish attempts per delta (default: `5`)
/// - `PUBLISH_INITIAL_BACKOFF_MS` / `PUBLISH_MAX_BACKOFF_MS` — retry backoff (default: `100`, `5000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `pretty` or `json` (default: `pretty`)
#[derive(Debug, Clone)]
pub struct Config {
    pub orders_topic: String,
    pub shipments_topic: String,
    pub reserved_stock_topic: String,
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub channel_buffer: usize,
    pub publish_max_attempts: u32,
    pub publish_initial_backoff: Duration,
    pub publish_max_backoff: Duration,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from `lookup`, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            orders_topic: lookup("ORDERS_TOPIC").unwrap_or(defaults.orders_topic),
            shipments_topic: lookup("SHIPMENTS_TOPIC").unwrap_or(defaults.shipments_topic),
            reserved_stock_topic: lookup("RESERVED_STOCK_TOPIC")
                .unwrap_or(defaults.reserved_stock_topic),
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT").unwrap_or(defaults.port),
            channel_buffer: parse_var(&lookup, "CHANNEL_BUFFER").unwrap_or(defaults.channel_buffer),
            publish_max_attempts: parse_var(&lookup, "PUBLISH_MAX_ATTEMPTS")
                .unwrap_or(defaults.publish_max_attempts),
            publish_initial_backoff: parse_var(&lookup, "PUBLISH_INITIAL_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.publish_initial_backoff),
            publish_max_backoff: parse_var(&lookup, "PUBLISH_MAX_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.publish_max_backoff),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Path of the JSON-lines file backing `topic`.
    pub fn topic_path(&self, topic: &str) -> PathBuf {
        self.data_dir.join(format!("{topic}.jsonl"))
    }

    /// Core pipeline tunables.
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_channel_buffer(self.channel_buffer)
            .with_retry(RetryPolicy::new(
                self.publish_max_attempts,
                self.publish_initial_backoff,
                self.publish_max_backoff,
            ))
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    lookup(name).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            orders_topic: "orders".to_string(),
            shipments_topic: "shipments".to_string(),
            reserved_stock_topic: "reserved-stock".to_string(),
            data_dir: PathBuf::from("./data"),
            host: "0.0.0.0".to_string(),
            port: 9090,
            channel_buffer: pipeline::config::DEFAULT_CHANNEL_BUFFER,
            publish_max_attempts: 5,
            publish_initial_backoff: Duration::from_millis(100),
            publish_max_backoff: Duration::from_secs(5),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

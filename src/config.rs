use anyhow::Result;
use figment::{providers::{Env, Format, Serialized, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub detection: DetectionConfig,
    #[validate(nested)]
    pub isolation: IsolationConfig,
    #[validate(nested)]
    pub dispatch: DispatchConfig,
    #[validate(nested)]
    pub notify: NotifyConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            enable_cors: true,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DetectionConfig {
    /// Evidence window, counted back from the triggering evaluation
    #[validate(range(min = 1))]
    pub window_seconds: u64,
    #[validate(range(min = 1))]
    pub min_last_gasps: usize,
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub confidence_threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_seconds: 30,
            min_last_gasps: 2,
            confidence_threshold: 0.7,
        }
    }
}

impl DetectionConfig {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.window_seconds as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IsolationConfig {
    #[validate(range(min = 1))]
    pub max_meter_ring_targets: usize,
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            max_meter_ring_targets: crate::isolation::DEFAULT_MAX_METER_RING_TARGETS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_latency_range"))]
pub struct DispatchConfig {
    #[validate(range(min = 1))]
    pub ack_timeout_ms: u64,
    pub sim_latency_min_ms: u64,
    pub sim_latency_max_ms: u64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub sim_failure_rate: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            ack_timeout_ms: 5_000,
            sim_latency_min_ms: 200,
            sim_latency_max_ms: 1_200,
            sim_failure_rate: 0.05,
        }
    }
}

impl DispatchConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

fn validate_latency_range(cfg: &DispatchConfig) -> std::result::Result<(), ValidationError> {
    if cfg.sim_latency_min_ms > cfg.sim_latency_max_ms {
        let mut err = ValidationError::new("latency_range");
        err.message = Some("sim_latency_min_ms must not exceed sim_latency_max_ms".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NotifyConfig {
    #[validate(range(min = 1))]
    pub channel_capacity: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { channel_capacity: 256 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedConfig {
    pub on_boot: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("LTGRID__").split("__"));
        let cfg: Config = figment.extract()?;
        cfg.validate()?;
        Ok(cfg)
    }
}

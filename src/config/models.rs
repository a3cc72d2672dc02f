// src/config/models.rs
use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub check: CheckConfig,
    pub probes: Vec<ProbeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub health_path: String,
    pub metrics_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            health_path: "/health".to_string(),
            metrics_path: "/metrics".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub success_status: u16,
    pub error_status: u16,
    pub pending_status: u16,
    pub success_label: String,
    pub error_label: String,
    pub pending_label: String,
    pub timeout_ms: u64,
    pub metrics: MetricsConfig,
    pub background: BackgroundConfig,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            success_status: 200,
            error_status: 503,
            pending_status: 202,
            success_label: "ok".to_string(),
            error_label: "error".to_string(),
            pending_label: "pending".to_string(),
            timeout_ms: 30_000,
            metrics: MetricsConfig::default(),
            background: BackgroundConfig::default(),
        }
    }
}

impl CheckConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub build_info: bool,
    pub runtime: bool,
    pub process: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 10,
        }
    }
}

impl BackgroundConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub name: String,
    #[serde(default)]
    pub notes: String,
    #[serde(flatten)]
    pub kind: ProbeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProbeKind {
    Http { url: Url },
    Tcp { addr: String },
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.check.validate()?;

        let mut names = HashSet::new();
        for probe in &self.probes {
            ensure!(!probe.name.is_empty(), "probe name must not be empty");
            if !names.insert(probe.name.as_str()) {
                bail!("duplicate probe name: {}", probe.name);
            }
        }

        Ok(())
    }
}

impl ServerConfig {
    fn validate(&self) -> Result<()> {
        for path in [&self.health_path, &self.metrics_path] {
            ensure!(path.starts_with('/'), "endpoint path {:?} must start with '/'", path);
        }
        ensure!(
            self.health_path != self.metrics_path,
            "health and metrics endpoints must differ"
        );
        Ok(())
    }
}

impl CheckConfig {
    fn validate(&self) -> Result<()> {
        // hyper cannot send an informational code as a final response.
        for code in [self.success_status, self.error_status, self.pending_status] {
            ensure!(
                (200..=599).contains(&code),
                "HTTP status code {} must be in 200..=599",
                code
            );
        }
        ensure!(
            self.success_status != self.error_status,
            "success and error status codes must differ"
        );
        ensure!(
            !self.success_label.is_empty()
                && !self.error_label.is_empty()
                && !self.pending_label.is_empty(),
            "status labels must not be empty"
        );
        ensure!(
            self.success_label != self.error_label,
            "success and error labels must differ"
        );
        ensure!(self.timeout_ms > 0, "timeout_ms must be greater than zero");
        if self.background.enabled {
            ensure!(
                self.background.interval_secs > 0,
                "background interval_secs must be greater than zero"
            );
        }
        Ok(())
    }
}

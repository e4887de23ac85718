// Configuration loading and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::readiness::Settings;

pub const PROD: &str = "prod";
#[allow(dead_code)]
pub const DEV: &str = "dev";
#[allow(dead_code)]
pub const TEST: &str = "test";

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Wait {
    #[serde(rename = "wait")]
    pub wait: WaitBox,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WaitBox {
    #[serde(default = "default_env")]
    pub env: String,
    pub logs: Option<Logs>,
    pub probe: Option<Probe>,
}

fn default_env() -> String {
    DEV.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logs {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Probe {
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(rename = "http_port")]
    pub http_port: Option<u16>,
    #[serde(rename = "ignore_port")]
    pub ignore_port: Option<u16>,
    #[serde(rename = "connect_timeout", default, with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,
    #[serde(rename = "poll_interval", default, with = "humantime_serde")]
    pub poll_interval: Option<Duration>,
}

// Config trait
pub trait ConfigTrait {
    fn logs(&self) -> Option<&Logs>;
    fn log_level(&self) -> &str;
    fn is_prod(&self) -> bool;
    #[allow(dead_code)]
    fn is_test(&self) -> bool;
    fn probe(&self) -> Option<&Probe>;
    /// Resolves probe settings, falling back to defaults for absent fields.
    fn settings(&self) -> Settings;
}

// Config type alias for convenience
pub type Config = Wait;

impl Default for Config {
    fn default() -> Self {
        Self {
            wait: WaitBox {
                env: default_env(),
                logs: None,
                probe: None,
            },
        }
    }
}

impl ConfigTrait for Config {
    fn logs(&self) -> Option<&Logs> {
        self.wait.logs.as_ref()
    }

    fn log_level(&self) -> &str {
        self.logs()
            .and_then(|logs| logs.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    fn is_prod(&self) -> bool {
        self.wait.env == PROD
    }

    fn is_test(&self) -> bool {
        self.wait.env == TEST
    }

    fn probe(&self) -> Option<&Probe> {
        self.wait.probe.as_ref()
    }

    fn settings(&self) -> Settings {
        let defaults = Settings::default();
        let Some(probe) = self.probe() else {
            return defaults;
        };
        Settings {
            timeout: probe.timeout.unwrap_or(defaults.timeout),
            http_port: probe.http_port.filter(|p| *p != 0),
            ignore_port: probe.ignore_port.filter(|p| *p != 0),
            connect_timeout: probe.connect_timeout.unwrap_or(defaults.connect_timeout),
            poll_interval: probe.poll_interval.unwrap_or(defaults.poll_interval),
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Resolve absolute path
        let abs_path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve absolute config filepath: {:?}", path))?;

        // Read file
        let data = std::fs::read_to_string(&abs_path)
            .with_context(|| format!("read config yaml file {:?}", abs_path))?;

        Self::parse(&data).with_context(|| format!("unmarshal yaml from {:?}", abs_path))
    }

    /// Parses configuration from YAML text.
    pub fn parse(data: &str) -> Result<Self> {
        let cfg: Wait = serde_yaml::from_str(data)?;
        cfg.settings()
            .validate()
            .context("invalid probe configuration")?;
        Ok(cfg)
    }
}

/// Values given on the command line; each one set replaces the file value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub timeout: Option<Duration>,
    pub http_port: Option<u16>,
    pub ignore_port: Option<u16>,
    pub connect_timeout: Option<Duration>,
    pub poll_interval: Option<Duration>,
}

impl Overrides {
    /// Applies the overrides. A port of 0 switches the port feature off.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(timeout) = self.timeout {
            settings.timeout = timeout;
        }
        if let Some(port) = self.http_port {
            settings.http_port = Some(port).filter(|p| *p != 0);
        }
        if let Some(port) = self.ignore_port {
            settings.ignore_port = Some(port).filter(|p| *p != 0);
        }
        if let Some(connect_timeout) = self.connect_timeout {
            settings.connect_timeout = connect_timeout;
        }
        if let Some(poll_interval) = self.poll_interval {
            settings.poll_interval = poll_interval;
        }
        settings
    }
}

// Test config is always available for integration tests
mod test_config;
#[allow(dead_code)]
pub use test_config::new_test_config;

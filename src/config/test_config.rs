use super::{Config, WaitBox};
use std::time::Duration;

/// Creates a new test configuration with short probe timings.
pub fn new_test_config() -> Config {
    Config {
        wait: WaitBox {
            env: super::TEST.to_string(),
            logs: Some(super::Logs {
                level: Some("debug".to_string()),
            }),
            probe: Some(super::Probe {
                timeout: Some(Duration::from_secs(2)),
                http_port: None,
                ignore_port: None,
                connect_timeout: Some(Duration::from_millis(100)),
                poll_interval: Some(Duration::from_millis(20)),
            }),
        },
    }
}

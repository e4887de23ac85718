//! Service discovery from Docker-link style environment variables.
//!
//! A linked container exposes `<NAME>_TCP_ADDR` and `<NAME>_TCP_PORT`
//! (for example `DB_PORT_5432_TCP_ADDR` / `DB_PORT_5432_TCP_PORT`). Every
//! `_TCP_ADDR` key yields one service named after the key without the suffix.

use std::collections::BTreeMap;
use tracing::warn;

use crate::model::Service;

const ADDR_SUFFIX: &str = "_TCP_ADDR";
const PORT_SUFFIX: &str = "_TCP_PORT";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    #[error("missing {key} for service '{service}'")]
    MissingPort { service: String, key: String },

    #[error("failed to convert {key} to a port, value: '{value}' for service '{service}'")]
    InvalidPort {
        service: String,
        key: String,
        value: String,
    },
}

/// Result of a discovery pass: usable services plus the ones that were dropped.
#[derive(Debug, Default)]
pub struct Discovered {
    pub services: Vec<Service>,
    pub skipped: Vec<DiscoveryError>,
}

/// Builds services from `(key, value)` pairs, ordered by service name.
pub fn discover<I, K, V>(vars: I) -> Discovered
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let vars: BTreeMap<String, String> = vars
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    let mut discovered = Discovered::default();
    for (key, addr) in &vars {
        let Some(name) = key.strip_suffix(ADDR_SUFFIX) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        match parse_port(name, &vars) {
            Ok(port) => discovered
                .services
                .push(Service::new(name, addr.clone(), port)),
            Err(err) => discovered.skipped.push(err),
        }
    }
    discovered
}

fn parse_port(name: &str, vars: &BTreeMap<String, String>) -> Result<u16, DiscoveryError> {
    let key = format!("{}{}", name, PORT_SUFFIX);
    let value = vars.get(&key).ok_or_else(|| DiscoveryError::MissingPort {
        service: name.to_string(),
        key: key.clone(),
    })?;
    value
        .trim()
        .parse::<u16>()
        .map_err(|_| DiscoveryError::InvalidPort {
            service: name.to_string(),
            key,
            value: value.clone(),
        })
}

/// Discovers services from the process environment, logging skipped ones.
pub fn from_env() -> Vec<Service> {
    let discovered = discover(std::env::vars());
    for err in &discovered.skipped {
        warn!(
            component = "discovery",
            event = "service_skipped",
            error = %err,
            "skipping service"
        );
    }
    discovered.services
}

/// Parses an explicit `NAME=HOST:PORT` service definition.
pub fn parse_service(definition: &str) -> Result<Service, String> {
    let (name, endpoint) = definition
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=HOST:PORT, got '{}'", definition))?;
    let (address, port) = endpoint
        .rsplit_once(':')
        .ok_or_else(|| format!("expected HOST:PORT, got '{}'", endpoint))?;
    let port = port
        .parse::<u16>()
        .map_err(|e| format!("invalid port '{}': {}", port, e))?;
    if name.is_empty() || address.is_empty() {
        return Err(format!("empty name or host in '{}'", definition));
    }
    Ok(Service::new(name, address, port))
}

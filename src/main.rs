// Main entrypoint for the svcwait startup gate.

use svcwait::config::{Config, ConfigTrait, Overrides};
use svcwait::discovery;
use svcwait::model::Service;
use svcwait::readiness::{Orchestrator, Verdict};
use svcwait::report::{self, LogReporter};

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const CONFIG_PATH: &str = "cfg/svcwait.cfg.yaml";
const CONFIG_PATH_LOCAL: &str = "cfg/svcwait.cfg.local.yaml";

/// Exit code for invalid configuration or flags.
const EXIT_STARTUP_ERROR: u8 = 2;

const LONG_ABOUT: &str = "\
Wait for services to be ready before starting a dependent process.

Attempts to connect to all TCP services linked to a Docker container (found
via their <NAME>_TCP_ADDR / <NAME>_TCP_PORT env vars, plus any --service given)
and waits for them to accept a TCP connection.

When an <httpport> is specified, for services running on <httpport>, after
a successful TCP connect, does an HTTP request and waits until it's done. This
is useful for slow-starting services that only start up when they receive
their first request.

When the timeout is over and a TCP connect or HTTP request was unsuccessful,
exits with status 1.";

/// svcwait - wait for linked services to become reachable
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = LONG_ABOUT)]
struct Args {
    /// Custom config file path
    #[arg(short, long, value_name = "FILE")]
    cfg: Option<PathBuf>,

    /// Time to wait for all services to be up (seconds)
    #[arg(long, value_name = "SECONDS", env = "SVCWAIT_TIMEOUT")]
    timeout: Option<u64>,

    /// Wait for an HTTP request if the target port is this port (0 = off)
    #[arg(long = "httpport", value_name = "PORT", env = "SVCWAIT_HTTP_PORT")]
    http_port: Option<u16>,

    /// Don't wait for services on this port to be up (0 = off)
    #[arg(long = "ignoreport", value_name = "PORT", env = "SVCWAIT_IGNORE_PORT")]
    ignore_port: Option<u16>,

    /// Bound for a single TCP connect attempt (e.g. "1s", "500ms")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    connect_timeout: Option<Duration>,

    /// Sleep between failed attempts (e.g. "200ms")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    poll_interval: Option<Duration>,

    /// Extra service to wait for, as NAME=HOST:PORT (repeatable)
    #[arg(long = "service", value_name = "NAME=HOST:PORT", value_parser = discovery::parse_service)]
    services: Vec<Service>,

    /// Don't discover services from environment variables
    #[arg(long)]
    no_env: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            timeout: self.timeout.map(Duration::from_secs),
            http_port: self.http_port,
            ignore_port: self.ignore_port,
            connect_timeout: self.connect_timeout,
            poll_interval: self.poll_interval,
        }
    }
}

/// Loads the configuration struct from YAML file.
/// Tries the custom path, then the local config, then the default config,
/// and falls back to built-in defaults when no file exists.
fn load_cfg(path: Option<&PathBuf>) -> Result<(Config, Option<PathBuf>)> {
    if let Some(custom_path) = path {
        let cfg = Config::load(custom_path)
            .with_context(|| format!("failed to load custom config from {:?}", custom_path))?;
        return Ok((cfg, Some(custom_path.clone())));
    }

    for candidate in [CONFIG_PATH_LOCAL, CONFIG_PATH] {
        let candidate = PathBuf::from(candidate);
        if candidate.exists() {
            let cfg = Config::load(&candidate)
                .with_context(|| format!("failed to load config from {:?}", candidate))?;
            return Ok((cfg, Some(candidate)));
        }
    }

    Ok((Config::default(), None))
}

/// Configures structured logging based on configuration.
fn configure_logger(cfg: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.log_level()));

    if cfg.is_prod() {
        // Production: JSON format
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        // Development: human readable, stdout stays free for the gated process
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn collect_services(args: &Args) -> Vec<Service> {
    let mut services = if args.no_env {
        Vec::new()
    } else {
        discovery::from_env()
    };
    services.extend(args.services.iter().cloned());
    services
}

fn main() -> ExitCode {
    // Parse command-line arguments
    let args = Args::parse();

    let (cfg, cfg_path) = match load_cfg(args.cfg.as_ref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_STARTUP_ERROR);
        }
    };

    // Configure logger (must be done after config is loaded)
    configure_logger(&cfg);
    match &cfg_path {
        Some(path) => info!(
            component = "config",
            event = "load_success",
            path = ?path,
            "config loaded"
        ),
        None => info!(
            component = "config",
            event = "defaults",
            "no config file found, using defaults"
        ),
    }

    match run(&args, &cfg) {
        Ok(verdict) => ExitCode::from(verdict.exit_code()),
        Err(e) => {
            let reason = format!("{:#}", e);
            error!(
                component = "main",
                event = "start_failed",
                error = %reason,
                "failed to start"
            );
            ExitCode::from(EXIT_STARTUP_ERROR)
        }
    }
}

fn run(args: &Args, cfg: &Config) -> Result<Verdict> {
    let settings = args.overrides().apply(cfg.settings());
    let timeout = settings.timeout;
    let orchestrator = Orchestrator::new(settings, Arc::new(LogReporter))
        .context("invalid probe settings")?;

    let services = collect_services(args);

    let verdict = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?
        .block_on(async move {
            report::log_start(services.len());
            let run = orchestrator.run(&services).await;
            report::log_summary(&run, timeout);
            run.verdict
        });
    Ok(verdict)
}

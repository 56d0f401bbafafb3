// NetLocator - Main Entry Point
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! # NetLocator
//!
//! A macOS utility that detects the current network environment (Wi-Fi
//! SSID, DNS configuration, VPN tunnel) and applies a matching named
//! location profile: DNS, proxy, printer, NTP, and shell proxy
//! environment. Built as orchestration over `networksetup`, `scutil`,
//! `systemsetup`, `lpadmin` and `sntp`.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

mod command;
mod external;
mod location;
mod models;
mod network;
mod services;

use command::SystemRunner;
use location::{evaluate, Evaluator};
use models::{Config, APP_NAME, LOG_FILE_NAME};
use network::probe::NetworkInfoSource;
use network::proxy::NoPacResolver;
use network::ScutilProbe;

/// Application version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "netlocator", version, about = "macOS network location detector and profile switcher")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch for network changes and apply matching locations
    Run,
    /// Evaluate the network once and apply the matching location
    Apply {
        /// Apply this location instead of matching
        #[arg(long)]
        location: Option<String>,
    },
    /// Show the current network state and the location it matches
    Status,
    /// Print the configuration file path
    ConfigPath,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = init_logging(cli.debug || config.settings.debug);
    info!("Starting {} v{}", APP_NAME, VERSION);

    let result = match cli.command {
        Command::Run => run_daemon(&config),
        Command::Apply { location } => apply_once(&config, location.as_deref()),
        Command::Status => show_status(&config),
        Command::ConfigPath => {
            println!("{}", Config::path().display());
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Console plus file logging; the returned guard must outlive `main` so
/// buffered file output is flushed on exit.
fn init_logging(debug: bool) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_appender = tracing_appender::rolling::never(models::log_dir(), LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    guard
}

/// `run`: evaluate once at startup, then react to change notifications
/// until interrupted.
fn run_daemon(config: &Config) -> models::Result<()> {
    let runner = SystemRunner;
    let probe = ScutilProbe::new(runner);
    let pac = NoPacResolver;
    let mut evaluator = Evaluator::new(runner, &probe, &pac);
    let debounce = Duration::from_secs(config.settings.debounce_seconds);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        // Converge before watching so a freshly started daemon does not
        // wait for the first network change.
        match tokio::task::block_in_place(|| evaluator.run_cycle(config)) {
            Ok(cycle) => info!("Initial location: {}", cycle.outcome().location),
            Err(e) => error!("Initial evaluation failed: {}", e),
        }

        let (tx, rx) = mpsc::channel(32);
        let monitor = tokio::spawn(services::monitor::watch(tx));

        let result = tokio::select! {
            result = services::reactor::run(rx, evaluator, debounce, Config::load) => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                Ok(())
            }
        };

        monitor.abort();
        result
    })
}

/// `apply`: one evaluation cycle, or a forced named location.
fn apply_once(config: &Config, location: Option<&str>) -> models::Result<()> {
    let runner = SystemRunner;
    let probe = ScutilProbe::new(runner);
    let pac = NoPacResolver;

    match location {
        Some(name) => {
            let profile = config
                .location(name)
                .ok_or_else(|| models::Error::LocationNotFound(name.to_string()))?;
            let vpn_active = probe.vpn_active();
            let applier = location::LocationApplier::new(runner, &probe);
            let writer;
            let shell_env = if config.settings.shell_proxy_enabled {
                writer = network::ShellEnvWriter::new(&pac);
                Some(&writer)
            } else {
                None
            };
            applier.apply(name, profile, vpn_active, shell_env);
            println!("Applied location: {}", name);
        }
        None => {
            let mut evaluator = Evaluator::new(runner, &probe, &pac);
            let outcome = evaluator.force_apply(config)?;
            println!(
                "Applied location: {} (VPN: {})",
                outcome.location,
                if outcome.vpn_active { "active" } else { "inactive" }
            );
        }
    }
    Ok(())
}

/// `status`: read-only report of network state and the matched location.
fn show_status(config: &Config) -> models::Result<()> {
    let runner = SystemRunner;
    let probe = ScutilProbe::new(runner);

    let snapshot = probe
        .snapshot()
        .ok_or(models::Error::NetworkStateUnavailable)?;
    let outcome = evaluate::describe(config, &probe)?;

    println!("NetLocator status ({})", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("  SSID:            {}", snapshot.ssid.as_deref().unwrap_or("-"));
    println!(
        "  Primary service: {} ({})",
        snapshot.service_name.as_deref().unwrap_or("unknown"),
        snapshot.interface.as_deref().unwrap_or("-")
    );
    println!(
        "  DNS servers:     {}",
        if snapshot.dns_servers.is_empty() {
            "-".to_string()
        } else {
            snapshot.dns_servers.join(", ")
        }
    );
    println!(
        "  Search domains:  {}",
        if snapshot.search_domains.is_empty() {
            "-".to_string()
        } else {
            snapshot.search_domains.join(", ")
        }
    );
    println!(
        "  VPN:             {}",
        if outcome.vpn_active { "active" } else { "inactive" }
    );
    if outcome.vpn_active {
        if let Some(details) = external::vpn::vpn_details(&runner, snapshot.service_id.as_deref()) {
            for line in details.lines() {
                println!("                   {}", line);
            }
        }
    }
    println!("  Matched location: {}", outcome.location);

    let details = external::ipinfo::fetch_connection_details();
    println!("  Public IP:       {}", details);

    Ok(())
}

// NetLocator - Evaluation Cycle
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! The full evaluation cycle: probe, match, apply.
//!
//! A cycle runs in two phases. The check phase probes and matches with no
//! side effects; only when the resulting location or VPN state differs
//! from the last applied pair does the commit phase re-apply settings and
//! refresh external collaborators. This keeps repeated debounce ticks
//! from re-issuing `sudo`-gated mutations when nothing changed.

use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::command::CommandRunner;
use crate::location::applier::LocationApplier;
use crate::location::matcher::{self, MatchContext};
use crate::models::{Config, Error, Result, DEFAULT_LOCATION};
use crate::network::probe::NetworkInfoSource;
use crate::network::proxy::PacResolver;
use crate::network::shell_env::ShellEnvWriter;

/// The resolved result of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub location: String,
    pub vpn_active: bool,
}

/// What a full cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleResult {
    /// Location and VPN state match the last applied pair; nothing done.
    Unchanged(Outcome),
    /// Settings were (re)applied for the outcome.
    Applied(Outcome),
}

impl CycleResult {
    pub fn outcome(&self) -> &Outcome {
        match self {
            CycleResult::Unchanged(o) | CycleResult::Applied(o) => o,
        }
    }
}

/// Runs evaluation cycles and tracks the last applied state.
pub struct Evaluator<'a, R: CommandRunner + Copy> {
    runner: R,
    probe: &'a dyn NetworkInfoSource,
    pac_resolver: &'a dyn PacResolver,
    last: Option<Outcome>,
    vpn_resolver_files: Vec<PathBuf>,
}

impl<'a, R: CommandRunner + Copy> Evaluator<'a, R> {
    pub fn new(
        runner: R,
        probe: &'a dyn NetworkInfoSource,
        pac_resolver: &'a dyn PacResolver,
    ) -> Self {
        Self {
            runner,
            probe,
            pac_resolver,
            last: None,
            vpn_resolver_files: Vec::new(),
        }
    }

    /// Probe and match without side effects.
    pub fn check(&self, config: &Config) -> Result<Outcome> {
        let snapshot = self
            .probe
            .snapshot()
            .ok_or(Error::NetworkStateUnavailable)?;

        debug!(
            "Primary interface: {:?} ({:?})",
            snapshot.service_name, snapshot.interface
        );
        info!("SSID: {:?}", snapshot.ssid);
        debug!("DNS servers: {:?}", snapshot.dns_servers);
        debug!("Search domains: {} found", snapshot.search_domains.len());

        if snapshot.vpn_active && snapshot.search_domains.len() <= 1 {
            info!("VPN detected but few search domains - network may be transitioning");
        }

        let location = matcher::match_location(
            &config.locations,
            &MatchContext {
                ssid: snapshot.ssid.as_deref(),
                search_domains: &snapshot.search_domains,
                vpn_active: snapshot.vpn_active,
            },
        );

        if config.location(&location).is_none() {
            if location == DEFAULT_LOCATION {
                return Err(Error::Unresolved);
            }
            return Err(Error::LocationNotFound(location));
        }

        Ok(Outcome {
            location,
            vpn_active: snapshot.vpn_active,
        })
    }

    /// Run one full cycle: check, and commit only on change.
    pub fn run_cycle(&mut self, config: &Config) -> Result<CycleResult> {
        self.probe.invalidate();
        let result = self.cycle_body(config);
        self.probe.invalidate();
        result
    }

    /// Apply unconditionally for the current state (manual `apply` command).
    pub fn force_apply(&mut self, config: &Config) -> Result<Outcome> {
        self.probe.invalidate();
        let outcome = self.check(config)?;
        self.commit(config, &outcome);
        self.last = Some(outcome.clone());
        self.probe.invalidate();
        Ok(outcome)
    }

    fn cycle_body(&mut self, config: &Config) -> Result<CycleResult> {
        let outcome = self.check(config)?;

        if self.last.as_ref() == Some(&outcome) {
            debug!(
                "Location '{}' unchanged (VPN={}), skipping apply",
                outcome.location, outcome.vpn_active
            );
            return Ok(CycleResult::Unchanged(outcome));
        }

        self.commit(config, &outcome);
        self.last = Some(outcome.clone());
        Ok(CycleResult::Applied(outcome))
    }

    fn commit(&mut self, config: &Config, outcome: &Outcome) {
        let profile = match config.location(&outcome.location) {
            Some(profile) => profile.clone(),
            None => return,
        };

        let applier = LocationApplier::new(self.runner, self.probe);
        let was_vpn = self.last.as_ref().map(|o| o.vpn_active).unwrap_or(false);

        // VPN-down cleanup must precede the apply pass: the cleanup
        // disables proxies on every service, and the incoming profile may
        // legitimately carry a proxy of its own.
        if !outcome.vpn_active && was_vpn {
            info!("VPN transition down, removing resolver overrides");
            let files = std::mem::take(&mut self.vpn_resolver_files);
            applier.remove_vpn_resolver_files(&files);
            applier.cleanup_after_vpn();
        }

        let shell_writer;
        let shell_env = if config.settings.shell_proxy_enabled {
            shell_writer = ShellEnvWriter::new(self.pac_resolver);
            Some(&shell_writer)
        } else {
            None
        };
        applier.apply(&outcome.location, &profile, outcome.vpn_active, shell_env);

        if outcome.vpn_active && !was_vpn {
            info!("VPN transition up, materializing resolver overrides");
            let vpn_dns = match self.probe.default_route_interface() {
                Some(iface) => self.probe.dns_servers(&iface),
                None => Vec::new(),
            };
            self.vpn_resolver_files =
                applier.create_vpn_resolver_files(&profile.dns_search_domains, &vpn_dns);
        }
    }

    /// Last applied (location, VPN) pair, if any cycle has committed.
    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.last.as_ref()
    }
}

/// Log-only summary for the `status` command; never applies anything.
pub fn describe(config: &Config, probe: &dyn NetworkInfoSource) -> Result<Outcome> {
    let snapshot = probe.snapshot().ok_or(Error::NetworkStateUnavailable)?;
    let location = matcher::match_location(
        &config.locations,
        &MatchContext {
            ssid: snapshot.ssid.as_deref(),
            search_domains: &snapshot.search_domains,
            vpn_active: snapshot.vpn_active,
        },
    );
    if config.location(&location).is_none() {
        warn!("Matched location '{}' is not configured", location);
    }
    Ok(Outcome {
        location,
        vpn_active: snapshot.vpn_active,
    })
}

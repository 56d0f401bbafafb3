// NetLocator - Settings Applier
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Converges OS settings to a selected location profile.
//!
//! Application is best-effort throughout: individual command failures are
//! logged and the pass continues, so a partially reachable system still
//! ends up as close to the profile as possible.

use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::command::CommandRunner;
use crate::models::{LocationProfile, RESOLVER_DIR};
use crate::network::configure::NetworkConfigurator;
use crate::network::probe::NetworkInfoSource;
use crate::network::shell_env::{self, ShellEnvWriter};

/// Applies a location profile through the OS configuration CLIs.
pub struct LocationApplier<'a, R: CommandRunner> {
    runner: R,
    configurator: NetworkConfigurator<R>,
    probe: &'a dyn NetworkInfoSource,
}

impl<'a, R: CommandRunner + Copy> LocationApplier<'a, R> {
    pub fn new(runner: R, probe: &'a dyn NetworkInfoSource) -> Self {
        Self {
            runner,
            configurator: NetworkConfigurator::new(runner),
            probe,
        }
    }

    /// Apply a profile's per-service settings to one network service.
    ///
    /// `skip_dns` suppresses the DNS and search-domain steps; the reactor
    /// sets it during VPN churn so transient tunnel-assigned values are
    /// not fought over. Proxy still applies.
    pub fn apply_to_service(
        &self,
        profile: &LocationProfile,
        service_name: &str,
        interface: &str,
        vpn_active: bool,
        skip_dns: bool,
    ) {
        if !skip_dns {
            let current_domains = self.probe.search_domains(interface);
            let domains = reconcile_search_domains(
                &profile.dns_search_domains,
                &current_domains,
                vpn_active,
            );
            self.configurator.set_search_domains(service_name, &domains);
            self.configurator
                .set_dns_servers(service_name, &profile.dns_servers);
        } else {
            debug!("Skipping DNS steps for '{}' (VPN churn)", service_name);
        }

        if profile.has_proxy() {
            self.configurator
                .set_proxy(service_name, Some(&profile.proxy_url));
        } else {
            self.configurator.set_proxy(service_name, None);
        }
    }

    /// Apply a profile across every active service, then the system-wide
    /// printer, NTP, and shell proxy environment.
    pub fn apply(
        &self,
        name: &str,
        profile: &LocationProfile,
        vpn_active: bool,
        shell_env: Option<&ShellEnvWriter<'_>>,
    ) {
        info!("Applying settings for location: {}", name);

        let skip_dns = vpn_active;
        for active in self.probe.active_services(false) {
            debug!("Applying to {} ({})", active.service, active.device);
            self.apply_to_service(profile, &active.service, &active.device, vpn_active, skip_dns);
        }

        if !profile.printer.is_empty() {
            self.configurator.set_default_printer(&profile.printer);
        }
        if !profile.ntp_server.is_empty() {
            self.configurator.set_ntp_server(&profile.ntp_server);
        }

        if let Some(writer) = shell_env {
            let hostname = shell_env::local_hostname(&self.runner);
            let env = writer.build_env(
                &profile.proxy_url,
                &profile.dns_search_domains,
                hostname.as_deref(),
            );
            if let Err(e) = writer.write_all(env.as_ref()) {
                warn!("Failed to update shell proxy environment: {}", e);
            }
        }
    }

    /// Create per-domain resolver override files so the profile's search
    /// domains resolve via the VPN's DNS servers without touching the
    /// system default resolver. Domains already in the live search list
    /// are skipped. Returns the files created, for symmetric removal.
    pub fn create_vpn_resolver_files(
        &self,
        search_domains: &[String],
        vpn_dns_servers: &[String],
    ) -> Vec<PathBuf> {
        let mut created = Vec::new();
        if search_domains.is_empty() {
            return created;
        }

        if !self.runner.run("sudo", &["mkdir", "-p", RESOLVER_DIR]) {
            warn!("Could not create {}", RESOLVER_DIR);
            return created;
        }

        let current_domains = match self.probe.default_route_interface() {
            Some(iface) => self.probe.search_domains(&iface),
            None => Vec::new(),
        };

        for domain in search_domains {
            if current_domains.contains(domain) {
                debug!("Skipping domain {} already in live search list", domain);
                continue;
            }

            let path = PathBuf::from(RESOLVER_DIR).join(domain);
            let mut content = format!("search {}\n", domain);
            if !vpn_dns_servers.is_empty() {
                for dns in vpn_dns_servers {
                    content.push_str(&format!("nameserver {}\n", dns));
                }
                // Rank this resolver ahead of the defaults.
                content.push_str("search_order 1\n");
            }

            // tee keeps the privileged write inside sudo; a shell
            // redirection would run unprivileged.
            let path_str = path.to_string_lossy().to_string();
            if self
                .runner
                .run_with_input("sudo", &["tee", &path_str], &content)
                .is_some()
            {
                debug!("Created resolver file for {}", domain);
                created.push(path);
            } else {
                warn!("Failed to create resolver file for {}", domain);
            }
        }

        if !created.is_empty() {
            info!("Created {} resolver files in {}", created.len(), RESOLVER_DIR);
        }
        created
    }

    /// Remove resolver override files created on VPN-up.
    pub fn remove_vpn_resolver_files(&self, files: &[PathBuf]) {
        for path in files {
            let path_str = path.to_string_lossy().to_string();
            if self.runner.run("sudo", &["rm", "-f", &path_str]) {
                debug!("Removed resolver file: {}", path.display());
            } else {
                warn!("Failed to remove {}", path.display());
            }
        }
        if !files.is_empty() {
            info!("Removed {} resolver files from {}", files.len(), RESOLVER_DIR);
        }
    }

    /// VPN-down cleanup: flush DNS caches and disable proxies across all
    /// active services so corporate settings do not linger.
    pub fn cleanup_after_vpn(&self) {
        self.configurator.flush_dns_cache();
        for active in self.probe.active_services(false) {
            self.configurator.disable_all_proxies(&active.service);
        }
    }
}

/// Decide the search-domain list to apply, reconciling configured domains
/// with what the system currently reports.
///
/// - configured domains present, on VPN or no live domains: configured
///   plus live, deduplicated in order (VPN-pushed domains kept)
/// - configured domains present, off VPN with live domains: configured
///   plus only the live domains under reserved local suffixes, so stale
///   corporate domains are dropped after disconnecting
/// - no configured domains: pass the live list through untouched
pub fn reconcile_search_domains(
    config_domains: &[String],
    current_domains: &[String],
    vpn_active: bool,
) -> Vec<String> {
    if config_domains.is_empty() {
        return current_domains.to_vec();
    }

    let extra: Vec<&String> = if vpn_active || current_domains.is_empty() {
        current_domains.iter().collect()
    } else {
        current_domains
            .iter()
            .filter(|d| d.ends_with(".local") || d.ends_with(".arpa"))
            .collect()
    };

    let mut merged: Vec<String> = Vec::with_capacity(config_domains.len() + extra.len());
    for domain in config_domains.iter().chain(extra.into_iter()) {
        if !merged.contains(domain) {
            merged.push(domain.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::RecordingRunner;
    use crate::network::probe::testing::FakeProbe;
    use crate::network::probe::ActiveService;

    fn office_profile() -> LocationProfile {
        LocationProfile {
            ssids: vec!["CorpWiFi".to_string()],
            dns_servers: vec!["10.0.0.1".to_string()],
            dns_search_domains: vec!["corp.example.com".to_string()],
            proxy_url: "http://proxy.corp.example.com:8080".to_string(),
            printer: String::new(),
            ntp_server: String::new(),
        }
    }

    #[test]
    fn test_reconcile_keeps_local_suffixes_off_vpn() {
        let applied = reconcile_search_domains(
            &["corp.com".to_string()],
            &["corp.com".to_string(), "home.arpa".to_string()],
            false,
        );
        assert_eq!(applied, vec!["corp.com".to_string(), "home.arpa".to_string()]);
    }

    #[test]
    fn test_reconcile_drops_stale_remote_domains_off_vpn() {
        let applied = reconcile_search_domains(
            &["corp.com".to_string()],
            &["old-corp.com".to_string(), "printer.local".to_string()],
            false,
        );
        assert_eq!(
            applied,
            vec!["corp.com".to_string(), "printer.local".to_string()]
        );
    }

    #[test]
    fn test_reconcile_merges_everything_on_vpn() {
        let applied = reconcile_search_domains(
            &["corp.com".to_string()],
            &["vpn.corp.com".to_string(), "corp.com".to_string()],
            true,
        );
        assert_eq!(
            applied,
            vec!["corp.com".to_string(), "vpn.corp.com".to_string()]
        );
    }

    #[test]
    fn test_reconcile_passthrough_without_config_domains() {
        let current = vec!["anything.example".to_string()];
        assert_eq!(reconcile_search_domains(&[], &current, false), current);
    }

    #[test]
    fn test_apply_to_service_command_sequence() {
        let runner = RecordingRunner::new();
        let probe = FakeProbe::default();
        let applier = LocationApplier::new(&runner, &probe);

        applier.apply_to_service(&office_profile(), "Wi-Fi", "en0", false, false);

        assert_eq!(
            runner.recorded(),
            vec![
                "sudo /usr/sbin/networksetup -setsearchdomains Wi-Fi corp.example.com",
                "sudo /usr/sbin/networksetup -setdnsservers Wi-Fi 10.0.0.1",
                "sudo /usr/sbin/networksetup -setwebproxy Wi-Fi proxy.corp.example.com 8080",
            ]
        );
    }

    #[test]
    fn test_apply_is_idempotent_command_wise() {
        let runner = RecordingRunner::new();
        let probe = FakeProbe::default();
        let applier = LocationApplier::new(&runner, &probe);
        let profile = office_profile();

        applier.apply_to_service(&profile, "Wi-Fi", "en0", false, false);
        let first: Vec<String> = runner.recorded();
        applier.apply_to_service(&profile, "Wi-Fi", "en0", false, false);
        let both = runner.recorded();

        assert_eq!(both.len(), first.len() * 2);
        assert_eq!(&both[first.len()..], first.as_slice());
    }

    #[test]
    fn test_skip_dns_still_applies_proxy() {
        let runner = RecordingRunner::new();
        let probe = FakeProbe::default();
        let applier = LocationApplier::new(&runner, &probe);

        applier.apply_to_service(&office_profile(), "Wi-Fi", "en0", true, true);

        let recorded = runner.recorded();
        assert!(recorded.iter().all(|c| !c.contains("-setdnsservers")));
        assert!(recorded.iter().all(|c| !c.contains("-setsearchdomains")));
        assert!(recorded.iter().any(|c| c.contains("-setwebproxy")));
    }

    #[test]
    fn test_apply_covers_all_active_services() {
        let runner = RecordingRunner::new();
        let probe = FakeProbe {
            services: vec![
                ActiveService {
                    service: "Wi-Fi".to_string(),
                    device: "en0".to_string(),
                },
                ActiveService {
                    service: "USB 10/100/1000 LAN".to_string(),
                    device: "en5".to_string(),
                },
            ],
            ..Default::default()
        };
        let applier = LocationApplier::new(&runner, &probe);

        let mut profile = office_profile();
        profile.printer = "OfficePrinter".to_string();
        applier.apply("Office", &profile, false, None);

        let recorded = runner.recorded();
        assert!(recorded
            .iter()
            .any(|c| c.contains("-setdnsservers Wi-Fi")));
        assert!(recorded
            .iter()
            .any(|c| c.contains("-setdnsservers USB 10/100/1000 LAN")));
        assert!(recorded
            .iter()
            .any(|c| c == "/usr/sbin/lpadmin -d OfficePrinter"));
    }

    #[test]
    fn test_resolver_files_skip_live_domains() {
        let runner = RecordingRunner::new()
            .with_response("sudo tee /etc/resolver/corp.example.com", "");
        let probe = FakeProbe {
            snapshot: crate::network::NetworkSnapshot {
                interface: Some("utun4".to_string()),
                search_domains: vec!["already.example.com".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let applier = LocationApplier::new(&runner, &probe);

        let created = applier.create_vpn_resolver_files(
            &[
                "corp.example.com".to_string(),
                "already.example.com".to_string(),
            ],
            &["10.8.0.1".to_string()],
        );

        assert_eq!(created, vec![PathBuf::from("/etc/resolver/corp.example.com")]);
        let recorded = runner.recorded();
        assert!(recorded.contains(&"sudo mkdir -p /etc/resolver".to_string()));
        assert!(!recorded
            .iter()
            .any(|c| c.contains("already.example.com")));
    }

    #[test]
    fn test_cleanup_after_vpn_flushes_and_disables() {
        let runner = RecordingRunner::new();
        let probe = FakeProbe {
            services: vec![ActiveService {
                service: "Wi-Fi".to_string(),
                device: "en0".to_string(),
            }],
            ..Default::default()
        };
        let applier = LocationApplier::new(&runner, &probe);

        applier.cleanup_after_vpn();

        let recorded = runner.recorded();
        assert!(recorded.contains(&"sudo /usr/bin/dscacheutil -flushcache".to_string()));
        assert!(recorded.contains(&"sudo /usr/bin/killall -HUP mDNSResponder".to_string()));
        assert!(recorded
            .contains(&"sudo /usr/sbin/networksetup -setautoproxystate Wi-Fi off".to_string()));
    }
}

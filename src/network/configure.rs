// NetLocator - Network Configuration
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! OS network mutation via `networksetup`, `systemsetup`, `lpadmin` and
//! `sntp`.
//!
//! Every operation is idempotent and best-effort: failures are logged and
//! the apply pass continues, converging the remaining settings.

use tracing::{debug, info, warn};

use crate::command::CommandRunner;
use crate::network::proxy::{self, ProxyUrl};

const NETWORKSETUP: &str = "/usr/sbin/networksetup";
const SYSTEMSETUP: &str = "/usr/sbin/systemsetup";
const LPADMIN: &str = "/usr/sbin/lpadmin";
const SNTP: &str = "/usr/bin/sntp";

/// Applies network settings to named services through the OS CLIs.
pub struct NetworkConfigurator<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> NetworkConfigurator<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Set DNS servers for a service. An empty list issues no command at
    /// all, leaving DHCP-supplied resolvers untouched.
    pub fn set_dns_servers(&self, service_name: &str, dns_servers: &[String]) {
        if dns_servers.is_empty() {
            info!(
                "No DNS servers configured for '{}', leaving DHCP in control",
                service_name
            );
            return;
        }

        info!("Setting DNS servers for '{}' to: {:?}", service_name, dns_servers);
        let mut args = vec!["-setdnsservers", service_name];
        args.extend(dns_servers.iter().map(String::as_str));
        self.sudo(NETWORKSETUP, &args);
    }

    /// Set search domains for a service. An empty list clears them via the
    /// literal "Empty" argument.
    pub fn set_search_domains(&self, service_name: &str, domains: &[String]) {
        let mut args = vec!["-setsearchdomains", service_name];
        if domains.is_empty() {
            info!("Clearing search domains for '{}'", service_name);
            args.push("Empty");
            self.sudo(NETWORKSETUP, &args);
        } else {
            info!("Setting {} search domains for '{}'", domains.len(), service_name);
            debug!("Search domains for '{}': {:?}", service_name, domains);
            args.extend(domains.iter().map(String::as_str));
            self.sudo(NETWORKSETUP, &args);
        }
    }

    /// Configure the proxy for a service. `None` disables every proxy
    /// state; PAC/WPAD URLs (or anything unparseable) go through the
    /// auto-proxy URL; manual endpoints are dispatched by scheme.
    pub fn set_proxy(&self, service_name: &str, url: Option<&str>) {
        let url = match url {
            Some(url) if !url.is_empty() => url,
            _ => {
                info!("Disabling all proxies for '{}'", service_name);
                self.disable_all_proxies(service_name);
                return;
            }
        };

        info!("Setting proxy for '{}' to {}", service_name, url);

        if proxy::is_pac_url(url) {
            self.sudo(NETWORKSETUP, &["-setautoproxyurl", service_name, url]);
            return;
        }

        match ProxyUrl::parse(url) {
            Some(parsed) => {
                let port = parsed.port.to_string();
                match parsed.scheme.as_str() {
                    "http" => {
                        self.sudo(NETWORKSETUP, &["-setwebproxy", service_name, &parsed.host, &port]);
                    }
                    "https" => {
                        self.sudo(
                            NETWORKSETUP,
                            &["-setsecurewebproxy", service_name, &parsed.host, &port],
                        );
                    }
                    "socks" => {
                        self.sudo(
                            NETWORKSETUP,
                            &["-setsocksfirewallproxy", service_name, &parsed.host, &port],
                        );
                    }
                    other => {
                        debug!("Unknown proxy scheme '{}', trying as auto-proxy URL", other);
                        self.sudo(NETWORKSETUP, &["-setautoproxyurl", service_name, url]);
                    }
                }
            }
            None => {
                debug!("Proxy URL parsing failed for {}, trying as auto-proxy URL", url);
                self.sudo(NETWORKSETUP, &["-setautoproxyurl", service_name, url]);
            }
        }
    }

    /// Turn off auto, web, secure web and SOCKS proxy states.
    pub fn disable_all_proxies(&self, service_name: &str) {
        for flag in [
            "-setautoproxystate",
            "-setwebproxystate",
            "-setsecurewebproxystate",
            "-setsocksfirewallproxystate",
        ] {
            self.sudo(NETWORKSETUP, &[flag, service_name, "off"]);
        }
    }

    /// Set the system default printer. Unconditional; `lpadmin` is a
    /// cheap no-op when the printer is already the default.
    pub fn set_default_printer(&self, printer_name: &str) {
        info!("Setting default printer to {}", printer_name);
        if !self.runner.run(LPADMIN, &["-d", printer_name]) {
            warn!("Failed to set default printer '{}'", printer_name);
        }
    }

    /// Set the system NTP server. Network time is toggled off and back on
    /// around the change to clear any stuck daemon state, then an
    /// immediate sync is attempted with a short timeout.
    pub fn set_ntp_server(&self, ntp_server: &str) {
        info!("Setting NTP server to {}", ntp_server);

        debug!("Temporarily disabling network time");
        self.sudo(SYSTEMSETUP, &["-setusingnetworktime", "off"]);

        self.sudo(SYSTEMSETUP, &["-setnetworktimeserver", ntp_server]);

        debug!("Re-enabling network time");
        self.sudo(SYSTEMSETUP, &["-setusingnetworktime", "on"]);

        debug!("Triggering time synchronization");
        let synced = self
            .runner
            .run_capture("sudo", &[SNTP, "-t", "3", "-sS", ntp_server])
            .is_some();
        if synced {
            info!("Time synchronization completed successfully");
        } else {
            // The daemon still syncs on its own once the network allows it.
            info!("Immediate time sync failed (may be blocked by VPN/firewall)");
        }
    }

    /// Flush the system DNS caches after resolver changes.
    pub fn flush_dns_cache(&self) {
        debug!("Flushing DNS caches");
        self.sudo("/usr/bin/dscacheutil", &["-flushcache"]);
        self.sudo("/usr/bin/killall", &["-HUP", "mDNSResponder"]);
    }

    fn sudo(&self, program: &str, args: &[&str]) {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(program);
        full.extend_from_slice(args);
        if !self.runner.run("sudo", &full) {
            warn!("Command failed: sudo {} {}", program, args.join(" "));
        }
    }
}

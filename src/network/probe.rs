// NetLocator - Network State Probe
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Read-only network state queries.
//!
//! All state comes from parsing OS tool output (`scutil`, `networksetup`,
//! `ipconfig`, `netstat`). The parsing lives behind [`NetworkInfoSource`]
//! so matching and application logic can be tested against canned state.
//!
//! Every query fails soft: on error it logs and returns `None`/empty,
//! never an `Err` to the caller.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::command::CommandRunner;
use crate::network::snapshot::{NetworkSnapshot, ProbeCache};
use crate::network::VPN_INTERFACE_PREFIX;

static NAMESERVER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"nameserver\[\s*\d+\s*\]\s*:\s*([\d.]+)").unwrap());
static SEARCH_DOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"search domain\[\s*\d+\s*\]\s*:\s*(\S+)").unwrap());
static PRIMARY_INTERFACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"PrimaryInterface\s*:\s*(\S+)").unwrap());
static PRIMARY_SERVICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"PrimaryService\s*:\s*(\S+)").unwrap());
static USER_DEFINED_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"UserDefinedName\s*:\s*(.+)").unwrap());
static DEVICE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Device:\s*(\w+)").unwrap());
static SSID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bSSID\s*:\s*(.+)").unwrap());
static IPV4_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").unwrap());
static USB_LAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^USB.*LAN$").unwrap());

/// Primary network service resolution result.
#[derive(Debug, Clone)]
pub struct PrimaryService {
    /// Human-facing service name (e.g., "Wi-Fi", "USB 10/100/1000 LAN").
    /// When the route is owned by a VPN tunnel this names the underlying
    /// physical service, not the tunnel.
    pub service_name: Option<String>,
    /// Primary interface (may be a `utun*` tunnel).
    pub interface: String,
    /// OS service identifier of the primary service.
    pub service_id: Option<String>,
}

/// An active (IPv4-holding) configured network service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveService {
    pub service: String,
    pub device: String,
}

/// Read-only network state source.
pub trait NetworkInfoSource: Send + Sync {
    /// SSID of the associated Wi-Fi network, if any.
    fn current_ssid(&self) -> Option<String>;

    /// Primary service and interface; resolves through VPN tunnels to the
    /// underlying configurable service.
    fn primary_service(&self) -> Option<PrimaryService>;

    /// DNS servers from the resolver block scoped to `interface`.
    fn dns_servers(&self, interface: &str) -> Vec<String>;

    /// Search domains from the resolver block scoped to `interface`.
    fn search_domains(&self, interface: &str) -> Vec<String>;

    /// Interface owning the default IPv4 route.
    fn default_route_interface(&self) -> Option<String>;

    /// All active services with an IPv4 address.
    fn active_services(&self, include_vpn: bool) -> Vec<ActiveService>;

    /// Drop any cached probe state.
    fn invalidate(&self);

    /// A VPN is active iff the default route is a tunnel interface that
    /// also carries a live resolver entry. The resolver check filters out
    /// relay-style tunnels that are not user VPNs.
    fn vpn_active(&self) -> bool {
        match self.default_route_interface() {
            Some(iface) if iface.starts_with(VPN_INTERFACE_PREFIX) => {
                let has_resolver = !self.dns_servers(&iface).is_empty();
                if has_resolver {
                    info!("VPN detected: default route on {}", iface);
                } else {
                    debug!("Tunnel {} has no resolver entry, not treating as VPN", iface);
                }
                has_resolver
            }
            Some(iface) => {
                debug!("No VPN: default route on {}", iface);
                false
            }
            None => {
                debug!("No default route interface found");
                false
            }
        }
    }

    /// Capture a full snapshot for one evaluation. Returns `None` only
    /// when the primary service cannot be determined at all.
    fn snapshot(&self) -> Option<NetworkSnapshot> {
        let primary = self.primary_service()?;
        let vpn_active = self.vpn_active();
        Some(NetworkSnapshot {
            ssid: self.current_ssid(),
            dns_servers: self.dns_servers(&primary.interface),
            search_domains: self.search_domains(&primary.interface),
            service_name: primary.service_name,
            interface: Some(primary.interface),
            service_id: primary.service_id,
            vpn_active,
        })
    }
}

/// Production probe shelling out to `scutil` and friends.
pub struct ScutilProbe<R: CommandRunner> {
    runner: R,
    cache: ProbeCache,
}

impl<R: CommandRunner> ScutilProbe<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            cache: ProbeCache::new(),
        }
    }

    /// Full `scutil --dns` output, cached for the evaluation.
    fn dns_output(&self) -> Option<String> {
        if let Some(cached) = self.cache.get("dns-output") {
            return Some(cached);
        }
        let output = self.runner.run_capture("scutil", &["--dns"])?;
        self.cache.put("dns-output", output.clone());
        Some(output)
    }

    /// `State:/Network/Global/IPv4` dictionary, cached for the evaluation.
    fn global_ipv4_state(&self) -> Option<String> {
        if let Some(cached) = self.cache.get("global-ipv4") {
            return Some(cached);
        }
        let output =
            self.runner
                .run_with_input("scutil", &[], "show State:/Network/Global/IPv4\n")?;
        self.cache.put("global-ipv4", output.clone());
        Some(output)
    }

    /// Resolver block scoped to `interface`. Multiple blocks coexist when a
    /// VPN and a physical adapter both publish resolvers.
    fn resolver_block(&self, interface: &str) -> Option<String> {
        if interface.is_empty() {
            return None;
        }
        let output = self.dns_output()?;
        let marker = format!("({})", interface);
        output
            .split("resolver #")
            .find(|block| !block.trim().is_empty() && block.contains(&marker))
            .map(|block| block.to_string())
    }

    /// Hardware port map: device -> port name.
    fn hardware_ports(&self) -> Vec<(String, String)> {
        let output = match self
            .runner
            .run_capture("networksetup", &["-listallhardwareports"])
        {
            Some(out) => out,
            None => return Vec::new(),
        };

        let mut ports = Vec::new();
        let mut port_name: Option<String> = None;
        for line in output.lines() {
            let line = line.trim();
            if let Some(name) = line.strip_prefix("Hardware Port:") {
                port_name = Some(name.trim().to_string());
            } else if let Some(device) = line.strip_prefix("Device:") {
                if let Some(name) = port_name.take() {
                    ports.push((device.trim().to_string(), name));
                }
            }
        }
        ports
    }

    /// IPv4 address of a device, if it has one.
    fn interface_ip(&self, device: &str) -> Option<String> {
        let ip = self.runner.run_capture("ipconfig", &["getifaddr", device])?;
        let ip = ip.trim().to_string();
        if IPV4_RE.is_match(&ip) {
            Some(ip)
        } else {
            None
        }
    }

    /// Resolve the configurable service underlying a VPN tunnel: prefer
    /// Ethernet, then USB LAN adapters, then any wired port, then Wi-Fi.
    fn find_configurable_service(&self) -> Option<String> {
        let active: Vec<(String, String)> = self
            .hardware_ports()
            .into_iter()
            .filter(|(device, _)| !device.starts_with(VPN_INTERFACE_PREFIX))
            .filter(|(device, _)| self.interface_ip(device).is_some())
            .collect();

        let wired: Vec<&(String, String)> = active
            .iter()
            .filter(|(_, port)| port != "Wi-Fi")
            .collect();

        if let Some((_, port)) = wired.iter().find(|(_, port)| port.contains("Ethernet")) {
            debug!("Using active Ethernet service: {}", port);
            return Some(port.clone());
        }
        if let Some((_, port)) = wired.iter().find(|(_, port)| USB_LAN_RE.is_match(port)) {
            debug!("Using active USB LAN service: {}", port);
            return Some(port.clone());
        }
        if let Some((_, port)) = wired.first() {
            info!("Using first active wired service: {}", port);
            return Some(port.clone());
        }

        if active.iter().any(|(_, port)| port == "Wi-Fi") {
            debug!("Using active Wi-Fi service");
            return Some("Wi-Fi".to_string());
        }

        // Last resort: pick a known service from networksetup's list.
        let services = self.list_services();
        for preferred in ["Wi-Fi", "Ethernet"] {
            if services.iter().any(|s| s == preferred) {
                info!("Final fallback to {}", preferred);
                return Some(preferred.to_string());
            }
        }

        debug!("Could not find any suitable configurable service");
        None
    }

    /// Configured service names from `networksetup -listallnetworkservices`.
    /// The first line is a banner; disabled services are prefixed with '*'.
    fn list_services(&self) -> Vec<String> {
        match self
            .runner
            .run_capture("networksetup", &["-listallnetworkservices"])
        {
            Some(output) => output
                .lines()
                .skip(1)
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('*'))
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        }
    }

    /// User-facing service name for a service ID, with a generated fallback.
    fn service_display_name(&self, service_id: &str, interface: &str) -> String {
        let query = format!("show Setup:/Network/Service/{}\n", service_id);
        if let Some(output) = self.runner.run_with_input("scutil", &[], &query) {
            if let Some(cap) = USER_DEFINED_NAME_RE.captures(&output) {
                return cap[1].trim().to_string();
            }
        }
        generate_service_name(service_id, interface)
    }
}

/// Generate a reasonable service name when the OS has none on record.
fn generate_service_name(service_id: &str, interface: &str) -> String {
    let id = service_id.to_lowercase();
    if id.contains("cisco") {
        "Cisco AnyConnect".to_string()
    } else if id.contains("vpn") {
        "VPN".to_string()
    } else if id.contains("wifi") || interface.starts_with("en") {
        "Wi-Fi".to_string()
    } else if id.contains("ethernet") {
        "Ethernet".to_string()
    } else {
        format!("Interface {}", interface)
    }
}

impl<R: CommandRunner> NetworkInfoSource for ScutilProbe<R> {
    fn current_ssid(&self) -> Option<String> {
        let device = self
            .hardware_ports()
            .into_iter()
            .find(|(_, port)| port == "Wi-Fi")
            .map(|(device, _)| device)?;

        let summary = self.runner.run_capture("ipconfig", &["getsummary", &device])?;
        let ssid = SSID_RE.captures(&summary).map(|cap| cap[1].trim().to_string())?;
        if ssid.is_empty() || ssid == "<redacted>" {
            None
        } else {
            Some(ssid)
        }
    }

    fn primary_service(&self) -> Option<PrimaryService> {
        let state = self.global_ipv4_state()?;
        let interface = PRIMARY_INTERFACE_RE
            .captures(&state)
            .map(|cap| cap[1].to_string())?;
        let service_id = PRIMARY_SERVICE_RE
            .captures(&state)
            .map(|cap| cap[1].to_string());

        // For tunnel routes, DNS/proxy changes must target the underlying
        // physical adapter, not the ephemeral utun interface.
        let service_name = if interface.starts_with(VPN_INTERFACE_PREFIX) {
            let underlying = self.find_configurable_service();
            if let Some(ref name) = underlying {
                debug!("VPN route detected, using underlying service: {}", name);
            }
            underlying
        } else {
            service_id
                .as_deref()
                .map(|id| self.service_display_name(id, &interface))
        };

        Some(PrimaryService {
            service_name,
            interface,
            service_id,
        })
    }

    fn dns_servers(&self, interface: &str) -> Vec<String> {
        let block = match self.resolver_block(interface) {
            Some(block) => block,
            None => return Vec::new(),
        };
        let servers: Vec<String> = NAMESERVER_RE
            .captures_iter(&block)
            .map(|cap| cap[1].to_string())
            .collect();
        if !servers.is_empty() {
            debug!("Found DNS servers for '{}': {:?}", interface, servers);
        }
        servers
    }

    fn search_domains(&self, interface: &str) -> Vec<String> {
        let block = match self.resolver_block(interface) {
            Some(block) => block,
            None => return Vec::new(),
        };
        let domains: Vec<String> = SEARCH_DOMAIN_RE
            .captures_iter(&block)
            .map(|cap| cap[1].to_string())
            .collect();
        if !domains.is_empty() {
            debug!("Found {} search domains for '{}'", domains.len(), interface);
        }
        domains
    }

    fn default_route_interface(&self) -> Option<String> {
        if let Some(state) = self.global_ipv4_state() {
            if let Some(cap) = PRIMARY_INTERFACE_RE.captures(&state) {
                return Some(cap[1].to_string());
            }
        }

        // scutil state can be briefly absent while the network reconfigures;
        // fall back to the routing table.
        debug!("Falling back to netstat for default route");
        let output = self.runner.run_capture("netstat", &["-rn", "-f", "inet"])?;
        for line in output.lines() {
            if line.starts_with("default") || line.starts_with("0/0") {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() >= 4 {
                    return parts.last().map(|s| s.to_string());
                }
            }
        }
        None
    }

    fn active_services(&self, include_vpn: bool) -> Vec<ActiveService> {
        let mut active = Vec::new();
        for service in self.list_services() {
            let info = match self.runner.run_capture("networksetup", &["-getinfo", &service]) {
                Some(info) => info,
                None => continue,
            };
            let device = match DEVICE_RE.captures(&info) {
                Some(cap) => cap[1].to_string(),
                None => continue,
            };
            if !include_vpn && device.starts_with(VPN_INTERFACE_PREFIX) {
                continue;
            }
            if self.interface_ip(&device).is_some() {
                debug!("Active service: {} ({})", service, device);
                active.push(ActiveService { service, device });
            }
        }
        active
    }

    fn invalidate(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
pub mod testing {
    //! Canned-state probe for matcher/applier/reactor tests.

    use super::*;
    use crate::network::snapshot::NetworkSnapshot;

    #[derive(Default)]
    pub struct FakeProbe {
        pub snapshot: NetworkSnapshot,
        pub services: Vec<ActiveService>,
    }

    impl NetworkInfoSource for FakeProbe {
        fn current_ssid(&self) -> Option<String> {
            self.snapshot.ssid.clone()
        }

        fn primary_service(&self) -> Option<PrimaryService> {
            let interface = self.snapshot.interface.clone()?;
            Some(PrimaryService {
                service_name: self.snapshot.service_name.clone(),
                interface,
                service_id: self.snapshot.service_id.clone(),
            })
        }

        fn dns_servers(&self, _interface: &str) -> Vec<String> {
            self.snapshot.dns_servers.clone()
        }

        fn search_domains(&self, _interface: &str) -> Vec<String> {
            self.snapshot.search_domains.clone()
        }

        fn default_route_interface(&self) -> Option<String> {
            self.snapshot.interface.clone()
        }

        fn vpn_active(&self) -> bool {
            self.snapshot.vpn_active
        }

        fn active_services(&self, _include_vpn: bool) -> Vec<ActiveService> {
            self.services.clone()
        }

        fn invalidate(&self) {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::RecordingRunner;

    const DNS_OUTPUT: &str = "\
DNS configuration

resolver #1
  search domain[0] : corp.example.com
  search domain[1] : lab.example.com
  nameserver[0] : 10.0.0.1
  nameserver[1] : 10.0.0.2
  if_index : 14 (en0)
  flags    : Request A records

resolver #2
  nameserver[0] : 192.0.2.53
  if_index : 22 (utun4)
  flags    : Supplemental, Request A records
";

    fn probe_with_dns() -> ScutilProbe<RecordingRunner> {
        let runner = RecordingRunner::new().with_response("scutil --dns", DNS_OUTPUT);
        ScutilProbe::new(runner)
    }

    #[test]
    fn test_resolver_block_selects_matching_interface() {
        let probe = probe_with_dns();
        assert_eq!(
            probe.dns_servers("en0"),
            vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]
        );
        assert_eq!(probe.dns_servers("utun4"), vec!["192.0.2.53".to_string()]);
        assert!(probe.dns_servers("en5").is_empty());
    }

    #[test]
    fn test_search_domains_parsed_per_interface() {
        let probe = probe_with_dns();
        assert_eq!(
            probe.search_domains("en0"),
            vec!["corp.example.com".to_string(), "lab.example.com".to_string()]
        );
        assert!(probe.search_domains("utun4").is_empty());
    }

    #[test]
    fn test_dns_output_is_cached_within_cycle() {
        let probe = probe_with_dns();
        probe.dns_servers("en0");
        probe.dns_servers("en0");
        probe.search_domains("en0");
        let dns_calls = probe
            .runner
            .recorded()
            .iter()
            .filter(|c| c.as_str() == "scutil --dns")
            .count();
        assert_eq!(dns_calls, 1);
    }

    #[test]
    fn test_primary_service_from_global_state() {
        let runner = RecordingRunner::new().with_response(
            "scutil",
            "<dictionary> {\n  PrimaryInterface : en0\n  PrimaryService : ABC-123\n  Router : 192.168.1.1\n}",
        );
        let probe = ScutilProbe::new(runner);
        let primary = probe.primary_service().unwrap();
        assert_eq!(primary.interface, "en0");
        assert_eq!(primary.service_id.as_deref(), Some("ABC-123"));
    }

    #[test]
    fn test_vpn_active_requires_resolver_entry() {
        // Tunnel owns the route and has a resolver block: VPN.
        let runner = RecordingRunner::new()
            .with_response("scutil", "  PrimaryInterface : utun4\n  PrimaryService : VPN-1")
            .with_response("scutil --dns", DNS_OUTPUT);
        let probe = ScutilProbe::new(runner);
        assert!(probe.vpn_active());

        // Tunnel without a resolver block (relay-style): not a VPN.
        let runner = RecordingRunner::new()
            .with_response("scutil", "  PrimaryInterface : utun9\n  PrimaryService : X")
            .with_response("scutil --dns", DNS_OUTPUT);
        let probe = ScutilProbe::new(runner);
        assert!(!probe.vpn_active());

        // Physical interface: not a VPN.
        let runner = RecordingRunner::new()
            .with_response("scutil", "  PrimaryInterface : en0\n  PrimaryService : A");
        let probe = ScutilProbe::new(runner);
        assert!(!probe.vpn_active());
    }

    #[test]
    fn test_current_ssid_parses_ipconfig_summary() {
        let runner = RecordingRunner::new()
            .with_response(
                "networksetup -listallhardwareports",
                "Hardware Port: Wi-Fi\nDevice: en0\nEthernet Address: aa:bb:cc:dd:ee:ff\n",
            )
            .with_response(
                "ipconfig getsummary en0",
                "<dictionary> {\n  BSSID : aa:bb:cc\n  SSID : CorpWiFi\n  Security : WPA2\n}",
            );
        let probe = ScutilProbe::new(runner);
        assert_eq!(probe.current_ssid().as_deref(), Some("CorpWiFi"));
    }

    #[test]
    fn test_ssid_none_without_wifi_hardware() {
        let runner = RecordingRunner::new().with_response(
            "networksetup -listallhardwareports",
            "Hardware Port: Ethernet\nDevice: en5\n",
        );
        let probe = ScutilProbe::new(runner);
        assert_eq!(probe.current_ssid(), None);
    }

    #[test]
    fn test_active_services_excludes_tunnels() {
        let runner = RecordingRunner::new()
            .with_response(
                "networksetup -listallnetworkservices",
                "An asterisk (*) denotes that a network service is disabled.\nWi-Fi\nVPN Tunnel\n*Bluetooth PAN\n",
            )
            .with_response("networksetup -getinfo Wi-Fi", "Device: en0\nIP address: 192.168.1.2")
            .with_response("networksetup -getinfo VPN Tunnel", "Device: utun4")
            .with_response("ipconfig getifaddr en0", "192.168.1.2")
            .with_response("ipconfig getifaddr utun4", "10.8.0.2");
        let probe = ScutilProbe::new(runner);
        let services = probe.active_services(false);
        assert_eq!(
            services,
            vec![ActiveService {
                service: "Wi-Fi".to_string(),
                device: "en0".to_string()
            }]
        );
    }

    #[test]
    fn test_generate_service_name_fallbacks() {
        assert_eq!(generate_service_name("com.cisco.anyconnect", "utun4"), "Cisco AnyConnect");
        assert_eq!(generate_service_name("some-vpn-service", "utun0"), "VPN");
        assert_eq!(generate_service_name("ABC-123", "en0"), "Wi-Fi");
        assert_eq!(generate_service_name("ABC-123", "bridge0"), "Interface bridge0");
    }
}

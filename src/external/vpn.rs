// NetLocator - VPN Client Details
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Human-readable VPN connection details for display.
//!
//! Currently knows the Cisco Secure Client / AnyConnect CLI. The result
//! is feedback only; location matching never consults it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

use crate::command::CommandRunner;

static SERVER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)server address:\s*(.+)").unwrap());
static PROTOCOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)protocol:\s*(.+)").unwrap());
static CLIENT_IP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)client address \(ipv4\):\s*(.+)").unwrap());

const CISCO_BINARY_PATHS: [&str; 4] = [
    "/opt/cisco/secureclient/bin/vpn",
    "/opt/cisco/anyconnect/bin/vpn",
    "/Applications/Cisco/Cisco AnyConnect Secure Mobility Client.app/Contents/MacOS/Cisco AnyConnect Secure Mobility Client",
    "/Applications/Cisco/Cisco Secure Client.app/Contents/MacOS/Cisco Secure Client",
];

/// Connection details for a known VPN client, keyed off the primary
/// service ID. Returns `None` for unknown clients or when disconnected.
pub fn vpn_details(runner: &dyn CommandRunner, service_id: Option<&str>) -> Option<String> {
    let service_id = service_id?;
    if service_id.to_lowercase().contains("com.cisco") {
        return cisco_details(runner);
    }
    debug!("No VPN client auto-detection available for {}", service_id);
    None
}

fn find_cisco_binary() -> Option<&'static str> {
    CISCO_BINARY_PATHS
        .into_iter()
        .find(|path| Path::new(path).exists())
}

fn cisco_details(runner: &dyn CommandRunner) -> Option<String> {
    let binary = match find_cisco_binary() {
        Some(binary) => binary,
        None => {
            debug!("Cisco VPN detected but no CLI binary found");
            return None;
        }
    };

    let stats = runner.run_capture(binary, &["stats"])?;
    if stats.contains("state: Disconnected") {
        info!("Cisco VPN is disconnected");
        return None;
    }

    Some(format_cisco_stats(&stats))
}

fn format_cisco_stats(stats: &str) -> String {
    let server = SERVER_RE
        .captures(stats)
        .map(|cap| cap[1].trim().to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let vpn_ip = CLIENT_IP_RE
        .captures(stats)
        .map(|cap| cap[1].trim().to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let mut parts = vec![format!("VPN Connected to {}", server), format!("IP: {}", vpn_ip)];
    if let Some(cap) = PROTOCOL_RE.captures(stats) {
        parts.push(format!("Protocol: {}", cap[1].trim()));
    }

    info!("Cisco VPN details: {}", parts.join(", "));
    parts.join("\n")
}

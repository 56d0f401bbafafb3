// NetLocator - Network Module
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Network state detection and configuration.
//!
//! - Probe: read-only queries (SSID, primary service, DNS, VPN status)
//! - Configure: OS mutation via `networksetup`/`systemsetup`/`lpadmin`/`sntp`
//! - Proxy: proxy URL classification and the PAC resolver seam
//! - Shell env: proxy environment files for terminal sessions

pub mod configure;
pub mod probe;
pub mod proxy;
pub mod shell_env;
pub mod snapshot;

pub use probe::ScutilProbe;
pub use shell_env::ShellEnvWriter;
pub use snapshot::NetworkSnapshot;

/// Prefix of macOS VPN tunnel interfaces (utun0, utun1, ...).
pub const VPN_INTERFACE_PREFIX: &str = "utun";

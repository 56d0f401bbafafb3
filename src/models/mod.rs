// NetLocator - Shared Models
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Shared types and constants for NetLocator.
//!
//! - **Config**: TOML-backed settings and location profiles
//! - **Error**: shared error types
//!
//! ## Design Principles
//!
//! 1. **Best-effort convergence**: apply paths never abort on first failure
//! 2. **Declaration order matters**: location iteration follows the config file
//! 3. **Serializable**: all persisted types round-trip through TOML

pub mod config;
pub mod error;

pub use config::{Config, LocationProfile, Settings, DEFAULT_LOCATION};
pub use error::{Error, Result};

/// Human-readable application name.
pub const APP_NAME: &str = "NetLocator";

/// Configuration directory name (under XDG_CONFIG_HOME / ~/.config).
pub const CONFIG_DIR_NAME: &str = "netlocator";

/// Well-known public time server used as the NTP default.
pub const DEFAULT_NTP_SERVER: &str = "time.apple.com";

/// Log file name under ~/Library/Logs.
pub const LOG_FILE_NAME: &str = "netlocator.log";

/// Directory holding per-domain resolver override files.
pub const RESOLVER_DIR: &str = "/etc/resolver";

/// Returns the log directory (`~/Library/Logs`), falling back to the
/// working directory when no home is available.
pub fn log_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .map(|h| h.join("Library").join("Logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("."))
}

// NetLocator - Configuration Model
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Configuration model: process-wide settings plus named location profiles.
//!
//! The configuration is a TOML file at `~/.config/netlocator/config.toml`.
//! Locations are kept in an [`IndexMap`] because the matcher tie-breaks on
//! declaration order; sorting the table would change matching behavior.
//!
//! Two legacy shapes are tolerated on load:
//! - the old `domains` key maps onto `dns_search_domains`
//! - SSIDs persisted as a list of single-character strings are joined back

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use super::{Error, Result, DEFAULT_NTP_SERVER};

/// Name of the fallback/template location.
pub const DEFAULT_LOCATION: &str = "default";

/// One configured network environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationProfile {
    /// Wi-Fi network names that identify this location.
    #[serde(default, deserialize_with = "deserialize_ssids")]
    pub ssids: Vec<String>,

    /// DNS servers to set; empty defers to DHCP.
    #[serde(default)]
    pub dns_servers: Vec<String>,

    /// DNS search domains.
    #[serde(default, alias = "domains")]
    pub dns_search_domains: Vec<String>,

    /// Empty, a direct `scheme://host:port`, or a PAC/WPAD URL.
    #[serde(default)]
    pub proxy_url: String,

    /// System printer name; empty leaves the default printer alone.
    #[serde(default)]
    pub printer: String,

    /// NTP server hostname.
    #[serde(default = "default_ntp_server")]
    pub ntp_server: String,
}

impl Default for LocationProfile {
    fn default() -> Self {
        Self {
            ssids: Vec::new(),
            dns_servers: Vec::new(),
            dns_search_domains: Vec::new(),
            proxy_url: String::new(),
            printer: String::new(),
            ntp_server: default_ntp_server(),
        }
    }
}

impl LocationProfile {
    /// Whether this profile carries a proxy configuration.
    pub fn has_proxy(&self) -> bool {
        !self.proxy_url.is_empty()
    }

    /// Whether the NTP server differs from the public default.
    pub fn has_custom_ntp(&self) -> bool {
        !self.ntp_server.is_empty() && self.ntp_server != DEFAULT_NTP_SERVER
    }
}

fn default_ntp_server() -> String {
    DEFAULT_NTP_SERVER.to_string()
}

/// Repair SSID lists persisted as lists of single-character strings.
fn deserialize_ssids<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SsidEntry {
        Text(String),
        Chars(Vec<String>),
    }

    let entries = Vec::<SsidEntry>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|e| match e {
            SsidEntry::Text(s) => s,
            SsidEntry::Chars(chars) => chars.concat(),
        })
        .collect())
}

/// Process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable debug logging.
    #[serde(default)]
    pub debug: bool,

    /// Quiet period after a network change before evaluating.
    #[serde(default = "default_debounce_seconds")]
    pub debounce_seconds: u64,

    /// Regenerate shell proxy environment files on apply.
    #[serde(default = "default_true")]
    pub shell_proxy_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            debounce_seconds: default_debounce_seconds(),
            shell_proxy_enabled: true,
        }
    }
}

fn default_debounce_seconds() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

/// Full application configuration: settings plus the location table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    /// Location name -> profile, in declaration order.
    #[serde(default)]
    pub locations: IndexMap<String, LocationProfile>,
}

impl Default for Config {
    fn default() -> Self {
        let mut locations = IndexMap::new();
        locations.insert(DEFAULT_LOCATION.to_string(), LocationProfile::default());
        Self {
            settings: Settings::default(),
            locations,
        }
    }
}

impl Config {
    /// Path to the configuration file.
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(super::CONFIG_DIR_NAME)
            .join("config.toml")
    }

    /// Load the configuration, writing a fresh default file if none exists.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    /// Load from a specific path (split out for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigReadFailed(e.to_string()))?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    /// Save to a specific path with restrictive permissions (0600).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::ConfigWriteFailed(e.to_string()))?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| Error::ConfigWriteFailed(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
        }
        Ok(())
    }

    /// Get a location profile by name.
    pub fn location(&self, name: &str) -> Option<&LocationProfile> {
        self.locations.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_default_location() {
        let config = Config::default();
        assert!(config.location(DEFAULT_LOCATION).is_some());
        assert_eq!(config.settings.debounce_seconds, 5);
        assert!(config.settings.shell_proxy_enabled);
    }

    #[test]
    fn test_locations_preserve_declaration_order() {
        let toml = r#"
            [locations.Office]
            ssids = ["CorpWiFi"]

            [locations.Home]
            ssids = ["HomeNet"]

            [locations.default]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let names: Vec<&str> = config.locations.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Office", "Home", "default"]);
    }

    #[test]
    fn test_legacy_domains_key_migrates() {
        let toml = r#"
            [locations.Office]
            domains = ["corp.example.com"]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.locations["Office"].dns_search_domains,
            vec!["corp.example.com"]
        );
    }

    #[test]
    fn test_malformed_ssid_char_list_repaired() {
        let toml = r#"
            [locations.Office]
            ssids = [["C", "o", "r", "p"], "Guest"]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.locations["Office"].ssids, vec!["Corp", "Guest"]);
    }

    #[test]
    fn test_missing_config_written_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert!(config.location(DEFAULT_LOCATION).is_some());

        // Round-trips cleanly
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.locations.len(), config.locations.len());
    }

    #[test]
    fn test_profile_heuristics() {
        let mut profile = LocationProfile::default();
        assert!(!profile.has_proxy());
        assert!(!profile.has_custom_ntp());

        profile.proxy_url = "http://proxy.example.com:8080".to_string();
        profile.ntp_server = "time.example.com".to_string();
        assert!(profile.has_proxy());
        assert!(profile.has_custom_ntp());
    }
}

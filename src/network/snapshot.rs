// NetLocator - Network Snapshot & Probe Cache
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Transient network state captured for a single evaluation, and a
//! short-lived cache for the raw OS query output backing it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// The inputs to location matching, captured once per evaluation cycle.
#[derive(Debug, Clone, Default)]
pub struct NetworkSnapshot {
    /// Active Wi-Fi network name, if associated.
    pub ssid: Option<String>,
    /// Human-facing name of the primary (or underlying) network service.
    pub service_name: Option<String>,
    /// Primary interface (e.g., "en0"); may be a tunnel when a VPN owns the route.
    pub interface: Option<String>,
    /// Opaque service identifier from the OS configuration store.
    pub service_id: Option<String>,
    /// DNS servers of the primary interface's resolver block.
    pub dns_servers: Vec<String>,
    /// Search domains of the primary interface's resolver block.
    pub search_domains: Vec<String>,
    /// Whether the default route resolves to an active VPN tunnel.
    pub vpn_active: bool,
}

/// How long cached probe output stays valid. Longer than any single
/// evaluation; the reactor clears the cache at cycle boundaries anyway.
const CACHE_TTL: Duration = Duration::from_secs(30);

/// Caches raw command output (e.g., `scutil --dns`) so repeated probes
/// within one evaluation do not re-run the same OS queries.
///
/// Owned by the probe instance, never process-global, so evaluation
/// cycles stay independently testable.
#[derive(Default)]
pub struct ProbeCache {
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, String>,
    stamp: Option<Instant>,
}

impl ProbeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a cached value if the cache is still fresh.
    pub fn get(&self, key: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let fresh = inner
            .stamp
            .map(|s| s.elapsed() < CACHE_TTL)
            .unwrap_or(false);
        if !fresh {
            return None;
        }
        inner.entries.get(key).cloned()
    }

    /// Store a value, resetting the cache first if it has gone stale.
    pub fn put(&self, key: &str, value: String) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let fresh = inner
            .stamp
            .map(|s| s.elapsed() < CACHE_TTL)
            .unwrap_or(false);
        if !fresh {
            inner.entries.clear();
            inner.stamp = Some(Instant::now());
            debug!("Probe cache initialized");
        }
        inner.entries.insert(key.to_string(), value);
    }

    /// Explicitly drop everything (called at cycle start/end).
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if !inner.entries.is_empty() {
            debug!("Probe cache cleared");
        }
        inner.entries.clear();
        inner.stamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_round_trip() {
        let cache = ProbeCache::new();
        assert_eq!(cache.get("dns"), None);
        cache.put("dns", "resolver #1".to_string());
        assert_eq!(cache.get("dns").as_deref(), Some("resolver #1"));
    }

    #[test]
    fn test_clear_invalidates() {
        let cache = ProbeCache::new();
        cache.put("dns", "resolver #1".to_string());
        cache.clear();
        assert_eq!(cache.get("dns"), None);
    }
}

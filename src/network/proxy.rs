// NetLocator - Proxy Classification
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Proxy URL classification and the PAC resolver seam.
//!
//! A location's `proxy_url` is either a PAC/WPAD script URL (applied via
//! auto-proxy configuration) or a manual endpoint whose scheme decides
//! which proxy state it drives.

use tracing::debug;

/// Default port per manual proxy scheme.
pub const DEFAULT_HTTP_PORT: u16 = 80;
pub const DEFAULT_HTTPS_PORT: u16 = 443;
pub const DEFAULT_SOCKS_PORT: u16 = 1080;

/// A parsed manual proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyUrl {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl ProxyUrl {
    /// Parse `scheme://host[:port][/path]`. Returns `None` when no scheme
    /// or host can be extracted; callers treat that as a PAC URL.
    pub fn parse(url: &str) -> Option<Self> {
        let (scheme, rest) = url.split_once("://")?;
        let scheme = scheme.to_ascii_lowercase();
        let authority = rest.split(['/', '?', '#']).next()?;
        // Strip any userinfo; credentials are not usable via networksetup.
        let authority = authority.rsplit('@').next()?;
        if authority.is_empty() {
            return None;
        }

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port_str)) => {
                let port = port_str.parse::<u16>().ok()?;
                (host, Some(port))
            }
            None => (authority, None),
        };
        if host.is_empty() {
            return None;
        }

        let port = match port {
            Some(port) => port,
            None => match scheme.as_str() {
                "http" => DEFAULT_HTTP_PORT,
                "https" => DEFAULT_HTTPS_PORT,
                "socks" => DEFAULT_SOCKS_PORT,
                _ => 0,
            },
        };

        Some(Self {
            scheme,
            host: host.to_string(),
            port,
        })
    }
}

/// True for URLs that point at a proxy auto-config script rather than a
/// proxy endpoint.
pub fn is_pac_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://"))
        && (lower.contains(".pac") || lower.contains("/wpad.dat"))
}

/// Outcome of resolving a PAC script against a target URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedProxy {
    /// Connect directly, no proxy.
    Direct,
    /// Use the given proxy endpoint.
    Proxy(ProxyUrl),
}

/// Resolves a PAC script to a concrete proxy decision.
///
/// System proxy application never needs this (the OS evaluates PAC files
/// itself); it exists for shell environment generation, where a concrete
/// endpoint is required.
pub trait PacResolver: Send + Sync {
    fn resolve(&self, pac_url: &str) -> ResolvedProxy;
}

/// Resolver that never evaluates PAC scripts. Shell environment files
/// then omit proxy variables for PAC-based locations.
pub struct NoPacResolver;

impl PacResolver for NoPacResolver {
    fn resolve(&self, pac_url: &str) -> ResolvedProxy {
        debug!("PAC evaluation not available for {}, assuming direct", pac_url);
        ResolvedProxy::Direct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_explicit_port() {
        let proxy = ProxyUrl::parse("http://proxy.corp.example.com:8080").unwrap();
        assert_eq!(proxy.scheme, "http");
        assert_eq!(proxy.host, "proxy.corp.example.com");
        assert_eq!(proxy.port, 8080);
    }

    #[test]
    fn test_parse_default_ports() {
        assert_eq!(ProxyUrl::parse("http://p.example.com").unwrap().port, 80);
        assert_eq!(ProxyUrl::parse("https://p.example.com").unwrap().port, 443);
        assert_eq!(ProxyUrl::parse("socks://p.example.com").unwrap().port, 1080);
    }

    #[test]
    fn test_parse_strips_path_and_userinfo() {
        let proxy = ProxyUrl::parse("http://user:pw@p.example.com:3128/ignored").unwrap();
        assert_eq!(proxy.host, "p.example.com");
        assert_eq!(proxy.port, 3128);
    }

    #[test]
    fn test_parse_rejects_schemeless() {
        assert_eq!(ProxyUrl::parse("proxy.example.com:8080"), None);
        assert_eq!(ProxyUrl::parse("http://"), None);
    }

    #[test]
    fn test_pac_url_detection() {
        assert!(is_pac_url("http://proxy.corp.example.com/proxy.pac"));
        assert!(is_pac_url("https://corp.example.com/WPAD.DAT"));
        assert!(!is_pac_url("http://proxy.corp.example.com:8080"));
        assert!(!is_pac_url("file:///etc/proxy.pac"));
    }
}

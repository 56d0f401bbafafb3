// NetLocator - Shell Proxy Environment
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Proxy environment files for terminal sessions.
//!
//! Terminal programs do not read the system proxy settings, so for each
//! apply pass a set of shell-syntax files (`proxy.env.sh`, `proxy.env.csh`,
//! `proxy.env.fish`) is regenerated under the config directory. Shell rc
//! files can source them to pick up the active proxy.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::command::CommandRunner;
use crate::models::{Result, CONFIG_DIR_NAME, RESOLVER_DIR};
use crate::network::proxy::{self, PacResolver, ProxyUrl, ResolvedProxy};

/// Environment variables describing the active proxy for shells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEnv {
    /// Proxy URL used for http/https/ftp/all variables.
    pub proxy_url: String,
    /// `host:port` form for rsync, which takes no scheme.
    pub rsync_proxy: String,
    /// Comma-separated bypass list for no_proxy.
    pub no_proxy: String,
}

/// Builds and writes shell proxy environment files.
pub struct ShellEnvWriter<'a> {
    config_dir: PathBuf,
    pac_resolver: &'a dyn PacResolver,
}

impl<'a> ShellEnvWriter<'a> {
    pub fn new(pac_resolver: &'a dyn PacResolver) -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME);
        Self {
            config_dir,
            pac_resolver,
        }
    }

    #[cfg(test)]
    pub fn with_config_dir(pac_resolver: &'a dyn PacResolver, config_dir: PathBuf) -> Self {
        Self {
            config_dir,
            pac_resolver,
        }
    }

    /// Build the environment for a location's proxy URL, or `None` when
    /// no proxy applies (empty URL, or a PAC script that resolves direct).
    pub fn build_env(
        &self,
        proxy_url: &str,
        search_domains: &[String],
        hostname: Option<&str>,
    ) -> Option<ProxyEnv> {
        if proxy_url.is_empty() || proxy_url == "none" {
            return None;
        }

        let endpoint = if proxy::is_pac_url(proxy_url) {
            match self.pac_resolver.resolve(proxy_url) {
                ResolvedProxy::Proxy(parsed) => {
                    format!("{}://{}:{}", parsed.scheme, parsed.host, parsed.port)
                }
                ResolvedProxy::Direct => {
                    debug!("PAC script resolved to direct connection, no shell proxy");
                    return None;
                }
            }
        } else if proxy_url.contains("://") {
            proxy_url.to_string()
        } else {
            format!("http://{}", proxy_url)
        };

        let rsync_proxy = match ProxyUrl::parse(&endpoint) {
            Some(parsed) => format!("{}:{}", parsed.host, parsed.port),
            None => endpoint
                .trim_start_matches("http://")
                .trim_start_matches("https://")
                .to_string(),
        };

        Some(ProxyEnv {
            proxy_url: endpoint,
            rsync_proxy,
            no_proxy: bypass_list(search_domains, hostname),
        })
    }

    /// Write (or remove, when `env` is `None`) the proxy environment files
    /// for every supported shell family.
    pub fn write_all(&self, env: Option<&ProxyEnv>) -> Result<()> {
        self.write_one("proxy.env.sh", env.map(render_sh))?;
        self.write_one("proxy.env.csh", env.map(render_csh))?;
        self.write_one("proxy.env.fish", env.map(render_fish))?;
        match env {
            Some(env) => info!("Updated shell proxy environment: {}", env.proxy_url),
            None => info!("Cleared shell proxy environment"),
        }
        Ok(())
    }

    /// Remove all proxy environment files, ignoring missing ones.
    pub fn cleanup(&self) {
        for name in ["proxy.env.sh", "proxy.env.csh", "proxy.env.fish"] {
            let path = self.config_dir.join(name);
            if path.exists() {
                if let Err(e) = fs::remove_file(&path) {
                    warn!("Failed to remove {}: {}", path.display(), e);
                } else {
                    debug!("Removed proxy file: {}", path.display());
                }
            }
        }
    }

    fn write_one(&self, name: &str, content: Option<String>) -> Result<()> {
        let path = self.config_dir.join(name);
        match content {
            Some(content) => {
                fs::create_dir_all(&self.config_dir)?;
                // Write-then-rename so a sourcing shell never sees a
                // half-written file.
                let temp = path.with_extension("tmp");
                fs::write(&temp, content)?;
                fs::rename(&temp, &path)?;
                debug!("Updated shell proxy environment file: {}", path.display());
            }
            None => {
                if path.exists() {
                    fs::remove_file(&path)?;
                    debug!("Removed shell proxy environment file: {}", path.display());
                }
            }
        }
        Ok(())
    }
}

/// Assemble the no_proxy bypass list: standard local addresses, the host's
/// own name, any resolver override domains, and the location's search
/// domains (deduplicated, order preserved).
fn bypass_list(search_domains: &[String], hostname: Option<&str>) -> String {
    let mut bypasses: Vec<String> = vec![
        "localhost".to_string(),
        "127.0.0.1".to_string(),
        "*.local".to_string(),
        "169.254/16".to_string(),
    ];
    if let Some(hostname) = hostname {
        if !hostname.is_empty() {
            bypasses.push(hostname.to_string());
        }
    }
    for domain in resolver_override_domains(Path::new(RESOLVER_DIR)) {
        if !bypasses.contains(&domain) {
            bypasses.push(domain);
        }
    }
    for domain in search_domains {
        if !domain.is_empty() && !bypasses.contains(domain) {
            bypasses.push(domain.clone());
        }
    }
    bypasses.join(",")
}

/// Domains with `/etc/resolver` override files. Unreadable directory is
/// treated as empty (it is root-owned on a default install).
fn resolver_override_domains(dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    let mut domains: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    domains.sort();
    domains
}

/// Hostname via `hostname -s`; best-effort.
pub fn local_hostname(runner: &dyn CommandRunner) -> Option<String> {
    runner
        .run_capture("hostname", &["-s"])
        .filter(|name| !name.is_empty())
}

const FILE_BANNER: &str = "# Generated by NetLocator - will be overwritten\n\
# To disable: set shell_proxy_enabled = false in the NetLocator config\n";

fn render_sh(env: &ProxyEnv) -> String {
    format!(
        "{banner}\n\
         export http_proxy=\"{url}\"\n\
         export https_proxy=\"{url}\"\n\
         export ftp_proxy=\"{url}\"\n\
         export all_proxy=\"{url}\"\n\
         export rsync_proxy=\"{rsync}\"\n\
         export no_proxy=\"{bypass}\"\n",
        banner = FILE_BANNER,
        url = env.proxy_url,
        rsync = env.rsync_proxy,
        bypass = env.no_proxy,
    )
}

fn render_csh(env: &ProxyEnv) -> String {
    format!(
        "{banner}\n\
         setenv http_proxy \"{url}\"\n\
         setenv https_proxy \"{url}\"\n\
         setenv ftp_proxy \"{url}\"\n\
         setenv all_proxy \"{url}\"\n\
         setenv HTTP_PROXY \"{url}\"\n\
         setenv HTTPS_PROXY \"{url}\"\n\
         setenv rsync_proxy \"{rsync}\"\n\
         setenv no_proxy \"{bypass}\"\n\
         setenv NO_PROXY \"{bypass}\"\n",
        banner = FILE_BANNER,
        url = env.proxy_url,
        rsync = env.rsync_proxy,
        bypass = env.no_proxy,
    )
}

fn render_fish(env: &ProxyEnv) -> String {
    format!(
        "{banner}\n\
         set -x http_proxy \"{url}\"\n\
         set -x https_proxy \"{url}\"\n\
         set -x ftp_proxy \"{url}\"\n\
         set -x all_proxy \"{url}\"\n\
         set -x HTTP_PROXY \"{url}\"\n\
         set -x HTTPS_PROXY \"{url}\"\n\
         set -x rsync_proxy \"{rsync}\"\n\
         set -x no_proxy \"{bypass}\"\n\
         set -x NO_PROXY \"{bypass}\"\n",
        banner = FILE_BANNER,
        url = env.proxy_url,
        rsync = env.rsync_proxy,
        bypass = env.no_proxy,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::proxy::NoPacResolver;
    use tempfile::TempDir;

    fn writer(dir: &TempDir) -> ShellEnvWriter<'static> {
        ShellEnvWriter::with_config_dir(&NoPacResolver, dir.path().to_path_buf())
    }

    #[test]
    fn test_build_env_manual_proxy() {
        let dir = TempDir::new().unwrap();
        let w = writer(&dir);
        let env = w
            .build_env(
                "http://proxy.corp.example.com:3128",
                &["corp.example.com".to_string()],
                Some("mymac"),
            )
            .unwrap();
        assert_eq!(env.proxy_url, "http://proxy.corp.example.com:3128");
        assert_eq!(env.rsync_proxy, "proxy.corp.example.com:3128");
        assert!(env.no_proxy.starts_with("localhost,127.0.0.1,*.local,169.254/16,mymac"));
        assert!(env.no_proxy.ends_with("corp.example.com"));
    }

    #[test]
    fn test_build_env_schemeless_gets_http() {
        let dir = TempDir::new().unwrap();
        let w = writer(&dir);
        let env = w.build_env("proxy.example.com:8080", &[], None).unwrap();
        assert_eq!(env.proxy_url, "http://proxy.example.com:8080");
        assert_eq!(env.rsync_proxy, "proxy.example.com:8080");
    }

    #[test]
    fn test_build_env_none_for_empty_and_pac_direct() {
        let dir = TempDir::new().unwrap();
        let w = writer(&dir);
        assert_eq!(w.build_env("", &[], None), None);
        assert_eq!(w.build_env("none", &[], None), None);
        // NoPacResolver resolves every PAC script to direct.
        assert_eq!(
            w.build_env("http://corp.example.com/proxy.pac", &[], None),
            None
        );
    }

    #[test]
    fn test_write_all_creates_three_files() {
        let dir = TempDir::new().unwrap();
        let w = writer(&dir);
        let env = w.build_env("http://p.example.com:3128", &[], None).unwrap();
        w.write_all(Some(&env)).unwrap();

        let sh = std::fs::read_to_string(dir.path().join("proxy.env.sh")).unwrap();
        assert!(sh.contains("export http_proxy=\"http://p.example.com:3128\""));
        assert!(sh.contains("export rsync_proxy=\"p.example.com:3128\""));

        let csh = std::fs::read_to_string(dir.path().join("proxy.env.csh")).unwrap();
        assert!(csh.contains("setenv HTTP_PROXY \"http://p.example.com:3128\""));

        let fish = std::fs::read_to_string(dir.path().join("proxy.env.fish")).unwrap();
        assert!(fish.contains("set -x http_proxy \"http://p.example.com:3128\""));
    }

    #[test]
    fn test_write_all_none_removes_files() {
        let dir = TempDir::new().unwrap();
        let w = writer(&dir);
        let env = w.build_env("http://p.example.com:3128", &[], None).unwrap();
        w.write_all(Some(&env)).unwrap();
        w.write_all(None).unwrap();
        assert!(!dir.path().join("proxy.env.sh").exists());
        assert!(!dir.path().join("proxy.env.csh").exists());
        assert!(!dir.path().join("proxy.env.fish").exists());
    }

    #[test]
    fn test_bypass_list_deduplicates() {
        let list = bypass_list(
            &["corp.example.com".to_string(), "corp.example.com".to_string()],
            None,
        );
        assert_eq!(list.matches("corp.example.com").count(), 1);
    }
}

// NetLocator - Location Matcher
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Location selection heuristics.
//!
//! Matching is a pure function of the configured profiles and the current
//! network state. Rules run as an ordered cascade; the first rule to
//! produce a location wins, and "first profile" always means first in
//! config-file declaration order. The reserved `"default"` profile never
//! matches a rule; it is only the final fallback.
//!
//! The corporate/home rules (4 and 5) are admittedly loose heuristics;
//! ties between profiles under the same rule resolve by declaration
//! order and nothing finer.

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::models::{LocationProfile, DEFAULT_LOCATION};

/// Network state inputs to one matching pass.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub ssid: Option<&'a str>,
    pub search_domains: &'a [String],
    pub vpn_active: bool,
}

type Profiles = IndexMap<String, LocationProfile>;
type SelectFn = fn(&Profiles, &MatchContext) -> Option<String>;

/// One named matching rule. A rule that does not apply to the current
/// context returns `None` and the cascade continues.
pub struct MatchRule {
    pub name: &'static str,
    select: SelectFn,
}

/// The rule cascade, in priority order.
pub const RULES: [MatchRule; 5] = [
    MatchRule {
        name: "vpn-proxy",
        select: select_vpn_proxy,
    },
    MatchRule {
        name: "ssid",
        select: select_ssid,
    },
    MatchRule {
        name: "search-domain",
        select: select_search_domain,
    },
    MatchRule {
        name: "corporate-ntp",
        select: select_corporate_ntp,
    },
    MatchRule {
        name: "home-like",
        select: select_home_like,
    },
];

/// Select the best-matching location name. Always returns a name; the
/// caller decides what to do when the name is absent from the config.
pub fn match_location(profiles: &Profiles, ctx: &MatchContext) -> String {
    debug!(
        "Location matching: VPN={}, SSID={:?}",
        ctx.vpn_active, ctx.ssid
    );

    for rule in &RULES {
        if let Some(name) = (rule.select)(profiles, ctx) {
            info!("Rule '{}' selected location '{}'", rule.name, name);
            return name;
        }
    }

    info!("No specific match found, using {}", DEFAULT_LOCATION);
    DEFAULT_LOCATION.to_string()
}

fn candidates<'a>(
    profiles: &'a Profiles,
) -> impl Iterator<Item = (&'a String, &'a LocationProfile)> {
    profiles.iter().filter(|(name, _)| *name != DEFAULT_LOCATION)
}

/// Rule 1: on VPN, the first profile carrying a proxy is the best
/// corporate-location guess.
fn select_vpn_proxy(profiles: &Profiles, ctx: &MatchContext) -> Option<String> {
    if !ctx.vpn_active {
        return None;
    }
    candidates(profiles)
        .find(|(_, profile)| profile.has_proxy())
        .map(|(name, _)| name.clone())
}

/// Rule 2: off VPN, match the associated SSID against profile SSID lists.
fn select_ssid(profiles: &Profiles, ctx: &MatchContext) -> Option<String> {
    if ctx.vpn_active {
        return None;
    }
    let ssid = ctx.ssid?;
    candidates(profiles)
        .find(|(_, profile)| profile.ssids.iter().any(|s| s == ssid))
        .map(|(name, _)| name.clone())
}

/// Rule 3: off VPN, match on any overlap between live search domains and
/// a profile's configured domains.
fn select_search_domain(profiles: &Profiles, ctx: &MatchContext) -> Option<String> {
    if ctx.vpn_active || ctx.search_domains.is_empty() {
        return None;
    }
    candidates(profiles)
        .find(|(_, profile)| {
            profile
                .dns_search_domains
                .iter()
                .any(|d| ctx.search_domains.contains(d))
        })
        .map(|(name, _)| name.clone())
}

/// Rule 4: on VPN with no proxy-bearing profile, a non-default NTP server
/// marks a profile as customized for a corporate network.
fn select_corporate_ntp(profiles: &Profiles, ctx: &MatchContext) -> Option<String> {
    if !ctx.vpn_active {
        return None;
    }
    candidates(profiles)
        .find(|(_, profile)| profile.has_custom_ntp())
        .map(|(name, _)| name.clone())
}

/// Rule 5: off VPN with nothing else matching, a profile with no proxy
/// and at most two search domains looks home-like.
fn select_home_like(profiles: &Profiles, ctx: &MatchContext) -> Option<String> {
    if ctx.vpn_active {
        return None;
    }
    candidates(profiles)
        .find(|(_, profile)| !profile.has_proxy() && profile.dns_search_domains.len() <= 2)
        .map(|(name, _)| name.clone())
}

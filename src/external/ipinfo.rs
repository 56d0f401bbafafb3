// NetLocator - Connection Details
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Public IP and geolocation lookup, for the `status` command only.
//!
//! Queries ip-api.com; any failure degrades to "N/A" fields rather than
//! an error, since this is purely informational.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

const IPINFO_API_URL: &str = "http://ip-api.com/json/?fields=query,city,regionName,countryCode,isp";
const IPINFO_TIMEOUT: Duration = Duration::from_secs(10);

/// Public connection details, all fields "N/A" when the lookup fails.
#[derive(Debug, Clone)]
pub struct ConnectionDetails {
    pub ip: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub isp: String,
}

impl Default for ConnectionDetails {
    fn default() -> Self {
        let na = || "N/A".to_string();
        Self {
            ip: na(),
            city: na(),
            region: na(),
            country: na(),
            isp: na(),
        }
    }
}

impl fmt::Display for ConnectionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}, {}) via {}",
            self.ip, self.city, self.region, self.country, self.isp
        )
    }
}

#[derive(Deserialize)]
struct IpApiResponse {
    query: Option<String>,
    city: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
    isp: Option<String>,
}

/// Fetch public IP and location details. Never fails; degraded details
/// carry "N/A" fields.
pub fn fetch_connection_details() -> ConnectionDetails {
    info!("Fetching connection details from ip-api.com");

    let response = reqwest::blocking::Client::builder()
        .timeout(IPINFO_TIMEOUT)
        .user_agent(format!("{}/1.0", crate::models::APP_NAME))
        .build()
        .and_then(|client| client.get(IPINFO_API_URL).send())
        .and_then(|resp| resp.json::<IpApiResponse>());

    match response {
        Ok(data) => {
            let na = || "N/A".to_string();
            let details = ConnectionDetails {
                ip: data.query.unwrap_or_else(na),
                city: data.city.unwrap_or_else(na),
                region: data.region_name.unwrap_or_else(na),
                country: data.country_code.unwrap_or_else(na),
                isp: data.isp.unwrap_or_else(na),
            };
            debug!("Connection details: {}", details);
            details
        }
        Err(e) => {
            debug!("Failed to fetch connection details: {}", e);
            ConnectionDetails::default()
        }
    }
}

// NetLocator - Error Types
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Shared error types for NetLocator.

use thiserror::Error;

/// Result type alias for NetLocator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for NetLocator operations.
#[derive(Debug, Error)]
pub enum Error {
    // ========================================
    // Configuration Errors
    // ========================================
    #[error("Failed to read configuration: {0}")]
    ConfigReadFailed(String),

    #[error("Failed to write configuration: {0}")]
    ConfigWriteFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParseFailed(String),

    #[error("Location not found in configuration: {0}")]
    LocationNotFound(String),

    // ========================================
    // Evaluation Errors
    // ========================================
    #[error("Could not determine network configuration")]
    NetworkStateUnavailable,

    #[error("No matching location and no 'default' location configured")]
    Unresolved,

    // ========================================
    // System Errors
    // ========================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

// Convert from toml parse errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParseFailed(err.to_string())
    }
}

// Convert from toml serialize errors
impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::ConfigWriteFailed(err.to_string())
    }
}

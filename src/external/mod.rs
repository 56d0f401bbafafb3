// NetLocator - External Collaborators
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Display-only collaborators: public connection details and VPN client
//! status. Nothing here feeds location matching.

pub mod ipinfo;
pub mod vpn;

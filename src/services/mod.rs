// NetLocator - Background Services
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Background services for the daemon mode.
//!
//! - Monitor: subscribes to OS network-configuration change notifications
//! - Reactor: debounces change bursts and drives evaluation cycles

pub mod monitor;
pub mod reactor;

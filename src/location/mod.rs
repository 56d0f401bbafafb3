// NetLocator - Location Module
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Location selection and application.
//!
//! - Matcher: ordered heuristics selecting a location from network state
//! - Applier: converges OS settings to a selected location
//! - Evaluate: the full probe -> match -> apply cycle with change detection

pub mod applier;
pub mod evaluate;
pub mod matcher;

pub use applier::LocationApplier;
pub use evaluate::{CycleResult, Evaluator};

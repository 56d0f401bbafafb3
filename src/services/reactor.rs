// NetLocator - Change Reactor
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Debounced reaction to network change notifications.
//!
//! The state machine is kept free of clocks and channels so the debounce
//! and re-entrancy rules are testable without wall-clock waits; the async
//! driver below owns the single timer slot and the event stream.
//!
//! States: `Idle` -> `Debouncing` (notification arms/resets the timer) ->
//! `Evaluating` (timer fired) -> `Idle`. Notifications arriving while an
//! evaluation runs are dropped, not queued; the next organic change
//! starts a fresh cycle.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::command::CommandRunner;
use crate::location::{CycleResult, Evaluator};
use crate::models::{Config, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorState {
    Idle,
    Debouncing,
    Evaluating,
}

/// The debounce/re-entrancy state machine.
pub struct ChangeReactor {
    state: ReactorState,
    debounce: Duration,
}

impl ChangeReactor {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: ReactorState::Idle,
            debounce,
        }
    }

    pub fn state(&self) -> ReactorState {
        self.state
    }

    /// A change notification arrived. Returns the debounce delay to
    /// (re)arm the timer with, or `None` when the notification is dropped
    /// because an evaluation is in progress.
    pub fn on_notification(&mut self) -> Option<Duration> {
        match self.state {
            ReactorState::Evaluating => {
                debug!("Network change during evaluation, dropping notification");
                None
            }
            ReactorState::Idle => {
                debug!("Network change detected, debouncing {:?}", self.debounce);
                self.state = ReactorState::Debouncing;
                Some(self.debounce)
            }
            ReactorState::Debouncing => {
                debug!("Further change during debounce, resetting timer");
                Some(self.debounce)
            }
        }
    }

    /// The debounce timer fired. Returns true when an evaluation should
    /// begin; a stale timer in any other state is ignored.
    pub fn on_timer_elapsed(&mut self) -> bool {
        if self.state == ReactorState::Debouncing {
            self.state = ReactorState::Evaluating;
            true
        } else {
            debug!("Stale debounce timer in state {:?}, ignoring", self.state);
            false
        }
    }

    /// The evaluation finished, successfully or not.
    pub fn finish_cycle(&mut self) {
        self.state = ReactorState::Idle;
    }

    /// Adopt a (possibly reloaded) debounce interval for later bursts.
    pub fn set_debounce(&mut self, debounce: Duration) {
        if self.debounce != debounce {
            debug!("Debounce interval now {:?}", debounce);
            self.debounce = debounce;
        }
    }
}

/// Drive the reactor until the notification stream closes.
///
/// The configuration is reloaded through `load_config` at each
/// evaluation so edits, including a changed `debounce_seconds`, take
/// effect without a restart. Evaluation itself is blocking subprocess
/// work and runs under `block_in_place`; notifications queued while it
/// runs are drained and dropped afterwards.
pub async fn run<R, F>(
    mut events: mpsc::Receiver<()>,
    mut evaluator: Evaluator<'_, R>,
    debounce: Duration,
    mut load_config: F,
) -> Result<()>
where
    R: CommandRunner + Copy,
    F: FnMut() -> Result<Config>,
{
    let mut reactor = ChangeReactor::new(debounce);

    // Single timer slot; `armed` gates the select arm so an unarmed
    // sleep never fires an evaluation.
    let timer = tokio::time::sleep(Duration::ZERO);
    tokio::pin!(timer);
    let mut armed = false;

    info!("Change reactor started (debounce {:?})", debounce);

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(()) => {
                        if let Some(delay) = reactor.on_notification() {
                            timer.as_mut().reset(Instant::now() + delay);
                            armed = true;
                        }
                    }
                    None => {
                        info!("Notification stream closed, reactor stopping");
                        return Ok(());
                    }
                }
            }
            () = &mut timer, if armed => {
                armed = false;
                if !reactor.on_timer_elapsed() {
                    continue;
                }

                let cycle = tokio::task::block_in_place(|| -> Result<(CycleResult, Duration)> {
                    let config = load_config()?;
                    let debounce = Duration::from_secs(config.settings.debounce_seconds);
                    Ok((evaluator.run_cycle(&config)?, debounce))
                });
                match cycle {
                    Ok((result, debounce)) => {
                        reactor.set_debounce(debounce);
                        match result {
                            CycleResult::Applied(outcome) => {
                                info!(
                                    "Applied location '{}' (VPN={})",
                                    outcome.location, outcome.vpn_active
                                );
                            }
                            CycleResult::Unchanged(outcome) => {
                                debug!("Location '{}' unchanged", outcome.location);
                            }
                        }
                    }
                    Err(e) => {
                        error!("Evaluation cycle failed: {}", e);
                    }
                }
                reactor.finish_cycle();

                // Notifications that piled up during the evaluation are
                // dropped; only fresh changes start a new cycle.
                let mut dropped = 0usize;
                while events.try_recv().is_ok() {
                    dropped += 1;
                }
                if dropped > 0 {
                    warn!("Dropped {} notifications received during evaluation", dropped);
                }
            }
        }
    }
}

// NetLocator - Network Change Monitor
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! OS network-configuration change notifications.
//!
//! A long-lived `scutil` child is driven in notification mode: watch
//! patterns are registered over stdin and every "changed key" line on
//! stdout becomes one event on the channel. The child is respawned with
//! a backoff if it exits while the receiver is still alive.

use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::models::{Error, Result};

/// Configuration store keys whose changes warrant a re-evaluation.
const WATCH_PATTERNS: [&str; 3] = [
    "State:/Network/Global/IPv4",
    "State:/Network/Global/DNS",
    "State:/Network/Interface/.*/IPv4",
];

const RESPAWN_DELAY: Duration = Duration::from_secs(5);

/// Watch for network configuration changes until the receiver closes.
pub async fn watch(tx: mpsc::Sender<()>) -> Result<()> {
    loop {
        match watch_once(&tx).await {
            Ok(()) => {}
            Err(e) => warn!("Network monitor error: {}", e),
        }

        if tx.is_closed() {
            return Ok(());
        }
        warn!("scutil watcher exited, respawning in {:?}", RESPAWN_DELAY);
        tokio::time::sleep(RESPAWN_DELAY).await;
    }
}

async fn watch_once(tx: &mpsc::Sender<()>) -> Result<()> {
    let mut child = Command::new("scutil")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    // stdin stays open for the child's lifetime; closing it would end
    // the interactive session.
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| Error::Other("scutil stdin unavailable".to_string()))?;

    let mut script = String::new();
    for pattern in WATCH_PATTERNS {
        script.push_str(&format!("n.add {} pattern\n", pattern));
    }
    script.push_str("n.watch\n");
    stdin.write_all(script.as_bytes()).await?;
    stdin.flush().await?;

    info!("Watching network configuration changes via scutil");

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Other("scutil stdout unavailable".to_string()))?;
    let mut lines = BufReader::new(stdout).lines();

    while let Some(line) = lines.next_line().await? {
        if !line.contains("changed key") {
            continue;
        }
        debug!("Network change: {}", line.trim());
        if tx.send(()).await.is_err() {
            debug!("Event receiver dropped, stopping monitor");
            break;
        }
    }

    drop(stdin);
    let _ = child.kill().await;
    Ok(())
}

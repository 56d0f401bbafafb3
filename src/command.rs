// NetLocator - Command Execution
// Copyright (C) 2026 Christos A. Daggas
// SPDX-License-Identifier: MIT

//! Subprocess execution behind a narrow trait.
//!
//! Every OS mutation and most state queries go through a [`CommandRunner`]
//! so probing and applying can be exercised in tests with a recording fake
//! instead of real `networksetup`/`scutil` invocations.

use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{debug, error};

/// Executes OS commands. All calls are synchronous and blocking.
pub trait CommandRunner: Send + Sync {
    /// Run a command, returning true on exit status 0.
    fn run(&self, program: &str, args: &[&str]) -> bool;

    /// Run a command and capture trimmed stdout; None on failure.
    fn run_capture(&self, program: &str, args: &[&str]) -> Option<String>;

    /// Run a command feeding `input` to stdin, capturing trimmed stdout.
    fn run_with_input(&self, program: &str, args: &[&str], input: &str) -> Option<String>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, program: &str, args: &[&str]) -> bool {
        (**self).run(program, args)
    }

    fn run_capture(&self, program: &str, args: &[&str]) -> Option<String> {
        (**self).run_capture(program, args)
    }

    fn run_with_input(&self, program: &str, args: &[&str], input: &str) -> Option<String> {
        (**self).run_with_input(program, args, input)
    }
}

/// Production runner backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn spawn(&self, program: &str, args: &[&str], input: Option<&str>) -> Option<std::process::Output> {
        debug!("Running command: {} {}", program, args.join(" "));

        let mut command = Command::new(program);
        command.args(args);
        if input.is_some() {
            command.stdin(Stdio::piped());
        }
        command.stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!("Command not found: {}", program);
                return None;
            }
            Err(e) => {
                error!("Failed to spawn '{}': {}", program, e);
                return None;
            }
        };

        if let Some(text) = input {
            if let Some(stdin) = child.stdin.take() {
                let mut stdin = stdin;
                if let Err(e) = stdin.write_all(text.as_bytes()) {
                    debug!("Failed to write stdin for '{}': {}", program, e);
                }
            }
        }

        match child.wait_with_output() {
            Ok(output) => {
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    debug!(
                        "Command '{}' failed with status {:?}: {}",
                        program,
                        output.status.code(),
                        stderr.trim()
                    );
                }
                Some(output)
            }
            Err(e) => {
                error!("Failed to wait for '{}': {}", program, e);
                None
            }
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> bool {
        self.spawn(program, args, None)
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    fn run_capture(&self, program: &str, args: &[&str]) -> Option<String> {
        let output = self.spawn(program, args, None)?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn run_with_input(&self, program: &str, args: &[&str], input: &str) -> Option<String> {
        let output = self.spawn(program, args, Some(input))?;
        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

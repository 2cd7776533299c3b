//! Health monitoring for the send queue backlog.
//!
//! The send queue is unbounded; messages are never dropped while the
//! ingestion backend is unreachable. This module classifies the backlog length
//! against configurable thresholds so that a growing queue is visible in the
//! logs before it becomes a memory problem.
//!
//! # Usage
//!
//! ```rust
//! use herakles_traffic_agent::health::{BacklogHealth, BacklogStatus};
//!
//! let health = BacklogHealth::new(1000, 10_000);
//! assert_eq!(health.observe(12), BacklogStatus::Ok);
//! assert_eq!(health.observe(1500), BacklogStatus::Warn);
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{error, info, warn};

/// Backlog health status, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BacklogStatus {
    Ok,
    Warn,
    Critical,
}

impl BacklogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BacklogStatus::Ok => "ok",
            BacklogStatus::Warn => "warn",
            BacklogStatus::Critical => "critical",
        }
    }

    fn priority(self) -> u8 {
        match self {
            BacklogStatus::Ok => 0,
            BacklogStatus::Warn => 1,
            BacklogStatus::Critical => 2,
        }
    }

    fn from_priority(priority: u8) -> Self {
        match priority {
            1 => BacklogStatus::Warn,
            2 => BacklogStatus::Critical,
            _ => BacklogStatus::Ok,
        }
    }
}

impl fmt::Display for BacklogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluates the backlog against the thresholds.
///
/// - status is "critical" if backlog >= critical
/// - status is "warn" if backlog >= warn
/// - otherwise "ok"
///
/// A threshold of zero disables that level.
pub fn evaluate_status(backlog: usize, warn: usize, critical: usize) -> BacklogStatus {
    if critical > 0 && backlog >= critical {
        return BacklogStatus::Critical;
    }
    if warn > 0 && backlog >= warn {
        return BacklogStatus::Warn;
    }
    BacklogStatus::Ok
}

/// Tracks the last observed backlog status and logs each transition once.
pub struct BacklogHealth {
    warn: usize,
    critical: usize,
    last: AtomicU8,
}

impl BacklogHealth {
    pub fn new(warn: usize, critical: usize) -> Self {
        Self {
            warn,
            critical,
            last: AtomicU8::new(BacklogStatus::Ok.priority()),
        }
    }

    /// Records the current backlog length and returns its status.
    pub fn observe(&self, backlog: usize) -> BacklogStatus {
        let status = evaluate_status(backlog, self.warn, self.critical);
        let previous =
            BacklogStatus::from_priority(self.last.swap(status.priority(), Ordering::Relaxed));

        if previous != status {
            match status {
                BacklogStatus::Critical => error!(
                    "Send queue backlog is critical: {} messages waiting (threshold {})",
                    backlog, self.critical
                ),
                BacklogStatus::Warn => warn!(
                    "Send queue backlog is growing: {} messages waiting (threshold {})",
                    backlog, self.warn
                ),
                BacklogStatus::Ok => info!(
                    "Send queue backlog recovered: {} messages waiting",
                    backlog
                ),
            }
        }
        status
    }

    /// Last observed status.
    pub fn status(&self) -> BacklogStatus {
        BacklogStatus::from_priority(self.last.load(Ordering::Relaxed))
    }
}

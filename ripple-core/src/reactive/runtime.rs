//! Reactive Runtime
//!
//! The runtime is the per-thread coordinator behind signals and effects.
//! It holds the configuration that new cells and effects capture when they
//! are created, and answers questions about the tracking context.
//!
//! # Configuration
//!
//! Two knobs exist:
//!
//! - [`Tracking`] decides what happens when an effect re-reads a cell it
//!   already depends on. `Rebuild` keeps one subscription per cell and prunes
//!   cells an effect stopped reading; `Accumulate` appends a fresh
//!   subscription on every tracked read.
//! - [`FailurePolicy`] decides what a cell does when one of its subscribers
//!   panics while it is broadcasting a write.
//!
//! Configuration is captured at creation time, so changing it never alters
//! the behaviour of existing signals or effects.

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::context::ReactiveContext;
use super::subscriber::SubscriberId;
use crate::error::ReactiveError;

/// How an effect records the cells it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tracking {
    /// Every tracked read appends a subscription, including reads of a cell
    /// the effect is already subscribed to. Re-runs add to earlier
    /// registrations, so a cell read on every run is notified once per
    /// accumulated subscription.
    Accumulate,

    /// Each effect keeps at most one subscription per cell. Cells that a run
    /// no longer reads are unsubscribed once that run completes.
    #[default]
    Rebuild,
}

impl fmt::Display for Tracking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accumulate => "accumulate",
            Self::Rebuild => "rebuild",
        })
    }
}

impl FromStr for Tracking {
    type Err = ReactiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accumulate" => Ok(Self::Accumulate),
            "rebuild" => Ok(Self::Rebuild),
            _ => Err(ReactiveError::UnknownTracking(s.to_owned())),
        }
    }
}

/// What a cell does when a subscriber panics during notify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The panic unwinds out of the write. Subscribers after the failing one
    /// are not invoked for that write.
    Abort,

    /// Every subscriber runs. Panics are caught, logged, and reported as
    /// [`ReactiveError::Notify`] once the pass is over.
    #[default]
    Isolate,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Abort => "abort",
            Self::Isolate => "isolate",
        })
    }
}

impl FromStr for FailurePolicy {
    type Err = ReactiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "isolate" => Ok(Self::Isolate),
            _ => Err(ReactiveError::UnknownFailurePolicy(s.to_owned())),
        }
    }
}

/// Settings captured by cells and effects when they are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub tracking: Tracking,
    pub failure_policy: FailurePolicy,
}

impl RuntimeConfig {
    /// The default configuration: `Rebuild` tracking, `Isolate` failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulating subscriptions and no isolation between subscribers, the
    /// behaviour of the first version of this engine.
    pub fn legacy() -> Self {
        Self {
            tracking: Tracking::Accumulate,
            failure_policy: FailurePolicy::Abort,
        }
    }

    pub fn with_tracking(mut self, tracking: Tracking) -> Self {
        self.tracking = tracking;
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }
}

thread_local! {
    static CONFIG: Cell<RuntimeConfig> = Cell::new(RuntimeConfig::default());
}

/// The per-thread reactive runtime.
pub struct Runtime;

/// Restores the previous configuration when dropped.
struct ConfigGuard {
    previous: RuntimeConfig,
}

impl Drop for ConfigGuard {
    fn drop(&mut self) {
        CONFIG.with(|config| config.set(self.previous));
    }
}

impl Runtime {
    /// The configuration new cells and effects on this thread will capture.
    pub fn config() -> RuntimeConfig {
        CONFIG.with(Cell::get)
    }

    /// Replace this thread's configuration, returning the previous one.
    pub fn configure(config: RuntimeConfig) -> RuntimeConfig {
        let previous = CONFIG.with(|current| current.replace(config));
        tracing::debug!(
            tracking = %config.tracking,
            failure_policy = %config.failure_policy,
            "runtime reconfigured"
        );
        previous
    }

    /// Run `f` with `config` in effect, restoring the previous configuration
    /// afterwards (also when `f` panics).
    pub fn with_config<R>(config: RuntimeConfig, f: impl FnOnce() -> R) -> R {
        let _guard = ConfigGuard {
            previous: Self::configure(config),
        };
        f()
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a reactive context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}

//! Shared types describing the runner's state machine and its faults.
//!
//! These types define stable contracts between the runner and its callers.
//! They do not depend on host state. The only ambient input is the panic trace
//! recorded by [`crate::panic_hook`] on the current thread.

use std::any::Any;
use std::backtrace::BacktraceStatus;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::panic_hook;

/// Whether the runner currently holds a logic module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleState {
    /// No module held; the next cycle loads one.
    Unloaded,
    /// A module was loaded and initialized and has not faulted since.
    Loaded,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleState::Unloaded => f.write_str("unloaded"),
            ModuleState::Loaded => f.write_str("loaded"),
        }
    }
}

/// Step of a cycle in which a fault was raised.
///
/// Recorded for diagnostics only: every phase is recovered the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Load,
    Initialize,
    Setup,
    Tick,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Load => "load",
            Phase::Initialize => "initialize",
            Phase::Setup => "setup",
            Phase::Tick => "tick",
        };
        f.write_str(name)
    }
}

/// A failure caught at the runner boundary.
///
/// Errors returned by the module and panics unwinding out of it collapse into
/// this one kind. `Display` prints the message alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub phase: Phase,
    pub message: String,
    /// Backtrace text, when one was captured.
    pub trace: Option<String>,
}

impl Fault {
    pub fn new(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            trace: None,
        }
    }

    /// Build a fault from an error returned by the module.
    ///
    /// The message keeps the full context chain (`outer: inner`).
    pub fn from_error(phase: Phase, err: &anyhow::Error) -> Self {
        let backtrace = err.backtrace();
        let trace = match backtrace.status() {
            BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };
        Self {
            phase,
            message: format!("{err:#}"),
            trace,
        }
    }

    /// Build a fault from a panic payload caught by `catch_unwind`.
    ///
    /// The trace is whatever [`panic_hook`] recorded for this thread, so it is
    /// only present when the hook was installed before the panic.
    pub fn from_panic(phase: Phase, payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(msg) = payload.downcast_ref::<&str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        Self {
            phase,
            message,
            trace: panic_hook::take_trace(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of one runner cycle.
///
/// A cycle never returns an error to its caller; faults are reported here
/// after they have already been logged and recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The module ticked successfully. `loaded_now` is set when this cycle
    /// also loaded the module.
    Ran { loaded_now: bool },
    /// The cycle faulted and the module handle was discarded.
    Faulted(Fault),
}

impl TickOutcome {
    pub fn is_fault(&self) -> bool {
        matches!(self, TickOutcome::Faulted(_))
    }
}

//! Install Phase Machine
//!
//! The single source of truth for where an installer run is. Phases only move
//! forward, one at a time, and any live phase can fail.
//!
//! # Phase Flow
//!
//! ```text
//! Priming
//!     ↓
//! Traversing        (steps are shown and answered, back navigation stays here)
//!     ↓
//! ConditionalInstalls
//!     ↓
//! Finished
//!
//! (Any non-terminal phase can transition to Failed)
//! ```

use std::fmt;
use thiserror::Error;
use tracing::info;

/// Phases of one installer run in sequential order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstallPhase {
    /// Module dependencies are checked and required files collected
    Priming = 0,

    /// Steps are shown to the caller and answered
    Traversing = 1,

    /// Conditional file installs are evaluated against the final flags
    ConditionalInstalls = 2,

    /// The final mapping is available (terminal state)
    Finished = 3,

    /// A dependency failure or invalid answer ended the run (terminal state)
    Failed = 255,
}

impl InstallPhase {
    #[inline]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// Returns true if this is a terminal state (Finished or Failed)
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    /// Returns the next phase in the sequence, or None if at a terminal state
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Priming => Some(Self::Traversing),
            Self::Traversing => Some(Self::ConditionalInstalls),
            Self::ConditionalInstalls => Some(Self::Finished),
            Self::Finished | Self::Failed => None,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Priming => "Priming",
            Self::Traversing => "Traversing steps",
            Self::ConditionalInstalls => "Evaluating conditional installs",
            Self::Finished => "Finished",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during phase transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhaseTransitionError {
    /// Attempted to skip one or more phases
    #[error("Cannot skip from {from} to {to}")]
    SkippedPhase { from: InstallPhase, to: InstallPhase },

    /// Attempted to go backwards
    #[error("Cannot go backwards from {from} to {to}")]
    BackwardTransition { from: InstallPhase, to: InstallPhase },

    /// Attempted to transition from a terminal state
    #[error("Cannot transition from terminal state {from}")]
    FromTerminalState { from: InstallPhase },

    #[error("Already at phase {phase}")]
    AlreadyAtPhase { phase: InstallPhase },
}

/// Tracks the phase of one installer run and where it failed.
///
/// # Example
///
/// ```
/// use fomod_installer::install_state::{InstallPhase, PhaseTracker};
///
/// let mut tracker = PhaseTracker::new();
/// assert_eq!(tracker.current(), InstallPhase::Priming);
///
/// tracker.transition_to(InstallPhase::Traversing).unwrap();
/// assert_eq!(tracker.current(), InstallPhase::Traversing);
///
/// // Cannot skip phases
/// assert!(tracker.transition_to(InstallPhase::Finished).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    current: InstallPhase,

    /// Phase at which failure occurred (if any)
    failed_at: Option<InstallPhase>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            current: InstallPhase::Priming,
            failed_at: None,
        }
    }

    #[inline]
    pub fn current(&self) -> InstallPhase {
        self.current
    }

    /// Returns the phase at which failure occurred, if any
    #[inline]
    pub fn failed_at(&self) -> Option<InstallPhase> {
        self.failed_at
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.current == InstallPhase::Finished
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.current == InstallPhase::Failed
    }

    /// Transition to a specific phase (must be the next phase in sequence).
    ///
    /// # Errors
    ///
    /// - `FromTerminalState` if current is a terminal state
    /// - `AlreadyAtPhase` if target is the current phase
    /// - `BackwardTransition` if target is before current
    /// - `SkippedPhase` if target is not the immediate next phase
    pub fn transition_to(&mut self, target: InstallPhase) -> Result<InstallPhase, PhaseTransitionError> {
        if self.current.is_terminal() {
            return Err(PhaseTransitionError::FromTerminalState { from: self.current });
        }
        if target == self.current {
            return Err(PhaseTransitionError::AlreadyAtPhase { phase: target });
        }
        // Failed is only reachable through fail()
        if target == InstallPhase::Failed {
            return Err(PhaseTransitionError::SkippedPhase {
                from: self.current,
                to: target,
            });
        }
        if target.order() < self.current.order() {
            return Err(PhaseTransitionError::BackwardTransition {
                from: self.current,
                to: target,
            });
        }
        if self.current.next() != Some(target) {
            return Err(PhaseTransitionError::SkippedPhase {
                from: self.current,
                to: target,
            });
        }

        self.record(target);
        Ok(target)
    }

    /// Mark the run as failed, remembering the phase it failed in.
    ///
    /// # Errors
    ///
    /// - `FromTerminalState` if already at Finished or Failed
    pub fn fail(&mut self) -> Result<(), PhaseTransitionError> {
        if self.current.is_terminal() {
            return Err(PhaseTransitionError::FromTerminalState { from: self.current });
        }
        self.failed_at = Some(self.current);
        self.record(InstallPhase::Failed);
        Ok(())
    }

    fn record(&mut self, phase: InstallPhase) {
        info!(from = %self.current, to = %phase, "installer phase changed");
        self.current = phase;
    }
}

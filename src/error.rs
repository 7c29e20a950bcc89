//! Error handling module for the installer
//!
//! Each concern has its own error enum next to the code that raises it;
//! `FomodError` gathers them for callers that drive a whole run.

use thiserror::Error;

use crate::config::ConfigError;
use crate::install_state::PhaseTransitionError;
use crate::logic::dependency::DependencyFailure;
use crate::logic::selection::ValidationError;

/// Main error type for the installer
#[derive(Error, Debug)]
pub enum FomodError {
    /// Malformed or missing installer configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A dependency outside visibility checks was not met
    #[error("{0}")]
    MissingDependency(#[from] DependencyFailure),

    /// The caller's answer broke a group rule
    #[error("Invalid answer: {0}")]
    Validation(#[from] ValidationError),

    /// The engine was driven out of order
    #[error("Usage error: {0}")]
    Usage(String),

    /// Install phase machine transition errors
    #[error("Phase transition error: {0}")]
    Transition(#[from] PhaseTransitionError),
}

/// Result type alias for installer operations
pub type Result<T> = std::result::Result<T, FomodError>;

impl FomodError {
    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// True for errors that end the run (the engine is Failed afterwards)
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingDependency(_) | Self::Validation(_))
    }
}

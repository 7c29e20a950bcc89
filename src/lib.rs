//! FOMOD Installer Library
//!
//! Interprets FOMOD installer configurations: checks dependencies, walks the
//! installation steps with the caller and computes the final file mapping
//! and flag table.

pub mod answers;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod install_state;
pub mod logic;
pub mod step;
pub mod types;
pub mod version;
pub mod xml;

// Re-export main types for convenience
pub use config::{ConfigError, DependencyNode, ModuleConfig, ModuleMetadata};
pub use discovery::{InstallerFiles, find_installer_files};
pub use engine::installer::{InstallResult, Installer};
pub use engine::layers::{FileMap, LayeredStore, StateLayer};
pub use error::{FomodError, Result};
pub use install_state::{InstallPhase, PhaseTracker, PhaseTransitionError};
pub use logic::dependency::{DependencyFailure, DependencyKind, Environment, FlagMap};
pub use logic::selection::{ValidationError, default_answer, validate_and_normalize_answer};
pub use step::{Answer, GroupId, GroupView, NormalizedAnswer, PluginId, PluginView, Response, StepView};
pub use types::{FileState, GroupKind, Operator, Order, PluginKind};
pub use version::{LooseVersion, compare_versions};

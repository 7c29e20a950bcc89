//! Dependency Evaluator
//!
//! Evaluates a [`DependencyNode`] tree against the facts at hand: the
//! destination folder, the target application's version and the current
//! flag table.
//!
//! # Rules
//!
//! | Check | Satisfied when |
//! |-------|----------------|
//! | Version | no version known, or version >= minimum (loose comparison) |
//! | File `Missing` | no destination known, or the file does not exist |
//! | File `Active`/`Inactive` | no destination known, or the file exists |
//! | Flag | current value (empty when unset) equals the expected value |
//! | `And` | every child holds; stops at the first failure |
//! | `Or` | at least one child holds; every child is evaluated, the last failure is reported |
//!
//! `Active` and `Inactive` are deliberately not distinguished: telling an
//! enabled plugin from a disabled one needs load order knowledge we do not
//! have.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{MAIN_SEPARATOR, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DependencyNode;
use crate::types::{FileState, Operator};
use crate::version::compare_versions;

/// Flag name → flag value
pub type FlagMap = BTreeMap<String, String>;

/// Which kind of check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DependencyKind {
    Version,
    File,
    Flag,
}

/// An unmet dependency, with enough detail for a human-readable message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyFailure {
    #[error("Version dependency not met. Game version is {actual}, {expected} or newer is required.")]
    Version { expected: String, actual: String },

    #[error("File dependency not met. {file} should be {}.", expected.as_str())]
    File {
        file: String,
        expected: FileState,
        /// `"exists"` or `"missing"`
        actual: String,
    },

    #[error("Flag dependency not met. Expected value of {expected} instead of {actual}")]
    Flag {
        flag: String,
        expected: String,
        actual: String,
    },
}

impl DependencyFailure {
    pub fn kind(&self) -> DependencyKind {
        match self {
            Self::Version { .. } => DependencyKind::Version,
            Self::File { .. } => DependencyKind::File,
            Self::Flag { .. } => DependencyKind::Flag,
        }
    }
}

/// Source of facts a dependency tree is evaluated against
pub trait FactSource {
    /// Target application version, `None` to skip version checks
    fn game_version(&self) -> Option<&str>;

    /// Whether `path` exists under the destination, `None` to skip file checks
    fn file_exists(&self, path: &str) -> Option<bool>;

    /// Current value of a flag, `None` when unset
    fn flag(&self, name: &str) -> Option<&str>;
}

/// Caller-supplied facts about the installation target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Folder the package installs into; enables file checks
    pub destination: Option<PathBuf>,
    /// Target application version; enables version checks
    pub game_version: Option<String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn with_game_version(mut self, version: impl Into<String>) -> Self {
        self.game_version = Some(version.into());
        self
    }
}

/// The [`Environment`] combined with a flag table
#[derive(Debug, Clone, Copy)]
pub struct Facts<'a> {
    pub environment: &'a Environment,
    pub flags: &'a FlagMap,
}

impl<'a> Facts<'a> {
    pub fn new(environment: &'a Environment, flags: &'a FlagMap) -> Self {
        Self { environment, flags }
    }
}

impl FactSource for Facts<'_> {
    fn game_version(&self) -> Option<&str> {
        self.environment.game_version.as_deref()
    }

    fn file_exists(&self, path: &str) -> Option<bool> {
        let destination = self.environment.destination.as_ref()?;
        // FOMOD paths are written with Windows separators
        let relative = path.replace(['\\', '/'], &MAIN_SEPARATOR.to_string());
        Some(destination.join(relative).exists())
    }

    fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }
}

/// Evaluate a single node.
///
/// # Errors
///
/// The [`DependencyFailure`] describing the unmet check (see module docs for
/// which one is reported by `And` and `Or`).
pub fn evaluate(node: &DependencyNode, facts: &impl FactSource) -> Result<(), DependencyFailure> {
    match node {
        DependencyNode::Version { min_version } => {
            let Some(actual) = facts.game_version() else {
                return Ok(());
            };
            if compare_versions(actual, min_version) == Ordering::Less {
                return Err(DependencyFailure::Version {
                    expected: min_version.clone(),
                    actual: actual.to_string(),
                });
            }
            Ok(())
        }
        DependencyNode::File { path, state } => {
            let Some(exists) = facts.file_exists(path) else {
                return Ok(());
            };
            let satisfied = match state {
                FileState::Missing => !exists,
                FileState::Active | FileState::Inactive => exists,
            };
            if satisfied {
                Ok(())
            } else {
                Err(DependencyFailure::File {
                    file: path.clone(),
                    expected: *state,
                    actual: if exists { "exists" } else { "missing" }.to_string(),
                })
            }
        }
        DependencyNode::Flag { name, value } => {
            let actual = facts.flag(name).unwrap_or("");
            if actual == value {
                Ok(())
            } else {
                Err(DependencyFailure::Flag {
                    flag: name.clone(),
                    expected: value.clone(),
                    actual: actual.to_string(),
                })
            }
        }
        DependencyNode::Composite { operator, children } => match operator {
            Operator::And => children.iter().try_for_each(|child| evaluate(child, facts)),
            Operator::Or => {
                let mut any_satisfied = false;
                let mut last_failure = None;
                for child in children {
                    match evaluate(child, facts) {
                        Ok(()) => any_satisfied = true,
                        Err(failure) => last_failure = Some(failure),
                    }
                }
                match last_failure {
                    Some(failure) if !any_satisfied => Err(failure),
                    _ => Ok(()),
                }
            }
        },
    }
}

/// Evaluate an optional tree; an absent tree is always satisfied
pub fn evaluate_optional(
    node: Option<&DependencyNode>,
    facts: &impl FactSource,
) -> Result<(), DependencyFailure> {
    node.map_or(Ok(()), |node| evaluate(node, facts))
}

/// Convenience predicate for visibility-style checks where failures only mean "no"
pub fn is_satisfied(node: Option<&DependencyNode>, facts: &impl FactSource) -> bool {
    evaluate_optional(node, facts).is_ok()
}

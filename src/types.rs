//! Type-safe FOMOD vocabulary
//!
//! Every enumerated attribute value in a `ModuleConfig.xml` is modelled as a
//! Rust enum. Parsing goes through `strum::EnumString` so the XML spelling
//! is the single source of truth for both directions.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// How a container orders its children (`order` attribute)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum Order {
    /// Document order
    Explicit,
    /// By `name`, ascending (the FOMOD default)
    #[default]
    Ascending,
    /// By `name`, descending
    Descending,
}

/// Boolean combinator of a dependency group (`operator` attribute)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum Operator {
    #[default]
    And,
    Or,
}

/// Required state of a file named by a `fileDependency`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum FileState {
    Missing,
    Active,
    Inactive,
}

impl FileState {
    /// Lowercase spelling used in failure messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Selection rule of an option group (`type` attribute of `group`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum GroupKind {
    SelectExactlyOne,
    SelectAtMostOne,
    SelectAtLeastOne,
    SelectAll,
    /// Any number of plugins, including none
    SelectAny,
}

/// Selectability class of a plugin (`name` attribute of `type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum PluginKind {
    Required,
    Recommended,
    Optional,
    NotUsable,
    CouldBeUsable,
}

impl PluginKind {
    /// Plugins a front end should tick before the user touches anything
    pub fn is_preselected(&self) -> bool {
        matches!(self, Self::Required | Self::Recommended)
    }

    /// Whether the user may select this plugin at all
    pub fn is_selectable(&self) -> bool {
        !matches!(self, Self::NotUsable)
    }
}

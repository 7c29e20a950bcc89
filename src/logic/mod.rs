//! Logic modules: pure evaluation over the parsed configuration.
//!
//! # Modules
//!
//! - `dependency`: Dependency tree evaluation against the current facts
//! - `ordering`: Presentation order and plugin kind resolution
//! - `selection`: Answer validation and default selections

pub mod dependency;
pub mod ordering;
pub mod selection;

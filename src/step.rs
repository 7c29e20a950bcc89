//! Step payloads exchanged with the front end
//!
//! A [`StepView`] is what the installer hands out when it suspends; an
//! [`Response`] is what it expects back.
//!
//! # Identifier contract
//!
//! Group and plugin identifiers are generated fresh every time a step is
//! built. They are valid for exactly one showing of that step: after going
//! back (or forward again) the same plugin has a new id, and answers
//! referring to old ids are rejected. Front ends must never cache ids across
//! a navigation boundary.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{GroupKind, PluginKind};

/// Identifier of a group within one showing of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(Uuid);

/// Identifier of a plugin within one showing of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginId(Uuid);

impl GroupId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl PluginId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginView {
    pub id: PluginId,
    pub name: String,
    pub description: String,
    pub image: String,
    pub kind: PluginKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupView {
    pub id: GroupId,
    pub name: String,
    pub kind: GroupKind,
    pub plugins: Vec<PluginView>,
}

impl GroupView {
    pub fn plugin(&self, id: PluginId) -> Option<&PluginView> {
        self.plugins.iter().find(|plugin| plugin.id == id)
    }

    pub fn plugin_named(&self, name: &str) -> Option<&PluginView> {
        self.plugins.iter().find(|plugin| plugin.name == name)
    }

    fn position(&self, id: PluginId) -> Option<usize> {
        self.plugins.iter().position(|plugin| plugin.id == id)
    }

    /// Sort key of a plugin id, placing unknown ids last
    pub(crate) fn plugin_position(&self, id: PluginId) -> usize {
        self.position(id).unwrap_or(usize::MAX)
    }
}

/// One installation step as presented to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub name: String,
    pub groups: Vec<GroupView>,
}

impl StepView {
    pub fn group(&self, id: GroupId) -> Option<&GroupView> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn group_named(&self, name: &str) -> Option<&GroupView> {
        self.groups.iter().find(|group| group.name == name)
    }
}

/// The user's choices for one step: group → chosen plugins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub selections: HashMap<GroupId, Vec<PluginId>>,
}

impl Answer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `plugin` to the selection of `group`; selecting it again is a no-op
    pub fn select(mut self, group: GroupId, plugin: PluginId) -> Self {
        let selected = self.selections.entry(group).or_default();
        if !selected.contains(&plugin) {
            selected.push(plugin);
        }
        self
    }

    /// Chosen plugins of `group`, empty when the group was not answered
    pub fn selected(&self, group: GroupId) -> &[PluginId] {
        self.selections.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// What the front end sends back for a pending step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Go back to the previously answered step, undoing its choices
    Back,
    /// Accept the step with these choices
    Answer(Answer),
}

impl From<Answer> for Response {
    fn from(answer: Answer) -> Self {
        Self::Answer(answer)
    }
}

/// A validated answer: groups in step order, plugins in group order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedAnswer {
    pub groups: Vec<(GroupId, Vec<PluginId>)>,
}

impl NormalizedAnswer {
    /// Every selected plugin, in normalized order
    pub fn plugins(&self) -> impl Iterator<Item = PluginId> + '_ {
        self.groups.iter().flat_map(|(_, plugins)| plugins.iter().copied())
    }
}

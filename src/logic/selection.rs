//! Answer validation and default selections
//!
//! # Normalization Rules
//!
//! For each group of the step, in step order:
//!
//! 1. Ids must belong to this showing of the step
//! 2. Count rules apply to the distinct ids the caller selected
//!    (`SelectExactlyOne` = 1, `SelectAtMostOne` <= 1, `SelectAtLeastOne` >= 1)
//! 3. Selecting a `NotUsable` plugin is an error
//! 4. `SelectAll` replaces the selection with every plugin
//! 5. `Required` plugins are added even when this breaks the count rule
//! 6. Duplicates are dropped and plugins sorted into group order

use std::collections::HashSet;

use thiserror::Error;

use crate::step::{Answer, GroupView, NormalizedAnswer, PluginId, StepView};
use crate::types::{GroupKind, PluginKind};

/// Why an answer was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Group \"{group}\" requires exactly one choice.")]
    ExactlyOne { group: String },

    #[error("Group \"{group}\" allows at most one choice.")]
    AtMostOne { group: String },

    #[error("Group \"{group}\" requires at least one choice.")]
    AtLeastOne { group: String },

    #[error("\"{plugin}\" cannot be selected.")]
    NotUsable { plugin: String },

    #[error("Answer refers to a group that is not part of step \"{step}\"")]
    UnknownGroup { step: String },

    #[error("Answer refers to a plugin that is not part of group \"{group}\"")]
    UnknownPlugin { group: String },
}

fn check_count(group: &GroupView, count: usize) -> Result<(), ValidationError> {
    let name = || group.name.clone();
    match group.kind {
        GroupKind::SelectExactlyOne if count != 1 => Err(ValidationError::ExactlyOne { group: name() }),
        GroupKind::SelectAtMostOne if count > 1 => Err(ValidationError::AtMostOne { group: name() }),
        GroupKind::SelectAtLeastOne if count < 1 => Err(ValidationError::AtLeastOne { group: name() }),
        _ => Ok(()),
    }
}

/// Validate `answer` against `step` and put it into canonical form.
///
/// # Errors
///
/// The first [`ValidationError`] encountered, walking groups in step order.
pub fn validate_and_normalize_answer(
    step: &StepView,
    answer: &Answer,
) -> Result<NormalizedAnswer, ValidationError> {
    if answer.selections.keys().any(|id| step.group(*id).is_none()) {
        return Err(ValidationError::UnknownGroup {
            step: step.name.clone(),
        });
    }

    let mut groups = Vec::with_capacity(step.groups.len());
    for group in &step.groups {
        let raw = answer.selected(group.id);

        let plugins = raw
            .iter()
            .map(|id| group.plugin(*id))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ValidationError::UnknownPlugin {
                group: group.name.clone(),
            })?;

        let distinct: HashSet<PluginId> = raw.iter().copied().collect();
        check_count(group, distinct.len())?;
        if let Some(plugin) = plugins.iter().find(|p| p.kind == PluginKind::NotUsable) {
            return Err(ValidationError::NotUsable {
                plugin: plugin.name.clone(),
            });
        }

        let mut selected: Vec<PluginId> = if group.kind == GroupKind::SelectAll {
            group.plugins.iter().map(|plugin| plugin.id).collect()
        } else {
            raw.to_vec()
        };
        selected.extend(
            group
                .plugins
                .iter()
                .filter(|plugin| plugin.kind == PluginKind::Required)
                .map(|plugin| plugin.id),
        );

        selected.sort_by_key(|id| group.plugin_position(*id));
        selected.dedup();
        groups.push((group.id, selected));
    }

    Ok(NormalizedAnswer { groups })
}

/// The answer an unattended front end submits for `step`.
///
/// Required and Recommended plugins are preselected, `NotUsable` never is.
/// Groups that need a choice fall back to their first selectable plugin.
pub fn default_answer(step: &StepView) -> Answer {
    let mut answer = Answer::new();
    for group in &step.groups {
        let selectable = || group.plugins.iter().filter(|p| p.kind.is_selectable());
        let preselected: Vec<PluginId> = selectable()
            .filter(|p| p.kind.is_preselected())
            .map(|p| p.id)
            .collect();

        let chosen: Vec<PluginId> = match group.kind {
            GroupKind::SelectAll => selectable().map(|p| p.id).collect(),
            GroupKind::SelectExactlyOne => preselected
                .first()
                .copied()
                .or_else(|| selectable().next().map(|p| p.id))
                .into_iter()
                .collect(),
            GroupKind::SelectAtMostOne => preselected.into_iter().take(1).collect(),
            GroupKind::SelectAtLeastOne if preselected.is_empty() => {
                selectable().next().map(|p| p.id).into_iter().collect()
            }
            GroupKind::SelectAtLeastOne | GroupKind::SelectAny => preselected,
        };

        for id in chosen {
            answer = answer.select(group.id, id);
        }
    }
    answer
}

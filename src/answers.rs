//! Scripted answers for unattended runs
//!
//! An answer script names choices rather than ids, so it stays valid across
//! runs:
//!
//! ```json
//! {
//!   "steps": {
//!     "Textures": { "Resolution": ["2K"] }
//!   }
//! }
//! ```
//!
//! Steps and groups the script does not mention get [`default_answer`].

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::logic::selection::default_answer;
use crate::step::{Answer, PluginId, StepView};

/// Group name → chosen plugin names
pub type GroupChoices = BTreeMap<String, Vec<String>>;

/// Step name → choices for its groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerScript {
    #[serde(default)]
    pub steps: BTreeMap<String, GroupChoices>,
}

impl AnswerScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save the script to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize answers to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write answers to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load a script from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read answers from {:?}", path.as_ref()))?;

        let script: Self = serde_json::from_str(&content).context("Failed to parse answers JSON")?;

        Ok(script)
    }

    /// Build the answer for `step`, translating names to this showing's ids
    pub fn answer_for(&self, step: &StepView) -> Result<Answer> {
        let mut answer = default_answer(step);
        let Some(choices) = self.steps.get(&step.name) else {
            return Ok(answer);
        };

        for (group_name, plugin_names) in choices {
            let Some(group) = step.group_named(group_name) else {
                bail!("Step \"{}\" has no group \"{}\"", step.name, group_name);
            };
            let ids = plugin_names
                .iter()
                .map(|name| match group.plugin_named(name) {
                    Some(plugin) => Ok(plugin.id),
                    None => bail!("Group \"{}\" has no plugin \"{}\"", group.name, name),
                })
                .collect::<Result<Vec<PluginId>>>()?;
            answer.selections.insert(group.id, ids);
        }
        Ok(answer)
    }

    /// Remember `answer` for `step` by name
    pub fn record(&mut self, step: &StepView, answer: &Answer) {
        let choices = step
            .groups
            .iter()
            .map(|group| {
                let names = answer
                    .selected(group.id)
                    .iter()
                    .filter_map(|id| group.plugin(*id))
                    .map(|plugin| plugin.name.clone())
                    .collect();
                (group.name.clone(), names)
            })
            .collect();
        self.steps.insert(step.name.clone(), choices);
    }
}

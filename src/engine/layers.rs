//! Layered State Store
//!
//! Every answered step pushes one [`StateLayer`]; going back pops it. The
//! base layer holds the required files and is never popped.
//!
//! # Reads
//!
//! | Read | Rule |
//! |------|------|
//! | `flattened_flags` | newest layer defining a flag wins |
//! | `flattened_files` | higher priority wins; within a priority the newest layer wins |

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::config::{ConditionFlag, FileInstall};
use crate::logic::dependency::FlagMap;

/// Destination → source
pub type FileMap = BTreeMap<String, String>;

/// Priority → (destination → source)
pub type FileBuckets = BTreeMap<i64, FileMap>;

/// One increment of flag and file state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateLayer {
    pub flags: FlagMap,
    pub files: FileBuckets,
}

impl StateLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record files; a later entry for the same (priority, destination) replaces an earlier one
    pub fn add_files<'a>(&mut self, files: impl IntoIterator<Item = &'a FileInstall>) {
        for file in files {
            self.files
                .entry(file.priority)
                .or_default()
                .insert(file.destination.clone(), file.source.clone());
        }
    }

    pub fn add_flags<'a>(&mut self, flags: impl IntoIterator<Item = &'a ConditionFlag>) {
        for flag in flags {
            self.flags.insert(flag.name.clone(), flag.value.clone());
        }
    }
}

/// Stack of layers over a permanent base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayeredStore {
    /// `layers[0]` is the base, the last element is the most recent
    layers: Vec<StateLayer>,
}

impl Default for LayeredStore {
    fn default() -> Self {
        Self::new(StateLayer::new())
    }
}

impl LayeredStore {
    pub fn new(base: StateLayer) -> Self {
        Self { layers: vec![base] }
    }

    /// Number of layers including the base
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn push_layer(&mut self, layer: StateLayer) {
        self.layers.push(layer);
        debug!(depth = self.layers.len(), "pushed state layer");
    }

    /// Remove the most recent layer. Returns false, leaving the store
    /// untouched, when only the base remains.
    pub fn pop_layer(&mut self) -> bool {
        if self.layers.len() <= 1 {
            debug!("pop requested with only the base layer left");
            return false;
        }
        self.layers.pop();
        debug!(depth = self.layers.len(), "popped state layer");
        true
    }

    /// Newest layer first
    fn newest_first(&self) -> impl Iterator<Item = &StateLayer> {
        self.layers.iter().rev()
    }

    pub fn flattened_flags(&self) -> FlagMap {
        let mut flags = FlagMap::new();
        for layer in self.newest_first() {
            for (name, value) in &layer.flags {
                flags.entry(name.clone()).or_insert_with(|| value.clone());
            }
        }
        flags
    }

    pub fn flattened_files(&self) -> FileMap {
        let mut priorities: Vec<i64> = self
            .layers
            .iter()
            .flat_map(|layer| layer.files.keys().copied())
            .collect();
        priorities.sort_unstable_by(|a, b| b.cmp(a));
        priorities.dedup();

        let mut files = FileMap::new();
        for priority in priorities {
            for layer in self.newest_first() {
                let Some(bucket) = layer.files.get(&priority) else {
                    continue;
                };
                for (destination, source) in bucket {
                    files.entry(destination.clone()).or_insert_with(|| source.clone());
                }
            }
        }
        files
    }
}

//! Installer Engine
//!
//! Drives one run over a [`ModuleConfig`] as an explicit state machine. The
//! caller primes the engine, then alternates `next_step()` and `submit()`
//! until `next_step()` returns `None`.
//!
//! ```text
//! prime()                       Priming -> Traversing (or Failed)
//! loop {
//!     next_step()?  -> Some(step)   suspended, waiting for submit()
//!                   -> None         ConditionalInstalls -> Finished
//!     submit(Back | Answer)         pop / push one state layer
//! }
//! ```
//!
//! Dependency failures outside visibility checks and invalid answers move the
//! engine to `Failed`; calls made in the wrong order are usage errors and
//! leave the engine as it was.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ConditionFlag, FileInstall, ModuleConfig, ModuleMetadata, StepConfig};
use crate::discovery::find_installer_files;
use crate::engine::layers::{FileMap, LayeredStore, StateLayer};
use crate::error::{FomodError, Result};
use crate::install_state::{InstallPhase, PhaseTracker};
use crate::logic::dependency::{Environment, Facts, FlagMap, evaluate_optional, is_satisfied};
use crate::logic::ordering::{ordered_children, ordered_indices, resolve_plugin_kind};
use crate::logic::selection::validate_and_normalize_answer;
use crate::step::{Answer, GroupId, GroupView, PluginId, PluginView, Response, StepView};

/// Final outcome of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallResult {
    /// Destination → source
    pub files: FileMap,
    pub flags: FlagMap,
}

/// Files and flags a plugin contributes when selected
#[derive(Debug, Clone)]
struct PluginPayload {
    files: Vec<FileInstall>,
    flags: Vec<ConditionFlag>,
}

/// The step handed out by `next_step()` and not yet answered
#[derive(Debug, Clone)]
struct PendingStep {
    index: usize,
    view: StepView,
    payloads: HashMap<PluginId, PluginPayload>,
}

/// One installer run
#[derive(Debug)]
pub struct Installer {
    config: ModuleConfig,
    metadata: ModuleMetadata,
    environment: Environment,
    store: LayeredStore,
    phase: PhaseTracker,

    /// Presentation order of the configured steps
    step_order: Vec<usize>,
    /// Next position in `step_order` to examine
    cursor: usize,
    /// Positions of answered steps, most recent last
    history: Vec<usize>,
    pending: Option<PendingStep>,
}

impl Installer {
    /// Create an installer for an already parsed configuration
    pub fn new(config: ModuleConfig, environment: Environment) -> Self {
        // Step order never changes during a run
        let step_order = ordered_indices(&config.install_steps);

        let metadata = ModuleMetadata {
            name: config.module_name.clone(),
            image: config.module_image.clone(),
            ..ModuleMetadata::default()
        };

        Self {
            config,
            metadata,
            environment,
            store: LayeredStore::default(),
            phase: PhaseTracker::new(),
            step_order,
            cursor: 0,
            history: Vec::new(),
            pending: None,
        }
    }

    /// Locate and parse the installer of the package at `search_path`.
    ///
    /// # Errors
    ///
    /// [`FomodError::Config`] when the files cannot be found or parsed.
    pub fn from_path<P: AsRef<Path>>(search_path: P, environment: Environment) -> Result<Self> {
        let files = find_installer_files(search_path)?;
        let config = ModuleConfig::load_from_file(&files.module_config)?;
        let metadata = ModuleMetadata::load_from_file(&files.info, &config)?;
        let mut installer = Self::new(config, environment);
        installer.metadata = metadata;
        Ok(installer)
    }

    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    #[inline]
    pub fn phase(&self) -> InstallPhase {
        self.phase.current()
    }

    /// The step waiting for `submit()`, if any
    pub fn current_step(&self) -> Option<&StepView> {
        self.pending.as_ref().map(|pending| &pending.view)
    }

    /// Flags as they stand right now
    pub fn flag_states(&self) -> FlagMap {
        self.store.flattened_flags()
    }

    /// Files collected so far, destination → source
    pub fn collected_files(&self) -> FileMap {
        self.store.flattened_files()
    }

    /// Final mapping, available once the run is Finished
    pub fn result(&self) -> Option<InstallResult> {
        self.phase.is_finished().then(|| InstallResult {
            files: self.store.flattened_files(),
            flags: self.store.flattened_flags(),
        })
    }

    // ========================================================================
    // State Machine
    // ========================================================================

    /// Check module dependencies and collect the required files.
    ///
    /// # Errors
    ///
    /// - [`FomodError::MissingDependency`] when a module dependency is not
    ///   met; the engine is Failed afterwards
    /// - [`FomodError::Usage`] when called more than once
    pub fn prime(&mut self) -> Result<()> {
        if self.phase() != InstallPhase::Priming {
            return Err(FomodError::usage(format!(
                "prime() called while {}",
                self.phase()
            )));
        }

        let no_flags = FlagMap::new();
        let facts = Facts::new(&self.environment, &no_flags);
        if let Err(failure) = evaluate_optional(self.config.module_dependencies.as_ref(), &facts) {
            warn!(%failure, "module dependencies not met");
            self.phase.fail()?;
            return Err(failure.into());
        }

        let mut base = StateLayer::new();
        base.add_files(&self.config.required_files);
        self.store = LayeredStore::new(base);
        info!(
            module = %self.config.module_name,
            required = self.config.required_files.len(),
            "installer primed"
        );

        self.phase.transition_to(InstallPhase::Traversing)?;
        Ok(())
    }

    /// Pull the next visible step.
    ///
    /// Returns `None` once every step is done; by then conditional installs
    /// have run and [`Installer::result`] is available.
    ///
    /// # Errors
    ///
    /// [`FomodError::Usage`] before priming, while a step is waiting for an
    /// answer, or after the engine failed.
    pub fn next_step(&mut self) -> Result<Option<StepView>> {
        match self.phase() {
            InstallPhase::Priming => return Err(FomodError::usage("next_step() called before prime()")),
            InstallPhase::Failed => return Err(self.failed_error()),
            InstallPhase::Finished => return Ok(None),
            InstallPhase::Traversing | InstallPhase::ConditionalInstalls => {}
        }
        if self.pending.is_some() {
            return Err(FomodError::usage("the current step has not been answered"));
        }

        let flags = self.store.flattened_flags();
        let facts = Facts::new(&self.environment, &flags);
        while self.cursor < self.step_order.len() {
            let position = self.cursor;
            let step = &self.config.install_steps.items[self.step_order[position]];
            if is_satisfied(step.visible.as_ref(), &facts) {
                let pending = build_step(position, step, &facts);
                debug!(step = %step.name, position, "showing step");
                let view = pending.view.clone();
                self.pending = Some(pending);
                return Ok(Some(view));
            }
            debug!(step = %step.name, position, "step hidden");
            self.cursor += 1;
        }

        self.finish()?;
        Ok(None)
    }

    /// Answer the pending step or go back to the previous one.
    ///
    /// # Errors
    ///
    /// - [`FomodError::Usage`] when no step is pending
    /// - [`FomodError::Validation`] when the answer breaks a group rule; the
    ///   engine is Failed afterwards
    pub fn submit(&mut self, response: impl Into<Response>) -> Result<()> {
        if self.phase() == InstallPhase::Failed {
            return Err(self.failed_error());
        }
        let Some(pending) = self.pending.take() else {
            return Err(FomodError::usage("submit() called without a pending step"));
        };

        match response.into() {
            Response::Back => {
                self.store.pop_layer();
                self.cursor = self.history.pop().unwrap_or(0);
                debug!(from = %pending.view.name, cursor = self.cursor, "navigated back");
                Ok(())
            }
            Response::Answer(answer) => self.accept(pending, &answer),
        }
    }

    fn accept(&mut self, pending: PendingStep, answer: &Answer) -> Result<()> {
        let normalized = match validate_and_normalize_answer(&pending.view, answer) {
            Ok(normalized) => normalized,
            Err(err) => {
                warn!(step = %pending.view.name, %err, "rejected answer");
                self.phase.fail()?;
                return Err(err.into());
            }
        };

        let mut layer = StateLayer::new();
        for id in normalized.plugins() {
            if let Some(payload) = pending.payloads.get(&id) {
                layer.add_files(&payload.files);
                layer.add_flags(&payload.flags);
            }
        }
        self.store.push_layer(layer);

        self.history.push(pending.index);
        self.cursor = pending.index + 1;
        debug!(step = %pending.view.name, answered = self.history.len(), "step answered");
        Ok(())
    }

    fn failed_error(&self) -> FomodError {
        match self.phase.failed_at() {
            Some(phase) => FomodError::usage(format!("installer failed during {phase} and cannot be resumed")),
            None => FomodError::usage("installer has failed and cannot be resumed"),
        }
    }

    fn finish(&mut self) -> Result<()> {
        self.phase.transition_to(InstallPhase::ConditionalInstalls)?;

        let flags = self.store.flattened_flags();
        let facts = Facts::new(&self.environment, &flags);
        let mut matched = 0;
        for pattern in &self.config.conditional_installs {
            if is_satisfied(pattern.dependencies.as_ref(), &facts) {
                let mut layer = StateLayer::new();
                layer.add_files(&pattern.files);
                self.store.push_layer(layer);
                matched += 1;
            }
        }
        debug!(matched, total = self.config.conditional_installs.len(), "conditional installs evaluated");

        self.phase.transition_to(InstallPhase::Finished)?;
        info!(files = self.store.flattened_files().len(), "installation mapping ready");
        Ok(())
    }
}

/// Build a fresh view of `step`, resolving plugin kinds against `facts`
fn build_step(index: usize, step: &StepConfig, facts: &Facts<'_>) -> PendingStep {
    let mut payloads = HashMap::new();
    let groups = ordered_children(&step.groups)
        .into_iter()
        .map(|group| {
            let plugins = ordered_children(&group.plugins)
                .into_iter()
                .map(|plugin| {
                    let id = PluginId::generate();
                    payloads.insert(
                        id,
                        PluginPayload {
                            files: plugin.files.clone(),
                            flags: plugin.flags.clone(),
                        },
                    );
                    PluginView {
                        id,
                        name: plugin.name.clone(),
                        description: plugin.description.clone(),
                        image: plugin.image.clone(),
                        kind: resolve_plugin_kind(&plugin.type_descriptor, facts),
                    }
                })
                .collect();
            GroupView {
                id: GroupId::generate(),
                name: group.name.clone(),
                kind: group.kind,
                plugins,
            }
        })
        .collect();

    PendingStep {
        index,
        view: StepView {
            name: step.name.clone(),
            groups,
        },
        payloads,
    }
}

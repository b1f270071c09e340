// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The session context commands operate on.

use mgx_topology::{CommandId, EntityKey, ModelArena};
use rustc_hash::FxHashSet;

use crate::config::EngineConfig;
use crate::kernel::{FacetedKernel, GeometricKernel};

/// Entities currently shown by the graphical front end.
///
/// Kept outside the entity records so that undo and redo, which swap
/// records, leave it to the refresh pass to reconcile.
#[derive(Debug, Default, Clone)]
pub struct DisplayState {
    shown: FxHashSet<EntityKey>,
}

impl DisplayState {
    pub fn is_displayed(&self, key: EntityKey) -> bool {
        self.shown.contains(&key)
    }

    pub fn show(&mut self, key: EntityKey) {
        self.shown.insert(key);
    }

    pub fn hide(&mut self, key: EntityKey) {
        self.shown.remove(&key);
    }

    pub fn len(&self) -> usize {
        self.shown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shown.is_empty()
    }
}

/// Owner of the model and everything commands need alongside it.
#[derive(Debug)]
pub struct Context {
    arena: ModelArena,
    config: EngineConfig,
    kernel: Box<dyn GeometricKernel>,
    display: DisplayState,
    next_command: u64,
}

impl Context {
    /// Creates an empty context using the faceted kernel.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_kernel(config, Box::new(FacetedKernel))
    }

    pub fn with_kernel(config: EngineConfig, kernel: Box<dyn GeometricKernel>) -> Self {
        Self {
            arena: ModelArena::new(),
            config,
            kernel,
            display: DisplayState::default(),
            next_command: 1,
        }
    }

    pub fn arena(&self) -> &ModelArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut ModelArena {
        &mut self.arena
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn kernel(&self) -> &dyn GeometricKernel {
        self.kernel.as_ref()
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut DisplayState {
        &mut self.display
    }

    /// Hands out the identifier of a new command.
    pub fn allocate_command_id(&mut self) -> CommandId {
        let id = CommandId(self.next_command);
        self.next_command += 1;
        id
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Undo/redo history of committed commands.

use std::collections::VecDeque;

use crate::command::Command;
use crate::context::Context;
use crate::error::{CommandError, Result};

/// Two-stack undo/redo history.
///
/// Only commands that reached `DONE` enter the history. Executing a new
/// command releases every undone command, and the oldest committed commands
/// are released once the history grows past its limit.
#[derive(Debug)]
pub struct CommandManager {
    undo: VecDeque<Command>,
    redo: Vec<Command>,
    limit: usize,
}

impl CommandManager {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Executes a command and records it on success. A failed command is
    /// dropped; its changes were already rolled back.
    pub fn execute(&mut self, ctx: &mut Context, command: Command) -> Result<&Command> {
        command.execute(ctx)?;

        while let Some(undone) = self.redo.pop() {
            undone.release(ctx)?;
        }
        self.undo.push_back(command);
        while self.undo.len() > self.limit {
            if let Some(oldest) = self.undo.pop_front() {
                oldest.release(ctx)?;
            }
        }
        self.undo.back().ok_or(CommandError::NothingToUndo)
    }

    /// Undoes the most recent command.
    pub fn undo(&mut self, ctx: &mut Context) -> Result<&Command> {
        let command = self.undo.pop_back().ok_or(CommandError::NothingToUndo)?;
        if let Err(err) = command.undo(ctx) {
            self.undo.push_back(command);
            return Err(err);
        }
        self.redo.push(command);
        self.redo.last().ok_or(CommandError::NothingToRedo)
    }

    /// Redoes the most recently undone command.
    pub fn redo(&mut self, ctx: &mut Context) -> Result<&Command> {
        let command = self.redo.pop().ok_or(CommandError::NothingToRedo)?;
        if let Err(err) = command.redo(ctx) {
            self.redo.push(command);
            return Err(err);
        }
        self.undo.push_back(command);
        self.undo.back().ok_or(CommandError::NothingToUndo)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Most recent committed command.
    pub fn last_done(&self) -> Option<&Command> {
        self.undo.back()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Releases every command, undone ones first.
    pub fn clear(&mut self, ctx: &mut Context) -> Result<()> {
        while let Some(undone) = self.redo.pop() {
            undone.release(ctx)?;
        }
        while let Some(done) = self.undo.pop_front() {
            done.release(ctx)?;
        }
        Ok(())
    }
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandStatus, ExecutionScope, Operation};
    use crate::config::EngineConfig;
    use mgx_topology::Point3;

    struct AddVertex;

    impl Operation for AddVertex {
        fn name(&self) -> &str {
            "AddVertex"
        }

        fn internal_execute(&mut self, ctx: &mut Context, scope: &mut ExecutionScope<'_>) -> Result<()> {
            ctx.arena_mut().add_vertex(scope.ledger(), Point3::origin());
            Ok(())
        }
    }

    #[test]
    fn undo_and_redo_walk_the_history() {
        let mut ctx = Context::new(EngineConfig::new());
        let mut manager = CommandManager::new(10);
        for _ in 0..3 {
            let cmd = Command::new(&mut ctx, AddVertex);
            manager.execute(&mut ctx, cmd).unwrap();
        }
        assert_eq!(ctx.arena().vertex_count(), 3);

        manager.undo(&mut ctx).unwrap();
        manager.undo(&mut ctx).unwrap();
        assert_eq!(ctx.arena().vertex_count(), 1);
        assert_eq!(manager.redo_len(), 2);

        let redone = manager.redo(&mut ctx).unwrap();
        assert_eq!(redone.status(), CommandStatus::Done);
        assert_eq!(ctx.arena().vertex_count(), 2);
    }

    #[test]
    fn new_command_releases_redo_stack() {
        let mut ctx = Context::new(EngineConfig::new());
        let mut manager = CommandManager::new(10);
        let cmd = Command::new(&mut ctx, AddVertex);
        manager.execute(&mut ctx, cmd).unwrap();
        manager.undo(&mut ctx).unwrap();
        assert_eq!(ctx.arena().total_count(), 1);

        let cmd = Command::new(&mut ctx, AddVertex);
        manager.execute(&mut ctx, cmd).unwrap();
        assert!(!manager.can_redo());
        assert_eq!(ctx.arena().total_count(), 1);
        assert_eq!(ctx.arena().vertex_count(), 1);
    }

    #[test]
    fn history_is_bounded() {
        let mut ctx = Context::new(EngineConfig::new());
        let mut manager = CommandManager::new(2);
        for _ in 0..5 {
            let cmd = Command::new(&mut ctx, AddVertex);
            manager.execute(&mut ctx, cmd).unwrap();
        }
        assert_eq!(manager.undo_len(), 2);
        manager.undo(&mut ctx).unwrap();
        manager.undo(&mut ctx).unwrap();
        assert!(matches!(manager.undo(&mut ctx), Err(CommandError::NothingToUndo)));
        assert_eq!(ctx.arena().vertex_count(), 3);
    }
}

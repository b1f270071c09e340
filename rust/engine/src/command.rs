// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command lifecycle: execute, undo, redo.
//!
//! A [`Command`] wraps an [`Operation`] with the state machine
//!
//! ```text
//! INITED -> PROCESSING -> DONE | FAIL | CANCELED
//! DONE --undo--> INITED --redo--> DONE
//! ```
//!
//! and owns the [`ChangeLedger`] the operation records into. A failed
//! execute rolls the model and the name allocator back to their state before
//! the call, so a failed command never leaves a trace in the model.
//!
//! Execute, undo and redo take a per-command lock; a concurrent call on the
//! same command fails with [`CommandError::Busy`] instead of waiting. The
//! status lives outside that lock so it can be read, and the command
//! canceled, while an operation runs.
//!
//! A panic escaping the operation is not an error result. The status is set
//! to `FAIL` with a single atomic store, the operation's
//! [`emergency_cleanup`](Operation::emergency_cleanup) runs and the panic is
//! resumed. Nothing on that path allocates.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use mgx_topology::{ChangeLedger, CommandId, NameStats};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::context::Context;
use crate::error::{CommandError, Result};
use crate::groups::{update_deleted_groups, update_display_properties};

/// Lifecycle state of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandStatus {
    Inited = 0,
    Processing = 1,
    Done = 2,
    Fail = 3,
    Canceled = 4,
}

impl CommandStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => CommandStatus::Inited,
            1 => CommandStatus::Processing,
            2 => CommandStatus::Done,
            3 => CommandStatus::Fail,
            _ => CommandStatus::Canceled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Inited => "INITED",
            CommandStatus::Processing => "PROCESSING",
            CommandStatus::Done => "DONE",
            CommandStatus::Fail => "FAIL",
            CommandStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, lock-free status cell.
///
/// The low bits hold the [`CommandStatus`]; [`EXECUTED`] is set once the
/// command has started its first execute and survives every later status
/// change.
#[derive(Debug, Clone)]
struct StatusCell(Arc<AtomicU8>);

const EXECUTED: u8 = 0x80;

impl StatusCell {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(CommandStatus::Inited as u8)))
    }

    fn get(&self) -> CommandStatus {
        CommandStatus::from_u8(self.0.load(Ordering::SeqCst) & !EXECUTED)
    }

    fn executed(&self) -> bool {
        self.0.load(Ordering::SeqCst) & EXECUTED != 0
    }

    fn mark_executed(&self) {
        self.0.fetch_or(EXECUTED, Ordering::SeqCst);
    }

    fn set(&self, status: CommandStatus) {
        self.update(|_| Some(status));
    }

    /// Moves from `from` to `to`; fails with the actual status otherwise.
    fn transition(&self, from: CommandStatus, to: CommandStatus) -> std::result::Result<(), CommandStatus> {
        self.update(|current| (current == from).then_some(to))
            .map(|_| ())
            .map_err(|raw| CommandStatus::from_u8(raw & !EXECUTED))
    }

    /// Applies `f` to the status, keeping the executed bit.
    fn update(
        &self,
        f: impl Fn(CommandStatus) -> Option<CommandStatus>,
    ) -> std::result::Result<u8, u8> {
        self.0.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |raw| {
            f(CommandStatus::from_u8(raw & !EXECUTED)).map(|next| (raw & EXECUTED) | next as u8)
        })
    }
}

/// Cancels a command from another thread.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    status: StatusCell,
}

impl CancelHandle {
    /// Requests cancellation. Only a command that has not run yet
    /// (`INITED` before its first execute) or is running (`PROCESSING`) is
    /// affected; returns whether it was. An undone command waiting for redo
    /// cannot be canceled.
    pub fn cancel(&self) -> bool {
        let executed = self.status.executed();
        self.status
            .update(|current| match current {
                CommandStatus::Inited if !executed => Some(CommandStatus::Canceled),
                CommandStatus::Processing => Some(CommandStatus::Canceled),
                _ => None,
            })
            .is_ok()
    }

    pub fn is_canceled(&self) -> bool {
        self.status.get() == CommandStatus::Canceled
    }
}

/// What an operation sees while it runs.
pub struct ExecutionScope<'a> {
    ledger: &'a mut ChangeLedger,
    status: &'a StatusCell,
}

impl<'a> ExecutionScope<'a> {
    /// Ledger every mutation of the running command goes through.
    pub fn ledger(&mut self) -> &mut ChangeLedger {
        self.ledger
    }

    /// Fails with [`CommandError::Canceled`] once the command has been
    /// canceled. Long operations call this between steps.
    pub fn checkpoint(&self) -> Result<()> {
        if self.status.get() == CommandStatus::Canceled {
            return Err(CommandError::Canceled);
        }
        Ok(())
    }
}

/// The model-specific part of a command.
///
/// Only [`internal_execute`](Operation::internal_execute) is required. Undo
/// and redo default to swapping the ledger's saved records, which replays
/// exactly what execute recorded.
pub trait Operation: Send {
    /// Short name used in logs and messages.
    fn name(&self) -> &str;

    /// Preparation before the model is touched; failing here fails the
    /// command without any mutation.
    fn pre_execute(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    /// The operation itself. Every mutation must go through `scope.ledger()`.
    fn internal_execute(&mut self, ctx: &mut Context, scope: &mut ExecutionScope<'_>) -> Result<()>;

    /// Runs after every execute, successful or not.
    fn post_execute(&mut self, _ctx: &mut Context, _has_error: bool) {}

    fn internal_undo(&mut self, ctx: &mut Context, ledger: &mut ChangeLedger) -> Result<()> {
        ledger.perm(ctx.arena_mut())?;
        Ok(())
    }

    fn internal_redo(&mut self, ctx: &mut Context, ledger: &mut ChangeLedger) -> Result<()> {
        ledger.perm(ctx.arena_mut())?;
        Ok(())
    }

    /// Called when a panic escapes `internal_execute`. Must not allocate.
    fn emergency_cleanup(&mut self) {}
}

struct CommandState {
    operation: Box<dyn Operation>,
    ledger: ChangeLedger,
    executed: bool,
    names_before: NameStats,
    names_after: NameStats,
    message: Option<String>,
}

/// A unit of undoable work on a [`Context`].
pub struct Command {
    id: CommandId,
    name: String,
    status: StatusCell,
    state: Mutex<CommandState>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}

impl Command {
    /// Binds an operation to a new command of `ctx`.
    pub fn new(ctx: &mut Context, operation: impl Operation + 'static) -> Self {
        let id = ctx.allocate_command_id();
        Self {
            id,
            name: operation.name().to_string(),
            status: StatusCell::new(),
            state: Mutex::new(CommandState {
                operation: Box::new(operation),
                ledger: ChangeLedger::new(Some(id)),
                executed: false,
                names_before: NameStats::default(),
                names_after: NameStats::default(),
                message: None,
            }),
        }
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> CommandStatus {
        self.status.get()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            status: self.status.clone(),
        }
    }

    /// Same as [`CancelHandle::cancel`].
    pub fn cancel(&self) -> bool {
        self.cancel_handle().cancel()
    }

    /// Message of the last failure.
    pub fn error_message(&self) -> Option<String> {
        self.state.lock().message.clone()
    }

    /// The command's change ledger.
    pub fn ledger(&self) -> MappedMutexGuard<'_, ChangeLedger> {
        MutexGuard::map(self.state.lock(), |s| &mut s.ledger)
    }

    fn lock(&self) -> Result<MutexGuard<'_, CommandState>> {
        self.state
            .try_lock()
            .ok_or_else(|| CommandError::Busy(self.name.clone()))
    }

    /// Runs the operation.
    ///
    /// On error the model and the name allocator are rolled back and the
    /// command ends in `FAIL` (or `CANCELED`). A panic in the operation is
    /// resumed after the status has been set to `FAIL`.
    pub fn execute(&self, ctx: &mut Context) -> Result<()> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        if state.executed {
            return Err(CommandError::InvalidState(format!(
                "{} has already been executed",
                self.name
            )));
        }
        match self.status.transition(CommandStatus::Inited, CommandStatus::Processing) {
            Ok(()) => {}
            Err(CommandStatus::Canceled) => return Err(CommandError::Canceled),
            Err(other) => {
                return Err(CommandError::InvalidState(format!(
                    "cannot execute {} in state {other}",
                    self.name
                )))
            }
        }
        state.executed = true;
        self.status.mark_executed();
        state.names_before = ctx.arena().names().internal_stats();
        tracing::debug!(command = %self.name, id = %self.id, "Executing command");

        let status = &self.status;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            state.operation.pre_execute(ctx)?;
            let mut scope = ExecutionScope {
                ledger: &mut state.ledger,
                status,
            };
            state.operation.internal_execute(ctx, &mut scope)
        }));

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                self.status.set(CommandStatus::Fail);
                state.operation.emergency_cleanup();
                panic::resume_unwind(payload);
            }
        };

        let result = result.and_then(|()| self.commit(state, ctx));
        match result {
            Ok(()) => {
                state.operation.post_execute(ctx, false);
                state.names_after = ctx.arena().names().internal_stats();
                state.message = None;
                tracing::info!(
                    command = %self.name,
                    id = %self.id,
                    changes = state.ledger.len(),
                    "Command done"
                );
                Ok(())
            }
            Err(err) => {
                let canceled = matches!(err, CommandError::Canceled)
                    || self.status() == CommandStatus::Canceled;
                self.status.set(if canceled {
                    CommandStatus::Canceled
                } else {
                    CommandStatus::Fail
                });
                let err = if canceled { CommandError::Canceled } else { err };
                self.abort(state, ctx, &err);
                Err(err)
            }
        }
    }

    /// Post-success integration: drop temporaries, check the graph,
    /// reconcile groups and display, then move to `DONE`.
    fn commit(&self, state: &mut CommandState, ctx: &mut Context) -> Result<()> {
        if self.status() == CommandStatus::Canceled {
            return Err(CommandError::Canceled);
        }
        let removed = state.ledger.clean_temporaries(ctx.arena_mut());
        if removed > 0 {
            tracing::debug!(command = %self.name, removed, "Temporaries removed");
        }
        if ctx.config().check_invariants {
            ctx.arena().validate()?;
        }
        update_deleted_groups(ctx.arena_mut(), &mut state.ledger)?;

        self.status
            .transition(CommandStatus::Processing, CommandStatus::Done)
            .map_err(|_| CommandError::Canceled)?;
        update_display_properties(ctx, &state.ledger);
        Ok(())
    }

    fn abort(&self, state: &mut CommandState, ctx: &mut Context, err: &CommandError) {
        let message = err.to_string();
        if let Err(rollback) = state.ledger.rollback(ctx.arena_mut()) {
            tracing::error!(command = %self.name, error = %rollback, "Rollback failed");
        }
        ctx.arena_mut().names_mut().set_internal_stats(state.names_before);
        state.operation.post_execute(ctx, true);
        tracing::warn!(
            command = %self.name,
            id = %self.id,
            status = %self.status(),
            error = %message,
            "Command failed"
        );
        state.message = Some(message);
    }

    /// Reverts a `DONE` command.
    pub fn undo(&self, ctx: &mut Context) -> Result<()> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        if self.status() != CommandStatus::Done {
            return Err(CommandError::InvalidState(format!(
                "cannot undo {} in state {}",
                self.name,
                self.status()
            )));
        }
        state.operation.internal_undo(ctx, &mut state.ledger)?;
        update_display_properties(ctx, &state.ledger);
        self.status.set(CommandStatus::Inited);
        tracing::debug!(command = %self.name, id = %self.id, "Command undone");
        Ok(())
    }

    /// Re-applies an undone command.
    pub fn redo(&self, ctx: &mut Context) -> Result<()> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        if self.status() != CommandStatus::Inited || !state.executed {
            return Err(CommandError::InvalidState(format!(
                "cannot redo {} in state {}",
                self.name,
                self.status()
            )));
        }
        match state.operation.internal_redo(ctx, &mut state.ledger) {
            Ok(()) => {}
            Err(CommandError::Canceled) => {
                self.status.set(CommandStatus::Canceled);
                return Err(CommandError::Canceled);
            }
            Err(err) => return Err(err),
        }
        update_display_properties(ctx, &state.ledger);
        self.status.set(CommandStatus::Done);
        tracing::debug!(command = %self.name, id = %self.id, "Command redone");
        Ok(())
    }

    /// Discards the command's undo information.
    ///
    /// An undone command physically removes the entities it created, and
    /// hands their names back when nothing was named since it ran. A `DONE`
    /// command only drops its ledger: what it created may be referenced by
    /// later commands.
    pub fn release(&self, ctx: &mut Context) -> Result<usize> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        if !state.executed {
            return Ok(0);
        }
        let removed = if state.ledger.is_inverted() {
            let removed = state.ledger.release(ctx.arena_mut());
            let names = ctx.arena_mut().names_mut();
            if names.internal_stats() == state.names_after {
                names.set_internal_stats(state.names_before);
            }
            removed
        } else {
            state.ledger.clear();
            0
        };
        tracing::debug!(command = %self.name, id = %self.id, removed, "Command released");
        Ok(removed)
    }
}

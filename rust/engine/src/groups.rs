// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconciliation of groups and display state after a command.
//!
//! After a successful execute the ledger tells which entities appeared and
//! vanished. Groups listing any of them are re-checked: a group left with no
//! live member is deleted, a deleted group that regained a live member is
//! brought back. Both changes are recorded in the command's own ledger, so
//! undo and redo restore them with the rest of the command.

use mgx_topology::{ChangeLedger, EntityKey, EntityType, GroupKey, ModelArena};
use rustc_hash::FxHashSet;

use crate::context::Context;
use crate::error::Result;

/// Groups deleted and revived by [`update_deleted_groups`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GroupChanges {
    pub removed: Vec<GroupKey>,
    pub revived: Vec<GroupKey>,
}

impl GroupChanges {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.revived.is_empty()
    }
}

/// Deletes groups that became empty and revives groups that became non-empty.
pub fn update_deleted_groups(arena: &mut ModelArena, ledger: &mut ChangeLedger) -> Result<GroupChanges> {
    let touched: Vec<EntityKey> = ledger
        .iter()
        .map(|(k, _)| k)
        .filter(|k| k.entity_type() != EntityType::Group)
        .collect();

    let mut seen = FxHashSet::default();
    let mut changes = GroupChanges::default();
    for key in touched {
        for group in arena.all_groups_containing(key) {
            if !seen.insert(group) {
                continue;
            }
            let live = arena.is_live(group.into());
            let populated = arena.group_has_live_member(group);
            if live && !populated {
                arena.retire(ledger, group.into(), None)?;
                changes.removed.push(group);
            } else if !live && populated {
                arena.revive(ledger, group.into())?;
                changes.revived.push(group);
            }
        }
    }

    if !changes.is_empty() {
        tracing::debug!(
            removed = changes.removed.len(),
            revived = changes.revived.len(),
            "Groups reconciled"
        );
    }
    Ok(changes)
}

/// Shows the entities that appeared and hides those that vanished with the
/// last transition of `ledger`. Does nothing outside graphical mode.
pub fn update_display_properties(ctx: &mut Context, ledger: &ChangeLedger) {
    if !ctx.config().graphical {
        return;
    }
    let appeared: Vec<EntityKey> = ledger.appeared().collect();
    let vanished: Vec<EntityKey> = ledger.vanished().collect();
    let display = ctx.display_mut();
    for key in &vanished {
        display.hide(*key);
    }
    for key in &appeared {
        display.show(*key);
    }
    tracing::debug!(shown = appeared.len(), hidden = vanished.len(), "Display refreshed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use mgx_topology::{ChangeKind, Point3};

    #[test]
    fn emptied_group_is_removed_then_revived() {
        let mut arena = ModelArena::new();
        let mut setup = ChangeLedger::new(None);
        let v = arena.add_vertex(&mut setup, Point3::origin());
        let g = arena.add_group(&mut setup, "corner", 0, &[v.into()]).unwrap();

        let mut delete = ChangeLedger::new(None);
        arena.retire(&mut delete, v.into(), None).unwrap();
        let changes = update_deleted_groups(&mut arena, &mut delete).unwrap();
        assert_eq!(changes.removed, vec![g]);
        assert!(!arena.is_live(g.into()));
        assert_eq!(delete.get(g.into()), Some(ChangeKind::Deleted));

        let mut restore = ChangeLedger::new(None);
        arena.revive(&mut restore, v.into()).unwrap();
        let changes = update_deleted_groups(&mut arena, &mut restore).unwrap();
        assert_eq!(changes.revived, vec![g]);
        assert!(arena.is_live(g.into()));
    }

    #[test]
    fn groups_with_live_members_are_left_alone() {
        let mut arena = ModelArena::new();
        let mut setup = ChangeLedger::new(None);
        let a = arena.add_vertex(&mut setup, Point3::origin());
        let b = arena.add_vertex(&mut setup, Point3::new(1.0, 0.0, 0.0));
        arena.add_group(&mut setup, "pair", 0, &[a.into(), b.into()]).unwrap();

        let mut ledger = ChangeLedger::new(None);
        arena.retire(&mut ledger, a.into(), None).unwrap();
        assert!(update_deleted_groups(&mut arena, &mut ledger).unwrap().is_empty());
    }

    #[test]
    fn display_follows_ledger_only_in_graphical_mode() {
        let config = EngineConfig {
            graphical: true,
            ..EngineConfig::new()
        };
        let mut ctx = Context::new(config);
        let mut ledger = ChangeLedger::new(None);
        let v = ctx.arena_mut().add_vertex(&mut ledger, Point3::origin());

        update_display_properties(&mut ctx, &ledger);
        assert!(ctx.display().is_displayed(v.into()));

        ledger.perm(ctx.arena_mut()).unwrap();
        update_display_properties(&mut ctx, &ledger);
        assert!(!ctx.display().is_displayed(v.into()));

        let mut batch = Context::new(EngineConfig::new());
        let mut ledger = ChangeLedger::new(None);
        let v = batch.arena_mut().add_vertex(&mut ledger, Point3::origin());
        update_display_properties(&mut batch, &ledger);
        assert!(!batch.display().is_displayed(v.into()));
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-command change ledger.
//!
//! A [`ChangeLedger`] records, for one command, which entities it created,
//! modified, deleted or replaced, and keeps a copy of every touched record as
//! it was before the command first touched it. That copy is the whole undo
//! story: swapping saved and current records ([`ChangeLedger::perm`]) moves
//! the model back to its pre-command state, and swapping again moves it
//! forward. Created entities are saved as a deleted image of themselves, so a
//! swap hides them.
//!
//! Change kinds are ordered `Modified < Created < Deleted`; recording a
//! weaker kind never overrides a stronger one. An entity created and then
//! deleted by the same command is a temporary: it leaves the change map and
//! is physically removed by [`ChangeLedger::clean_temporaries`].

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::arena::{EntityRecord, ModelArena};
use crate::error::{Error, Result};
use crate::keys::{CommandId, EntityKey, EntityType};

/// What happened to an entity during a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Modified,
    Created,
    Deleted,
    /// Deleted by a fusion; `by` is the keeper.
    Replaced { by: EntityKey },
}

impl ChangeKind {
    fn rank(&self) -> u8 {
        match self {
            ChangeKind::Modified => 0,
            ChangeKind::Created => 1,
            ChangeKind::Deleted | ChangeKind::Replaced { .. } => 2,
        }
    }

    /// `true` for `Deleted` and `Replaced`.
    pub fn is_deletion(&self) -> bool {
        self.rank() == 2
    }
}

/// Change record of one command.
#[derive(Debug, Default)]
pub struct ChangeLedger {
    owner: Option<CommandId>,
    changes: BTreeMap<EntityKey, ChangeKind>,
    saved: FxHashMap<EntityKey, EntityRecord>,
    temporaries: Vec<EntityKey>,
    inverted: bool,
}

impl ChangeLedger {
    /// Creates an empty ledger; entities created through it are tagged with
    /// `owner`.
    pub fn new(owner: Option<CommandId>) -> Self {
        Self {
            owner,
            ..Self::default()
        }
    }

    pub fn owner(&self) -> Option<CommandId> {
        self.owner
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Change recorded for an entity.
    pub fn get(&self, key: EntityKey) -> Option<ChangeKind> {
        self.changes.get(&key).copied()
    }

    /// All recorded changes, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, ChangeKind)> + '_ {
        self.changes.iter().map(|(k, c)| (*k, *c))
    }

    /// Number of changes of a given kind on entities of a given type.
    pub fn count(&self, ty: EntityType, pred: impl Fn(&ChangeKind) -> bool) -> usize {
        self.changes
            .iter()
            .filter(|(k, c)| k.entity_type() == ty && pred(c))
            .count()
    }

    /// Entities recorded as `Replaced`, with their keeper.
    pub fn replaced(&self) -> impl Iterator<Item = (EntityKey, EntityKey)> + '_ {
        self.changes.iter().filter_map(|(k, c)| match c {
            ChangeKind::Replaced { by } => Some((*k, *by)),
            _ => None,
        })
    }

    /// Entities created by the command.
    pub fn created(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.changes
            .iter()
            .filter(|(_, c)| **c == ChangeKind::Created)
            .map(|(k, _)| *k)
    }

    /// `true` after an odd number of [`perm`](Self::perm) calls, i.e. while
    /// the command is undone.
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Entities that became visible with the last transition: created ones
    /// after execute/redo, deleted ones after undo.
    pub fn appeared(&self) -> impl Iterator<Item = EntityKey> + '_ {
        let inverted = self.inverted;
        self.changes
            .iter()
            .filter(move |(_, c)| {
                if inverted {
                    c.is_deletion()
                } else {
                    **c == ChangeKind::Created
                }
            })
            .map(|(k, _)| *k)
    }

    /// Entities that became hidden with the last transition.
    pub fn vanished(&self) -> impl Iterator<Item = EntityKey> + '_ {
        let inverted = self.inverted;
        self.changes
            .iter()
            .filter(move |(_, c)| {
                if inverted {
                    **c == ChangeKind::Created
                } else {
                    c.is_deletion()
                }
            })
            .map(|(k, _)| *k)
    }

    // --- Recording ---

    /// Saves the pre-command image of an entity about to be modified.
    pub fn touch(&mut self, arena: &ModelArena, key: EntityKey) -> Result<()> {
        if !self.saved.contains_key(&key) {
            let record = arena.record(key).ok_or(Error::NotFound(key))?;
            self.saved.insert(key, record);
        }
        self.record(key, ChangeKind::Modified);
        Ok(())
    }

    /// Registers a freshly inserted entity; its saved image is a deleted copy.
    pub(crate) fn record_created(&mut self, arena: &ModelArena, key: EntityKey) -> Result<()> {
        let mut record = arena.record(key).ok_or(Error::NotFound(key))?;
        record.meta_mut().destroyed = true;
        self.saved.insert(key, record);
        self.record(key, ChangeKind::Created);
        Ok(())
    }

    /// Merges a change into the ledger.
    pub fn record(&mut self, key: EntityKey, kind: ChangeKind) {
        match self.changes.get(&key).copied() {
            Some(ChangeKind::Created) if kind.is_deletion() => {
                self.changes.remove(&key);
                self.temporaries.push(key);
            }
            Some(ChangeKind::Replaced { .. }) if kind.is_deletion() => {}
            Some(existing) if existing.rank() > kind.rank() => {}
            _ => {
                self.changes.insert(key, kind);
            }
        }
    }

    // --- Replay ---

    /// Swaps every saved record with the current one.
    ///
    /// Applied once after execute it restores the pre-command model; applied
    /// again it restores the post-command model.
    pub fn perm(&mut self, arena: &mut ModelArena) -> Result<()> {
        for (key, saved) in self.saved.iter_mut() {
            if !arena.contains(*key) {
                continue;
            }
            let current = arena.swap_record(*key, saved.clone())?;
            *saved = current;
        }
        self.inverted = !self.inverted;
        Ok(())
    }

    /// Physically removes the temporaries of this command.
    pub fn clean_temporaries(&mut self, arena: &mut ModelArena) -> usize {
        let mut removed = 0;
        for key in self.temporaries.drain(..) {
            self.saved.remove(&key);
            if arena.remove(key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Restores the pre-command model after a failure and empties the ledger.
    ///
    /// Everything the command created is physically removed.
    pub fn rollback(&mut self, arena: &mut ModelArena) -> Result<()> {
        if !self.inverted {
            self.perm(arena)?;
        }
        let created: Vec<EntityKey> = self.created().chain(self.temporaries.iter().copied()).collect();
        for key in created {
            arena.remove(key);
        }
        self.clear();
        Ok(())
    }

    /// Physically removes entities this command created that are currently
    /// deleted. Called when an undone command is discarded.
    pub fn release(&mut self, arena: &mut ModelArena) -> usize {
        let owner = self.owner;
        let doomed: Vec<EntityKey> = self
            .changes
            .iter()
            .filter(|(_, c)| **c == ChangeKind::Created)
            .map(|(k, _)| *k)
            .chain(self.temporaries.iter().copied())
            .filter(|k| {
                arena
                    .meta(*k)
                    .is_some_and(|m| m.destroyed && m.owner == owner)
            })
            .collect();
        for key in &doomed {
            arena.remove(*key);
        }
        self.clear();
        doomed.len()
    }

    pub fn clear(&mut self) {
        self.changes.clear();
        self.saved.clear();
        self.temporaries.clear();
        self.inverted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn fixture() -> (ModelArena, crate::keys::VertexKey, crate::keys::VertexKey) {
        let mut arena = ModelArena::new();
        let mut setup = ChangeLedger::new(None);
        let a = arena.add_vertex(&mut setup, Point3::new(0.0, 0.0, 0.0));
        let b = arena.add_vertex(&mut setup, Point3::new(1.0, 0.0, 0.0));
        (arena, a, b)
    }

    #[test]
    fn stronger_kind_wins() {
        let (arena, a, _) = fixture();
        let mut ledger = ChangeLedger::new(None);
        ledger.touch(&arena, a.into()).unwrap();
        assert_eq!(ledger.get(a.into()), Some(ChangeKind::Modified));

        ledger.record(a.into(), ChangeKind::Deleted);
        ledger.record(a.into(), ChangeKind::Modified);
        assert_eq!(ledger.get(a.into()), Some(ChangeKind::Deleted));
    }

    #[test]
    fn replaced_is_not_downgraded_to_deleted() {
        let (_, a, b) = fixture();
        let mut ledger = ChangeLedger::new(None);
        ledger.record(a.into(), ChangeKind::Replaced { by: b.into() });
        ledger.record(a.into(), ChangeKind::Deleted);
        assert_eq!(ledger.get(a.into()), Some(ChangeKind::Replaced { by: b.into() }));
        assert_eq!(ledger.replaced().count(), 1);
    }

    #[test]
    fn created_then_deleted_is_temporary() {
        let (mut arena, _, _) = fixture();
        let mut ledger = ChangeLedger::new(Some(CommandId(7)));
        let t = arena.add_vertex(&mut ledger, Point3::new(5.0, 5.0, 5.0));
        arena.retire(&mut ledger, t.into(), None).unwrap();

        assert_eq!(ledger.get(t.into()), None);
        assert_eq!(ledger.clean_temporaries(&mut arena), 1);
        assert!(!arena.contains(t.into()));
    }

    #[test]
    fn perm_swaps_back_and_forth() {
        let (mut arena, a, _) = fixture();
        let mut ledger = ChangeLedger::new(None);
        arena.edit_vertex(&mut ledger, a).unwrap().coord = Point3::new(9.0, 9.0, 9.0);
        let c = arena.add_vertex(&mut ledger, Point3::new(2.0, 0.0, 0.0));

        ledger.perm(&mut arena).unwrap();
        assert!(ledger.is_inverted());
        assert_eq!(arena.vertex_point(a), Some(Point3::new(0.0, 0.0, 0.0)));
        assert!(!arena.is_live(c.into()));
        assert_eq!(ledger.appeared().count(), 0);
        assert_eq!(ledger.vanished().collect::<Vec<_>>(), vec![EntityKey::Vertex(c)]);

        ledger.perm(&mut arena).unwrap();
        assert!(!ledger.is_inverted());
        assert_eq!(arena.vertex_point(a), Some(Point3::new(9.0, 9.0, 9.0)));
        assert!(arena.is_live(c.into()));
    }

    #[test]
    fn rollback_removes_created_entities() {
        let (mut arena, a, _) = fixture();
        let before = arena.clone();
        let mut ledger = ChangeLedger::new(Some(CommandId(1)));
        let c = arena.add_vertex(&mut ledger, Point3::new(2.0, 0.0, 0.0));
        arena.add_coedge(&mut ledger, a, c).unwrap();

        ledger.rollback(&mut arena).unwrap();
        assert!(ledger.is_empty());
        assert_eq!(arena.total_count(), before.total_count());
        assert_eq!(arena.live_vertex(a).unwrap(), before.live_vertex(a).unwrap());
    }

    #[test]
    fn release_only_removes_owned_deleted_entities() {
        let (mut arena, a, _) = fixture();
        let mut ledger = ChangeLedger::new(Some(CommandId(3)));
        let c = arena.add_vertex(&mut ledger, Point3::new(2.0, 0.0, 0.0));
        arena.edit_vertex(&mut ledger, a).unwrap();

        // Undone: the created vertex is hidden and can be dropped.
        ledger.perm(&mut arena).unwrap();
        assert_eq!(ledger.release(&mut arena), 1);
        assert!(!arena.contains(c.into()));
        assert!(arena.is_live(a.into()));
    }
}

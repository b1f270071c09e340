// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Named groups of entities.
//!
//! Groups are ordinary ledger-tracked entities: their membership lists and
//! deletion flag are saved and restored by undo like any other record.
//! Membership is kept when a member is deleted, so a group whose members are
//! all deleted is "empty" without losing the information needed to bring it
//! back.

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;
use crate::ledger::ChangeLedger;

impl ModelArena {
    /// Creates a group. An empty `name` gets a generated one.
    pub fn add_group(
        &mut self,
        ledger: &mut ChangeLedger,
        name: &str,
        dim: u8,
        members: &[EntityKey],
    ) -> Result<GroupKey> {
        if !name.is_empty() && self.find_group(name).is_some() {
            return Err(Error::DuplicateGroup(name.to_string()));
        }
        for &m in members {
            self.ensure_live(m)?;
        }

        let mut meta = self.new_meta(ledger, EntityType::Group);
        if !name.is_empty() {
            meta.name = name.to_string();
        }
        let key = self.groups.insert(GroupData {
            meta,
            dim,
            members: members.to_vec(),
        });
        ledger.record_created(self, key.into())?;
        Ok(key)
    }

    /// Adds an entity to a group; adding an existing member is a no-op.
    pub fn add_to_group(&mut self, ledger: &mut ChangeLedger, group: GroupKey, member: EntityKey) -> Result<()> {
        self.ensure_live(member)?;
        if self.group(group).ok_or(Error::NotFound(group.into()))?.members.contains(&member) {
            return Ok(());
        }
        self.edit_group(ledger, group)?.members.push(member);
        Ok(())
    }

    /// Live group with the given name.
    pub fn find_group(&self, name: &str) -> Option<GroupKey> {
        self.groups().find(|(_, g)| g.meta.name == name).map(|(k, _)| k)
    }

    /// Live groups listing `member`.
    pub fn groups_containing(&self, member: EntityKey) -> Vec<GroupKey> {
        self.groups()
            .filter(|(_, g)| g.members.contains(&member))
            .map(|(k, _)| k)
            .collect()
    }

    /// Groups listing `member`, deleted groups included.
    pub fn all_groups_containing(&self, member: EntityKey) -> Vec<GroupKey> {
        self.groups
            .iter()
            .filter(|(_, g)| g.members.contains(&member))
            .map(|(k, _)| k)
            .collect()
    }

    /// `true` if at least one member of the group is live.
    pub fn group_has_live_member(&self, group: GroupKey) -> bool {
        self.group(group)
            .is_some_and(|g| g.members.iter().any(|m| self.is_live(*m)))
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unique name allocation.
//!
//! Every entity receives a name made of its type prefix and a per-type
//! counter (`Som0`, `Ar12`, `Surf3`, ...). Counters only move forward while
//! commands succeed; the command engine snapshots them before a command runs
//! and restores the snapshot when the command fails, so a failed command
//! leaves no gap in the sequence. A name freed by deletion is never handed
//! out again unless the counters are explicitly rewound.

use crate::keys::EntityType;

/// Snapshot of the allocator counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NameStats {
    counters: [u64; EntityType::ALL.len()],
}

impl NameStats {
    /// Counter value for one entity type.
    pub fn get(&self, ty: EntityType) -> u64 {
        self.counters[ty.index()]
    }
}

/// Per-type monotonic name allocator.
#[derive(Debug, Clone, Default)]
pub struct NameManager {
    stats: NameStats,
}

impl NameManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next name for the given type.
    pub fn next_name(&mut self, ty: EntityType) -> String {
        let counter = &mut self.stats.counters[ty.index()];
        let name = format!("{}{}", ty.name_prefix(), counter);
        *counter += 1;
        name
    }

    /// Current counters.
    pub fn internal_stats(&self) -> NameStats {
        self.stats
    }

    /// Replaces the counters with a previously taken snapshot.
    pub fn set_internal_stats(&mut self, stats: NameStats) {
        self.stats = stats;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_prefixed_and_sequential() {
        let mut names = NameManager::new();
        assert_eq!(names.next_name(EntityType::Vertex), "Som0");
        assert_eq!(names.next_name(EntityType::Vertex), "Som1");
        assert_eq!(names.next_name(EntityType::CoEdge), "Ar0");
        assert_eq!(names.next_name(EntityType::Surface), "Surf0");
    }

    #[test]
    fn snapshot_restores_counters() {
        let mut names = NameManager::new();
        names.next_name(EntityType::CoFace);
        let snapshot = names.internal_stats();

        names.next_name(EntityType::CoFace);
        names.next_name(EntityType::Block);
        assert_eq!(names.internal_stats().get(EntityType::CoFace), 2);

        names.set_internal_stats(snapshot);
        assert_eq!(names.internal_stats(), snapshot);
        assert_eq!(names.next_name(EntityType::CoFace), "Fa1");
        assert_eq!(names.next_name(EntityType::Block), "Bl0");
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structural invariant checks.
//!
//! A committed model satisfies:
//!
//! - **Symmetry**: if a live entity lists B as a neighbour, B lists it back.
//! - **Closure**: every entity referenced by a live entity (neighbours and
//!   geometric associations) is itself live.
//! - **Uniqueness**: no two live entities share a name.
//! - **Closed boundaries**: every live co-face boundary is a closed loop.
//!
//! Deleted records are not checked; they keep whatever adjacency they had
//! when they were retired.

use rustc_hash::FxHashSet;

use crate::arena::ModelArena;
use crate::error::{Error, Result};
use crate::keys::*;
use crate::traversal::walk_loop;

/// A broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("{from} lists {to}, which does not list it back")]
    Asymmetric { from: String, to: String },

    #[error("{from} references {to}, which is missing or deleted")]
    Dangling { from: String, to: String },

    #[error("name {0} is used by more than one live entity")]
    DuplicateName(String),

    #[error("boundary of {0} is not a closed loop")]
    OpenBoundary(String),
}

impl ModelArena {
    /// Neighbours of an entity in the adjacency graph, both directions.
    pub fn adjacency(&self, key: EntityKey) -> Vec<EntityKey> {
        fn keys<K: Copy + Into<EntityKey>>(list: &[K]) -> impl Iterator<Item = EntityKey> + '_ {
            list.iter().map(|k| (*k).into())
        }

        match key {
            EntityKey::Vertex(k) => self.vertex(k).map(|d| keys(&d.coedges).collect()),
            EntityKey::CoEdge(k) => self
                .coedge(k)
                .map(|d| keys(&d.vertices).chain(keys(&d.cofaces)).collect()),
            EntityKey::CoFace(k) => self
                .coface(k)
                .map(|d| keys(&d.coedges).chain(keys(&d.blocks)).collect()),
            EntityKey::Block(k) => self.block(k).map(|d| keys(&d.cofaces).collect()),
            EntityKey::Point(k) => self.point(k).map(|d| keys(&d.curves).collect()),
            EntityKey::Curve(k) => self
                .curve(k)
                .map(|d| keys(&d.points).chain(keys(&d.surfaces)).collect()),
            EntityKey::Surface(k) => self
                .surface(k)
                .map(|d| keys(&d.curves).chain(keys(&d.volumes)).collect()),
            EntityKey::Volume(k) => self.volume(k).map(|d| keys(&d.surfaces).collect()),
            EntityKey::Group(_) => None,
        }
        .unwrap_or_default()
    }

    /// Every invariant violation in the model.
    pub fn violations(&self) -> Vec<Violation> {
        let mut found = Vec::new();
        let mut names = FxHashSet::default();
        let name = |k: EntityKey| self.name_of(k).to_string();

        for key in self.live_keys() {
            if !names.insert(self.name_of(key)) {
                found.push(Violation::DuplicateName(name(key)));
            }

            for neighbour in self.adjacency(key) {
                if !self.is_live(neighbour) {
                    found.push(Violation::Dangling {
                        from: name(key),
                        to: name(neighbour),
                    });
                } else if !self.adjacency(neighbour).contains(&key) {
                    found.push(Violation::Asymmetric {
                        from: name(key),
                        to: name(neighbour),
                    });
                }
            }

            if let Some(geom) = self.geom_of(key) {
                if !self.is_live(geom.into()) {
                    found.push(Violation::Dangling {
                        from: name(key),
                        to: name(geom.into()),
                    });
                }
            }

            if let EntityKey::CoFace(f) = key {
                let closed = self
                    .coface(f)
                    .is_some_and(|d| walk_loop(self, &d.coedges).is_ok());
                if !closed {
                    found.push(Violation::OpenBoundary(name(key)));
                }
            }
        }
        found
    }

    /// Fails with the first invariant violation, if any.
    pub fn validate(&self) -> Result<()> {
        match self.violations().into_iter().next() {
            Some(v) => Err(Error::Invariant(v)),
            None => Ok(()),
        }
    }
}

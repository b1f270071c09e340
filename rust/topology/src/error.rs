// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for entity graph operations.

use crate::correspondence::CorrespondenceError;
use crate::keys::{EntityKey, EntityType};
use crate::validate::Violation;

/// Result type alias for entity graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during entity graph operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced entity is not present in the arena.
    #[error("entity not found: {0:?}")]
    NotFound(EntityKey),

    /// A referenced entity exists but has been deleted.
    #[error("entity {0} has been deleted")]
    Destroyed(String),

    /// An operation expected a different kind of entity.
    #[error("expected a {expected}, got a {found}")]
    WrongType {
        expected: EntityType,
        found: EntityType,
    },

    /// A co-edge would join a vertex to itself.
    #[error("degenerate co-edge: both ends are vertex {0}")]
    DegenerateCoEdge(String),

    /// A co-face needs at least 3 co-edges.
    #[error("co-face boundary has fewer than 3 co-edges")]
    DegenerateCoFace,

    /// Consecutive co-edges of a face boundary share no vertex.
    #[error("co-face boundary is not a closed loop: co-edge {0} does not meet co-edge {1}")]
    DisconnectedBoundary(usize, usize),

    /// A block, curve, surface or volume was given no children.
    #[error("{0} needs at least one bounding entity")]
    EmptyBoundary(EntityType),

    /// An entity cannot be merged into itself.
    #[error("entity {0} cannot be fused with itself")]
    SelfFusion(String),

    /// Two entities to merge do not bound the same vertices.
    #[error("cannot fuse {keeper} with {other}: their vertices differ")]
    MismatchedBoundary { keeper: String, other: String },

    /// Curves to join do not form a single open or closed chain.
    #[error("curves do not form a chain: {0}")]
    BrokenChain(String),

    /// A group with this name already exists.
    #[error("group {0} already exists")]
    DuplicateGroup(String),

    /// The graph no longer satisfies one of its structural invariants.
    #[error("invariant violated: {0}")]
    Invariant(#[from] Violation),

    /// The nearest-vertex matching failed.
    #[error(transparent)]
    Correspondence(#[from] CorrespondenceError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

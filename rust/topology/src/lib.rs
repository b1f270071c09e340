// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # MGX Topology
//!
//! In-memory entity graph of a mesh-preparation model.
//!
//! Two parallel hierarchies live in one arena: the topological one
//! (vertices, co-edges, co-faces, blocks) that meshing works on, and the
//! geometric one (points, curves, surfaces, volumes) it is associated with.
//! Every entity is stored in a slot map under a stable generational key,
//! adjacency is kept on both sides as key lists, and deletion is a flag so
//! that undo can bring an entity back untouched.
//!
//! All mutation is recorded in a [`ChangeLedger`] owned by the command that
//! performs it. The ledger keeps the pre-command image of every touched
//! record, which is enough to roll back a failed command and to undo or
//! redo a committed one.
//!
//! On top of the graph sit the primitives the fusion commands are built
//! from: a nearest-vertex [`correspondence`] solver and the merge/unite
//! operations of [`surgery`], and the curve chaining of [`traversal`].

pub mod arena;
pub mod construction;
pub mod correspondence;
pub mod error;
pub mod geometry;
pub mod group;
pub mod keys;
pub mod ledger;
pub mod naming;
pub mod serialization;
pub mod surgery;
pub mod traversal;
pub mod validate;

pub use arena::{EntityMeta, EntityRecord, ModelArena};
pub use correspondence::{Correspondence, CorrespondenceError, MatchOptions};
pub use error::{Error, Result};
pub use geometry::Representation;
pub use keys::{
    BlockKey, CoEdgeKey, CoFaceKey, CommandId, CurveKey, EntityKey, EntityType, GeomKey, GroupKey,
    PointKey, SurfaceKey, VertexKey, VolumeKey,
};
pub use ledger::{ChangeKind, ChangeLedger};
pub use naming::{NameManager, NameStats};
pub use serialization::ModelSnapshot;
pub use traversal::CurveChain;
pub use validate::Violation;

pub use nalgebra::Point3;

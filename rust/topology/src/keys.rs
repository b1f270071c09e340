// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity key types for arena-based storage.
//!
//! Each entity gets a unique, type-safe key for O(1) lookup in the arena.
//! Keys are created by `slotmap::SlotMap` and remain valid even after other
//! entities are removed (generational indices). A key never aliases a
//! different entity, so a stale reference is detected rather than followed.

use slotmap::new_key_type;

new_key_type! {
    /// Key for a topological vertex.
    pub struct VertexKey;

    /// Key for a topological edge (ordered pair of vertices).
    pub struct CoEdgeKey;

    /// Key for a topological face (closed loop of co-edges).
    pub struct CoFaceKey;

    /// Key for a topological block (bounded by co-faces).
    pub struct BlockKey;

    /// Key for a geometric point.
    pub struct PointKey;

    /// Key for a geometric curve.
    pub struct CurveKey;

    /// Key for a geometric surface.
    pub struct SurfaceKey;

    /// Key for a geometric volume.
    pub struct VolumeKey;

    /// Key for a named group of entities.
    pub struct GroupKey;
}

/// Identifier of the command that created an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub u64);

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cmd#{}", self.0)
    }
}

/// A key that can reference any entity of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    Vertex(VertexKey),
    CoEdge(CoEdgeKey),
    CoFace(CoFaceKey),
    Block(BlockKey),
    Point(PointKey),
    Curve(CurveKey),
    Surface(SurfaceKey),
    Volume(VolumeKey),
    Group(GroupKey),
}

impl EntityKey {
    /// Returns the entity type of this key.
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityKey::Vertex(_) => EntityType::Vertex,
            EntityKey::CoEdge(_) => EntityType::CoEdge,
            EntityKey::CoFace(_) => EntityType::CoFace,
            EntityKey::Block(_) => EntityType::Block,
            EntityKey::Point(_) => EntityType::Point,
            EntityKey::Curve(_) => EntityType::Curve,
            EntityKey::Surface(_) => EntityType::Surface,
            EntityKey::Volume(_) => EntityType::Volume,
            EntityKey::Group(_) => EntityType::Group,
        }
    }
}

/// Discriminant for entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    Vertex = 0,
    CoEdge = 1,
    CoFace = 2,
    Block = 3,
    Point = 4,
    Curve = 5,
    Surface = 6,
    Volume = 7,
    Group = 8,
}

impl EntityType {
    /// All entity types, in discriminant order.
    pub const ALL: [EntityType; 9] = [
        EntityType::Vertex,
        EntityType::CoEdge,
        EntityType::CoFace,
        EntityType::Block,
        EntityType::Point,
        EntityType::Curve,
        EntityType::Surface,
        EntityType::Volume,
        EntityType::Group,
    ];

    /// Returns the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Vertex => "Vertex",
            EntityType::CoEdge => "CoEdge",
            EntityType::CoFace => "CoFace",
            EntityType::Block => "Block",
            EntityType::Point => "Point",
            EntityType::Curve => "Curve",
            EntityType::Surface => "Surface",
            EntityType::Volume => "Volume",
            EntityType::Group => "Group",
        }
    }

    /// Topological dimension, or `None` for groups (whose dimension is a
    /// property of the group itself).
    pub fn dim(&self) -> Option<u8> {
        match self {
            EntityType::Vertex | EntityType::Point => Some(0),
            EntityType::CoEdge | EntityType::Curve => Some(1),
            EntityType::CoFace | EntityType::Surface => Some(2),
            EntityType::Block | EntityType::Volume => Some(3),
            EntityType::Group => None,
        }
    }

    /// Prefix of generated names.
    pub fn name_prefix(&self) -> &'static str {
        match self {
            EntityType::Vertex => "Som",
            EntityType::CoEdge => "Ar",
            EntityType::CoFace => "Fa",
            EntityType::Block => "Bl",
            EntityType::Point => "Pt",
            EntityType::Curve => "Crb",
            EntityType::Surface => "Surf",
            EntityType::Volume => "Vol",
            EntityType::Group => "Gr",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference from a topological entity to the geometric entity it is
/// associated with (for projection and snapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeomKey {
    Point(PointKey),
    Curve(CurveKey),
    Surface(SurfaceKey),
    Volume(VolumeKey),
}

impl GeomKey {
    /// Dimension of the geometric entity.
    pub fn dim(&self) -> u8 {
        match self {
            GeomKey::Point(_) => 0,
            GeomKey::Curve(_) => 1,
            GeomKey::Surface(_) => 2,
            GeomKey::Volume(_) => 3,
        }
    }
}

impl From<GeomKey> for EntityKey {
    fn from(k: GeomKey) -> Self {
        match k {
            GeomKey::Point(k) => EntityKey::Point(k),
            GeomKey::Curve(k) => EntityKey::Curve(k),
            GeomKey::Surface(k) => EntityKey::Surface(k),
            GeomKey::Volume(k) => EntityKey::Volume(k),
        }
    }
}

macro_rules! entity_key_from {
    ($($key:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$key> for EntityKey {
                fn from(k: $key) -> Self {
                    EntityKey::$variant(k)
                }
            }
        )*
    };
}

entity_key_from! {
    VertexKey => Vertex,
    CoEdgeKey => CoEdge,
    CoFaceKey => CoFace,
    BlockKey => Block,
    PointKey => Point,
    CurveKey => Curve,
    SurfaceKey => Surface,
    VolumeKey => Volume,
    GroupKey => Group,
}

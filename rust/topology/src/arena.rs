// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for model entities.
//!
//! The [`ModelArena`] is the single authoritative owner of every entity. Each
//! entity lives in a slot map with stable, generational keys; every other
//! holder (adjacency lists, groups, ledgers, callers) stores keys only and
//! must consult the arena before assuming an entity is alive.
//!
//! ## Adjacency
//!
//! Adjacency is stored on both sides as key lists: a co-edge lists its two
//! vertices and each vertex lists the co-edges using it. Because every record
//! carries its full adjacency, swapping a record for an earlier copy of it
//! restores its links exactly, which is what the change ledger relies on.
//!
//! ## Deletion
//!
//! Deleting an entity only sets its `destroyed` flag (and, for fusions, the
//! `replaced_by` keeper). Physical removal happens when the owning command is
//! released or rolled back.

use nalgebra::Point3;
use slotmap::SlotMap;

use crate::error::{Error, Result};
use crate::geometry::Representation;
use crate::keys::*;
use crate::naming::NameManager;

/// Bookkeeping shared by every entity record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityMeta {
    /// Process-unique name.
    pub name: String,
    /// Set when the entity is deleted; the record stays until released.
    pub destroyed: bool,
    /// Command that created the entity (`None` for entities built outside a
    /// command, such as test fixtures).
    pub owner: Option<CommandId>,
    /// Keeper this entity was fused into.
    pub replaced_by: Option<EntityKey>,
}

/// A topological vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexData {
    pub meta: EntityMeta,
    pub coord: Point3<f64>,
    pub coedges: Vec<CoEdgeKey>,
    pub geom: Option<GeomKey>,
}

/// A topological edge between two vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct CoEdgeData {
    pub meta: EntityMeta,
    pub vertices: [VertexKey; 2],
    pub cofaces: Vec<CoFaceKey>,
    pub geom: Option<GeomKey>,
}

/// A topological face bounded by a closed loop of co-edges.
#[derive(Debug, Clone, PartialEq)]
pub struct CoFaceData {
    pub meta: EntityMeta,
    /// Boundary co-edges in loop order.
    pub coedges: Vec<CoEdgeKey>,
    pub blocks: Vec<BlockKey>,
    pub geom: Option<GeomKey>,
}

/// A topological block bounded by co-faces.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockData {
    pub meta: EntityMeta,
    pub cofaces: Vec<CoFaceKey>,
    pub geom: Option<GeomKey>,
}

/// A geometric point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointData {
    pub meta: EntityMeta,
    pub coord: Point3<f64>,
    pub curves: Vec<CurveKey>,
}

/// A geometric curve through points.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveData {
    pub meta: EntityMeta,
    pub points: Vec<PointKey>,
    pub surfaces: Vec<SurfaceKey>,
    pub rep: Representation,
}

/// A geometric surface bounded by curves.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceData {
    pub meta: EntityMeta,
    pub curves: Vec<CurveKey>,
    pub volumes: Vec<VolumeKey>,
    pub rep: Representation,
}

/// A geometric volume bounded by surfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeData {
    pub meta: EntityMeta,
    pub surfaces: Vec<SurfaceKey>,
}

/// A named set of entities of one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupData {
    pub meta: EntityMeta,
    pub dim: u8,
    pub members: Vec<EntityKey>,
}

/// Owned copy of any entity record, used by the change ledger to save and
/// restore entities.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRecord {
    Vertex(VertexData),
    CoEdge(CoEdgeData),
    CoFace(CoFaceData),
    Block(BlockData),
    Point(PointData),
    Curve(CurveData),
    Surface(SurfaceData),
    Volume(VolumeData),
    Group(GroupData),
}

impl EntityRecord {
    pub fn meta(&self) -> &EntityMeta {
        match self {
            EntityRecord::Vertex(d) => &d.meta,
            EntityRecord::CoEdge(d) => &d.meta,
            EntityRecord::CoFace(d) => &d.meta,
            EntityRecord::Block(d) => &d.meta,
            EntityRecord::Point(d) => &d.meta,
            EntityRecord::Curve(d) => &d.meta,
            EntityRecord::Surface(d) => &d.meta,
            EntityRecord::Volume(d) => &d.meta,
            EntityRecord::Group(d) => &d.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut EntityMeta {
        match self {
            EntityRecord::Vertex(d) => &mut d.meta,
            EntityRecord::CoEdge(d) => &mut d.meta,
            EntityRecord::CoFace(d) => &mut d.meta,
            EntityRecord::Block(d) => &mut d.meta,
            EntityRecord::Point(d) => &mut d.meta,
            EntityRecord::Curve(d) => &mut d.meta,
            EntityRecord::Surface(d) => &mut d.meta,
            EntityRecord::Volume(d) => &mut d.meta,
            EntityRecord::Group(d) => &mut d.meta,
        }
    }
}

/// The central arena that owns all entities and the name allocator.
///
/// # Example
///
/// ```
/// use mgx_topology::{ChangeLedger, ModelArena};
/// use nalgebra::Point3;
///
/// let mut arena = ModelArena::new();
/// let mut ledger = ChangeLedger::new(None);
/// let v0 = arena.add_vertex(&mut ledger, Point3::new(0.0, 0.0, 0.0));
/// let v1 = arena.add_vertex(&mut ledger, Point3::new(1.0, 0.0, 0.0));
/// let e = arena.add_coedge(&mut ledger, v0, v1).unwrap();
///
/// assert_eq!(arena.coedge_count(), 1);
/// assert_eq!(arena.name_of(e.into()), "Ar0");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelArena {
    pub(crate) vertices: SlotMap<VertexKey, VertexData>,
    pub(crate) coedges: SlotMap<CoEdgeKey, CoEdgeData>,
    pub(crate) cofaces: SlotMap<CoFaceKey, CoFaceData>,
    pub(crate) blocks: SlotMap<BlockKey, BlockData>,
    pub(crate) points: SlotMap<PointKey, PointData>,
    pub(crate) curves: SlotMap<CurveKey, CurveData>,
    pub(crate) surfaces: SlotMap<SurfaceKey, SurfaceData>,
    pub(crate) volumes: SlotMap<VolumeKey, VolumeData>,
    pub(crate) groups: SlotMap<GroupKey, GroupData>,

    pub(crate) names: NameManager,
}

macro_rules! entity_accessors {
    ($($field:ident: $key:ident => $data:ident {
        get: $get:ident,
        live: $live:ident,
        get_mut: $get_mut:ident,
        iter: $iter:ident,
        count: $count:ident $(,)?
    })*) => {
        impl ModelArena {
            $(
                #[doc = concat!("Returns the `", stringify!($data), "` record, live or deleted.")]
                pub fn $get(&self, key: $key) -> Option<&$data> {
                    self.$field.get(key)
                }

                #[doc = concat!("Returns the `", stringify!($data), "` record, failing if it is missing or deleted.")]
                pub fn $live(&self, key: $key) -> Result<&$data> {
                    let data = self.$field.get(key).ok_or(Error::NotFound(key.into()))?;
                    if data.meta.destroyed {
                        return Err(Error::Destroyed(data.meta.name.clone()));
                    }
                    Ok(data)
                }

                pub(crate) fn $get_mut(&mut self, key: $key) -> Result<&mut $data> {
                    self.$field.get_mut(key).ok_or(Error::NotFound(key.into()))
                }

                #[doc = concat!("Iterates over live `", stringify!($data), "` records.")]
                pub fn $iter(&self) -> impl Iterator<Item = ($key, &$data)> + '_ {
                    self.$field.iter().filter(|(_, d)| !d.meta.destroyed)
                }

                #[doc = concat!("Number of live `", stringify!($data), "` records.")]
                pub fn $count(&self) -> usize {
                    self.$iter().count()
                }
            )*
        }
    };
}

entity_accessors! {
    vertices: VertexKey => VertexData {
        get: vertex, live: live_vertex, get_mut: vertex_mut, iter: vertices, count: vertex_count,
    }
    coedges: CoEdgeKey => CoEdgeData {
        get: coedge, live: live_coedge, get_mut: coedge_mut, iter: coedges, count: coedge_count,
    }
    cofaces: CoFaceKey => CoFaceData {
        get: coface, live: live_coface, get_mut: coface_mut, iter: cofaces, count: coface_count,
    }
    blocks: BlockKey => BlockData {
        get: block, live: live_block, get_mut: block_mut, iter: blocks, count: block_count,
    }
    points: PointKey => PointData {
        get: point, live: live_point, get_mut: point_mut, iter: points, count: point_count,
    }
    curves: CurveKey => CurveData {
        get: curve, live: live_curve, get_mut: curve_mut, iter: curves, count: curve_count,
    }
    surfaces: SurfaceKey => SurfaceData {
        get: surface, live: live_surface, get_mut: surface_mut, iter: surfaces, count: surface_count,
    }
    volumes: VolumeKey => VolumeData {
        get: volume, live: live_volume, get_mut: volume_mut, iter: volumes, count: volume_count,
    }
    groups: GroupKey => GroupData {
        get: group, live: live_group, get_mut: group_mut, iter: groups, count: group_count,
    }
}

impl ModelArena {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// The unique-name allocator.
    pub fn names(&self) -> &NameManager {
        &self.names
    }

    pub fn names_mut(&mut self) -> &mut NameManager {
        &mut self.names
    }

    // --- Generic access by EntityKey ---

    /// Returns `true` if the key references a stored record (live or deleted).
    pub fn contains(&self, key: EntityKey) -> bool {
        match key {
            EntityKey::Vertex(k) => self.vertices.contains_key(k),
            EntityKey::CoEdge(k) => self.coedges.contains_key(k),
            EntityKey::CoFace(k) => self.cofaces.contains_key(k),
            EntityKey::Block(k) => self.blocks.contains_key(k),
            EntityKey::Point(k) => self.points.contains_key(k),
            EntityKey::Curve(k) => self.curves.contains_key(k),
            EntityKey::Surface(k) => self.surfaces.contains_key(k),
            EntityKey::Volume(k) => self.volumes.contains_key(k),
            EntityKey::Group(k) => self.groups.contains_key(k),
        }
    }

    /// Bookkeeping of any entity.
    pub fn meta(&self, key: EntityKey) -> Option<&EntityMeta> {
        match key {
            EntityKey::Vertex(k) => self.vertices.get(k).map(|d| &d.meta),
            EntityKey::CoEdge(k) => self.coedges.get(k).map(|d| &d.meta),
            EntityKey::CoFace(k) => self.cofaces.get(k).map(|d| &d.meta),
            EntityKey::Block(k) => self.blocks.get(k).map(|d| &d.meta),
            EntityKey::Point(k) => self.points.get(k).map(|d| &d.meta),
            EntityKey::Curve(k) => self.curves.get(k).map(|d| &d.meta),
            EntityKey::Surface(k) => self.surfaces.get(k).map(|d| &d.meta),
            EntityKey::Volume(k) => self.volumes.get(k).map(|d| &d.meta),
            EntityKey::Group(k) => self.groups.get(k).map(|d| &d.meta),
        }
    }

    pub(crate) fn meta_mut(&mut self, key: EntityKey) -> Result<&mut EntityMeta> {
        let meta = match key {
            EntityKey::Vertex(k) => self.vertices.get_mut(k).map(|d| &mut d.meta),
            EntityKey::CoEdge(k) => self.coedges.get_mut(k).map(|d| &mut d.meta),
            EntityKey::CoFace(k) => self.cofaces.get_mut(k).map(|d| &mut d.meta),
            EntityKey::Block(k) => self.blocks.get_mut(k).map(|d| &mut d.meta),
            EntityKey::Point(k) => self.points.get_mut(k).map(|d| &mut d.meta),
            EntityKey::Curve(k) => self.curves.get_mut(k).map(|d| &mut d.meta),
            EntityKey::Surface(k) => self.surfaces.get_mut(k).map(|d| &mut d.meta),
            EntityKey::Volume(k) => self.volumes.get_mut(k).map(|d| &mut d.meta),
            EntityKey::Group(k) => self.groups.get_mut(k).map(|d| &mut d.meta),
        };
        meta.ok_or(Error::NotFound(key))
    }

    /// Returns `true` if the entity exists and is not deleted.
    pub fn is_live(&self, key: EntityKey) -> bool {
        self.meta(key).is_some_and(|m| !m.destroyed)
    }

    /// Fails unless the entity exists and is not deleted.
    pub fn ensure_live(&self, key: EntityKey) -> Result<()> {
        let meta = self.meta(key).ok_or(Error::NotFound(key))?;
        if meta.destroyed {
            return Err(Error::Destroyed(meta.name.clone()));
        }
        Ok(())
    }

    /// Name of an entity, or `"?"` when the key is unknown.
    pub fn name_of(&self, key: EntityKey) -> &str {
        self.meta(key).map(|m| m.name.as_str()).unwrap_or("?")
    }

    /// Looks up a live entity by name.
    pub fn find_by_name(&self, name: &str) -> Option<EntityKey> {
        self.live_keys()
            .find(|k| self.meta(*k).is_some_and(|m| m.name == name))
    }

    /// Follows `replaced_by` links to the live keeper of a fused entity.
    ///
    /// Returns the key itself when it was never replaced. The walk is bounded
    /// by the number of stored records so a malformed chain cannot loop.
    pub fn resolve(&self, key: EntityKey) -> EntityKey {
        let mut current = key;
        for _ in 0..=self.total_count() {
            match self.meta(current).and_then(|m| m.replaced_by) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    /// Clones the record stored under `key`.
    pub fn record(&self, key: EntityKey) -> Option<EntityRecord> {
        match key {
            EntityKey::Vertex(k) => self.vertices.get(k).cloned().map(EntityRecord::Vertex),
            EntityKey::CoEdge(k) => self.coedges.get(k).cloned().map(EntityRecord::CoEdge),
            EntityKey::CoFace(k) => self.cofaces.get(k).cloned().map(EntityRecord::CoFace),
            EntityKey::Block(k) => self.blocks.get(k).cloned().map(EntityRecord::Block),
            EntityKey::Point(k) => self.points.get(k).cloned().map(EntityRecord::Point),
            EntityKey::Curve(k) => self.curves.get(k).cloned().map(EntityRecord::Curve),
            EntityKey::Surface(k) => self.surfaces.get(k).cloned().map(EntityRecord::Surface),
            EntityKey::Volume(k) => self.volumes.get(k).cloned().map(EntityRecord::Volume),
            EntityKey::Group(k) => self.groups.get(k).cloned().map(EntityRecord::Group),
        }
    }

    /// Replaces the record stored under `key` and returns the previous one.
    pub(crate) fn swap_record(&mut self, key: EntityKey, record: EntityRecord) -> Result<EntityRecord> {
        fn swap<K: slotmap::Key, T>(map: &mut SlotMap<K, T>, k: K, data: T, key: EntityKey) -> Result<T> {
            let slot = map.get_mut(k).ok_or(Error::NotFound(key))?;
            Ok(std::mem::replace(slot, data))
        }

        Ok(match (key, record) {
            (EntityKey::Vertex(k), EntityRecord::Vertex(d)) => EntityRecord::Vertex(swap(&mut self.vertices, k, d, key)?),
            (EntityKey::CoEdge(k), EntityRecord::CoEdge(d)) => EntityRecord::CoEdge(swap(&mut self.coedges, k, d, key)?),
            (EntityKey::CoFace(k), EntityRecord::CoFace(d)) => EntityRecord::CoFace(swap(&mut self.cofaces, k, d, key)?),
            (EntityKey::Block(k), EntityRecord::Block(d)) => EntityRecord::Block(swap(&mut self.blocks, k, d, key)?),
            (EntityKey::Point(k), EntityRecord::Point(d)) => EntityRecord::Point(swap(&mut self.points, k, d, key)?),
            (EntityKey::Curve(k), EntityRecord::Curve(d)) => EntityRecord::Curve(swap(&mut self.curves, k, d, key)?),
            (EntityKey::Surface(k), EntityRecord::Surface(d)) => EntityRecord::Surface(swap(&mut self.surfaces, k, d, key)?),
            (EntityKey::Volume(k), EntityRecord::Volume(d)) => EntityRecord::Volume(swap(&mut self.volumes, k, d, key)?),
            (EntityKey::Group(k), EntityRecord::Group(d)) => EntityRecord::Group(swap(&mut self.groups, k, d, key)?),
            (key, record) => {
                return Err(Error::WrongType {
                    expected: key.entity_type(),
                    found: record_type(&record),
                })
            }
        })
    }

    /// Physically removes a record from the arena.
    pub(crate) fn remove(&mut self, key: EntityKey) -> Option<EntityRecord> {
        match key {
            EntityKey::Vertex(k) => self.vertices.remove(k).map(EntityRecord::Vertex),
            EntityKey::CoEdge(k) => self.coedges.remove(k).map(EntityRecord::CoEdge),
            EntityKey::CoFace(k) => self.cofaces.remove(k).map(EntityRecord::CoFace),
            EntityKey::Block(k) => self.blocks.remove(k).map(EntityRecord::Block),
            EntityKey::Point(k) => self.points.remove(k).map(EntityRecord::Point),
            EntityKey::Curve(k) => self.curves.remove(k).map(EntityRecord::Curve),
            EntityKey::Surface(k) => self.surfaces.remove(k).map(EntityRecord::Surface),
            EntityKey::Volume(k) => self.volumes.remove(k).map(EntityRecord::Volume),
            EntityKey::Group(k) => self.groups.remove(k).map(EntityRecord::Group),
        }
    }

    // --- Counts ---

    /// Number of stored records of every kind, deleted ones included.
    pub fn total_count(&self) -> usize {
        self.vertices.len()
            + self.coedges.len()
            + self.cofaces.len()
            + self.blocks.len()
            + self.points.len()
            + self.curves.len()
            + self.surfaces.len()
            + self.volumes.len()
            + self.groups.len()
    }

    /// Number of live entities of one type.
    pub fn live_count(&self, ty: EntityType) -> usize {
        match ty {
            EntityType::Vertex => self.vertex_count(),
            EntityType::CoEdge => self.coedge_count(),
            EntityType::CoFace => self.coface_count(),
            EntityType::Block => self.block_count(),
            EntityType::Point => self.point_count(),
            EntityType::Curve => self.curve_count(),
            EntityType::Surface => self.surface_count(),
            EntityType::Volume => self.volume_count(),
            EntityType::Group => self.group_count(),
        }
    }

    /// Keys of every live entity, topological kinds first.
    pub fn live_keys(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.vertices()
            .map(|(k, _)| EntityKey::from(k))
            .chain(self.coedges().map(|(k, _)| k.into()))
            .chain(self.cofaces().map(|(k, _)| k.into()))
            .chain(self.blocks().map(|(k, _)| k.into()))
            .chain(self.points().map(|(k, _)| k.into()))
            .chain(self.curves().map(|(k, _)| k.into()))
            .chain(self.surfaces().map(|(k, _)| k.into()))
            .chain(self.volumes().map(|(k, _)| k.into()))
            .chain(self.groups().map(|(k, _)| k.into()))
    }

    /// Geometric association of a topological entity.
    pub fn geom_of(&self, key: EntityKey) -> Option<GeomKey> {
        match key {
            EntityKey::Vertex(k) => self.vertex(k)?.geom,
            EntityKey::CoEdge(k) => self.coedge(k)?.geom,
            EntityKey::CoFace(k) => self.coface(k)?.geom,
            EntityKey::Block(k) => self.block(k)?.geom,
            _ => None,
        }
    }
}

fn record_type(record: &EntityRecord) -> EntityType {
    match record {
        EntityRecord::Vertex(_) => EntityType::Vertex,
        EntityRecord::CoEdge(_) => EntityType::CoEdge,
        EntityRecord::CoFace(_) => EntityType::CoFace,
        EntityRecord::Block(_) => EntityType::Block,
        EntityRecord::Point(_) => EntityType::Point,
        EntityRecord::Curve(_) => EntityType::Curve,
        EntityRecord::Surface(_) => EntityType::Surface,
        EntityRecord::Volume(_) => EntityType::Volume,
        EntityRecord::Group(_) => EntityType::Group,
    }
}

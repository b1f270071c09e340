// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction and ledger-tracked mutation of entities.
//!
//! Every entity is created through the arena, which checks that all
//! referenced sub-entities are live, allocates a unique name, tags the
//! entity with the ledger's owning command and maintains adjacency on both
//! sides. Every mutation of an existing record goes through an `edit_*`
//! accessor, which saves the record into the ledger before handing out a
//! mutable reference.

use nalgebra::Point3;

use crate::arena::*;
use crate::error::{Error, Result};
use crate::geometry::Representation;
use crate::keys::*;
use crate::ledger::{ChangeKind, ChangeLedger};
use crate::traversal::walk_loop;

macro_rules! ledger_editors {
    ($($edit:ident: $key:ident => $data:ident via $get_mut:ident;)*) => {
        impl ModelArena {
            $(
                #[doc = concat!("Saves the `", stringify!($data), "` into the ledger and returns it for mutation.")]
                pub fn $edit(&mut self, ledger: &mut ChangeLedger, key: $key) -> Result<&mut $data> {
                    ledger.touch(self, key.into())?;
                    self.$get_mut(key)
                }
            )*
        }
    };
}

ledger_editors! {
    edit_vertex: VertexKey => VertexData via vertex_mut;
    edit_coedge: CoEdgeKey => CoEdgeData via coedge_mut;
    edit_coface: CoFaceKey => CoFaceData via coface_mut;
    edit_block: BlockKey => BlockData via block_mut;
    edit_point: PointKey => PointData via point_mut;
    edit_curve: CurveKey => CurveData via curve_mut;
    edit_surface: SurfaceKey => SurfaceData via surface_mut;
    edit_volume: VolumeKey => VolumeData via volume_mut;
    edit_group: GroupKey => GroupData via group_mut;
}

impl ModelArena {
    pub(crate) fn new_meta(&mut self, ledger: &ChangeLedger, ty: EntityType) -> EntityMeta {
        EntityMeta {
            name: self.names.next_name(ty),
            destroyed: false,
            owner: ledger.owner(),
            replaced_by: None,
        }
    }

    // --- Topology ---

    /// Creates a vertex at the given position.
    pub fn add_vertex(&mut self, ledger: &mut ChangeLedger, coord: Point3<f64>) -> VertexKey {
        let meta = self.new_meta(ledger, EntityType::Vertex);
        let key = self.vertices.insert(VertexData {
            meta,
            coord,
            coedges: Vec::new(),
            geom: None,
        });
        // The record was inserted just above, so saving it cannot fail.
        let _ = ledger.record_created(self, key.into());
        key
    }

    /// Creates a co-edge between two distinct live vertices.
    pub fn add_coedge(
        &mut self,
        ledger: &mut ChangeLedger,
        start: VertexKey,
        end: VertexKey,
    ) -> Result<CoEdgeKey> {
        self.live_vertex(start)?;
        self.live_vertex(end)?;
        if start == end {
            return Err(Error::DegenerateCoEdge(self.name_of(start.into()).to_string()));
        }

        let meta = self.new_meta(ledger, EntityType::CoEdge);
        let key = self.coedges.insert(CoEdgeData {
            meta,
            vertices: [start, end],
            cofaces: Vec::new(),
            geom: None,
        });
        ledger.record_created(self, key.into())?;

        for v in [start, end] {
            self.edit_vertex(ledger, v)?.coedges.push(key);
        }
        Ok(key)
    }

    /// Creates a co-face from co-edges forming a closed loop, in loop order.
    pub fn add_coface(&mut self, ledger: &mut ChangeLedger, coedges: &[CoEdgeKey]) -> Result<CoFaceKey> {
        if coedges.len() < 3 {
            return Err(Error::DegenerateCoFace);
        }
        for &c in coedges {
            self.live_coedge(c)?;
        }
        walk_loop(self, coedges)?;

        let meta = self.new_meta(ledger, EntityType::CoFace);
        let key = self.cofaces.insert(CoFaceData {
            meta,
            coedges: coedges.to_vec(),
            blocks: Vec::new(),
            geom: None,
        });
        ledger.record_created(self, key.into())?;

        for &c in coedges {
            self.edit_coedge(ledger, c)?.cofaces.push(key);
        }
        Ok(key)
    }

    /// Creates a block bounded by the given co-faces.
    pub fn add_block(&mut self, ledger: &mut ChangeLedger, cofaces: &[CoFaceKey]) -> Result<BlockKey> {
        if cofaces.is_empty() {
            return Err(Error::EmptyBoundary(EntityType::Block));
        }
        for &f in cofaces {
            self.live_coface(f)?;
        }

        let meta = self.new_meta(ledger, EntityType::Block);
        let key = self.blocks.insert(BlockData {
            meta,
            cofaces: cofaces.to_vec(),
            geom: None,
        });
        ledger.record_created(self, key.into())?;

        for &f in cofaces {
            self.edit_coface(ledger, f)?.blocks.push(key);
        }
        Ok(key)
    }

    // --- Geometry ---

    /// Creates a geometric point.
    pub fn add_point(&mut self, ledger: &mut ChangeLedger, coord: Point3<f64>) -> PointKey {
        let meta = self.new_meta(ledger, EntityType::Point);
        let key = self.points.insert(PointData {
            meta,
            coord,
            curves: Vec::new(),
        });
        let _ = ledger.record_created(self, key.into());
        key
    }

    /// Creates a curve through the given points.
    pub fn add_curve(
        &mut self,
        ledger: &mut ChangeLedger,
        points: &[PointKey],
        rep: Representation,
    ) -> Result<CurveKey> {
        if points.is_empty() {
            return Err(Error::EmptyBoundary(EntityType::Curve));
        }
        for &p in points {
            self.live_point(p)?;
        }

        let meta = self.new_meta(ledger, EntityType::Curve);
        let key = self.curves.insert(CurveData {
            meta,
            points: points.to_vec(),
            surfaces: Vec::new(),
            rep,
        });
        ledger.record_created(self, key.into())?;

        for &p in points {
            self.edit_point(ledger, p)?.curves.push(key);
        }
        Ok(key)
    }

    /// Creates a surface bounded by the given curves.
    pub fn add_surface(
        &mut self,
        ledger: &mut ChangeLedger,
        curves: &[CurveKey],
        rep: Representation,
    ) -> Result<SurfaceKey> {
        if curves.is_empty() {
            return Err(Error::EmptyBoundary(EntityType::Surface));
        }
        for &c in curves {
            self.live_curve(c)?;
        }

        let meta = self.new_meta(ledger, EntityType::Surface);
        let key = self.surfaces.insert(SurfaceData {
            meta,
            curves: curves.to_vec(),
            volumes: Vec::new(),
            rep,
        });
        ledger.record_created(self, key.into())?;

        for &c in curves {
            self.edit_curve(ledger, c)?.surfaces.push(key);
        }
        Ok(key)
    }

    /// Creates a volume bounded by the given surfaces.
    pub fn add_volume(&mut self, ledger: &mut ChangeLedger, surfaces: &[SurfaceKey]) -> Result<VolumeKey> {
        if surfaces.is_empty() {
            return Err(Error::EmptyBoundary(EntityType::Volume));
        }
        for &s in surfaces {
            self.live_surface(s)?;
        }

        let meta = self.new_meta(ledger, EntityType::Volume);
        let key = self.volumes.insert(VolumeData {
            meta,
            surfaces: surfaces.to_vec(),
        });
        ledger.record_created(self, key.into())?;

        for &s in surfaces {
            self.edit_surface(ledger, s)?.volumes.push(key);
        }
        Ok(key)
    }

    /// Associates a topological entity with a geometric one.
    pub fn associate(&mut self, ledger: &mut ChangeLedger, topo: EntityKey, geom: GeomKey) -> Result<()> {
        self.ensure_live(geom.into())?;
        self.ensure_live(topo)?;
        let slot = match topo {
            EntityKey::Vertex(k) => &mut self.edit_vertex(ledger, k)?.geom,
            EntityKey::CoEdge(k) => &mut self.edit_coedge(ledger, k)?.geom,
            EntityKey::CoFace(k) => &mut self.edit_coface(ledger, k)?.geom,
            EntityKey::Block(k) => &mut self.edit_block(ledger, k)?.geom,
            other => {
                return Err(Error::WrongType {
                    expected: EntityType::Vertex,
                    found: other.entity_type(),
                })
            }
        };
        *slot = Some(geom);
        Ok(())
    }

    // --- Deletion ---

    /// Marks an entity deleted, recording the keeper when it was fused.
    ///
    /// Adjacency is left untouched; callers unlink the entity first.
    pub fn retire(&mut self, ledger: &mut ChangeLedger, key: EntityKey, by: Option<EntityKey>) -> Result<()> {
        ledger.touch(self, key)?;
        let meta = self.meta_mut(key)?;
        meta.destroyed = true;
        meta.replaced_by = by;
        let kind = match by {
            Some(by) => ChangeKind::Replaced { by },
            None => ChangeKind::Deleted,
        };
        ledger.record(key, kind);
        Ok(())
    }

    /// Clears the deletion flag of an entity retired by an earlier command.
    pub fn revive(&mut self, ledger: &mut ChangeLedger, key: EntityKey) -> Result<()> {
        ledger.touch(self, key)?;
        let meta = self.meta_mut(key)?;
        meta.destroyed = false;
        meta.replaced_by = None;
        Ok(())
    }
}

/// Builds a quadrilateral co-face from four corner vertices.
///
/// Creates 4 co-edges and 1 co-face. Returns `(coface, coedges)`.
pub fn make_quad(
    arena: &mut ModelArena,
    ledger: &mut ChangeLedger,
    corners: [VertexKey; 4],
) -> Result<(CoFaceKey, [CoEdgeKey; 4])> {
    let [v0, v1, v2, v3] = corners;
    let e0 = arena.add_coedge(ledger, v0, v1)?;
    let e1 = arena.add_coedge(ledger, v1, v2)?;
    let e2 = arena.add_coedge(ledger, v2, v3)?;
    let e3 = arena.add_coedge(ledger, v3, v0)?;
    let face = arena.add_coface(ledger, &[e0, e1, e2, e3])?;
    Ok((face, [e0, e1, e2, e3]))
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Graph surgery: merging entities into a keeper and uniting curves or
//! surfaces.
//!
//! Each merge relinks every referrer of the absorbed entity to the keeper on
//! both sides of the adjacency, lets the keeper inherit the absorbed
//! entity's geometric association when its own is missing, deleted or of
//! higher dimension, and finally retires the absorbed entity with a
//! `Replaced` record pointing at the keeper. All checks run before the
//! first mutation of each primitive.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::arena::*;
use crate::error::{Error, Result};
use crate::geometry::Representation;
use crate::keys::*;
use crate::ledger::ChangeLedger;
use crate::traversal::CurveChain;

fn replace_all<T: PartialEq + Copy>(list: &mut [T], from: T, to: T) {
    for item in list.iter_mut().filter(|i| **i == from) {
        *item = to;
    }
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

fn same_set<T: Eq + std::hash::Hash + Copy>(a: &[T], b: &[T]) -> bool {
    let a: FxHashSet<T> = a.iter().copied().collect();
    let b: FxHashSet<T> = b.iter().copied().collect();
    a == b
}

impl ModelArena {
    /// `true` when a keeper holding `keeper` should take over `other`.
    fn adopts_geom(&self, keeper: Option<GeomKey>, other: Option<GeomKey>) -> bool {
        match (keeper, other) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(k), Some(o)) => !self.is_live(k.into()) || k.dim() > o.dim(),
        }
    }

    fn mismatch(&self, keeper: EntityKey, other: EntityKey) -> Error {
        Error::MismatchedBoundary {
            keeper: self.name_of(keeper).to_string(),
            other: self.name_of(other).to_string(),
        }
    }

    fn check_pair(&self, keeper: EntityKey, other: EntityKey) -> Result<()> {
        if keeper == other {
            return Err(Error::SelfFusion(self.name_of(keeper).to_string()));
        }
        self.ensure_live(keeper)?;
        self.ensure_live(other)
    }

    /// Merges vertex `other` into `keeper`.
    ///
    /// Every co-edge of `other` is re-pointed at `keeper`. Fails without
    /// mutating anything if the two vertices bound a common co-edge.
    pub fn merge_vertices(&mut self, ledger: &mut ChangeLedger, keeper: VertexKey, other: VertexKey) -> Result<()> {
        self.check_pair(keeper.into(), other.into())?;
        let coedges = self.live_vertex(other)?.coedges.clone();
        for &c in &coedges {
            if self.coedge(c).is_some_and(|d| d.vertices.contains(&keeper)) {
                return Err(Error::DegenerateCoEdge(self.name_of(keeper.into()).to_string()));
            }
        }

        for &c in &coedges {
            replace_all(&mut self.edit_coedge(ledger, c)?.vertices, other, keeper);
            push_unique(&mut self.edit_vertex(ledger, keeper)?.coedges, c);
        }
        self.edit_vertex(ledger, other)?.coedges.clear();

        let other_geom = self.live_vertex(other)?.geom;
        if self.adopts_geom(self.live_vertex(keeper)?.geom, other_geom) {
            self.edit_vertex(ledger, keeper)?.geom = other_geom;
        }
        self.retire(ledger, other.into(), Some(keeper.into()))
    }

    /// Merges co-edge `other` into `keeper`. Both must join the same vertices.
    pub fn merge_coedges(&mut self, ledger: &mut ChangeLedger, keeper: CoEdgeKey, other: CoEdgeKey) -> Result<()> {
        self.check_pair(keeper.into(), other.into())?;
        let kept = self.live_coedge(keeper)?.vertices;
        let absorbed = self.live_coedge(other)?.clone();
        if !same_set(&kept, &absorbed.vertices) {
            return Err(self.mismatch(keeper.into(), other.into()));
        }

        for &f in &absorbed.cofaces {
            replace_all(&mut self.edit_coface(ledger, f)?.coedges, other, keeper);
            push_unique(&mut self.edit_coedge(ledger, keeper)?.cofaces, f);
        }
        for v in absorbed.vertices {
            self.edit_vertex(ledger, v)?.coedges.retain(|c| *c != other);
        }
        self.edit_coedge(ledger, other)?.cofaces.clear();

        if self.adopts_geom(self.live_coedge(keeper)?.geom, absorbed.geom) {
            self.edit_coedge(ledger, keeper)?.geom = absorbed.geom;
        }
        self.retire(ledger, other.into(), Some(keeper.into()))
    }

    /// Merges co-face `other` into `keeper`.
    ///
    /// Both faces must be bounded by the same vertices with the same number
    /// of co-edges; boundary co-edges that are not yet shared are merged
    /// pairwise first.
    pub fn merge_cofaces(&mut self, ledger: &mut ChangeLedger, keeper: CoFaceKey, other: CoFaceKey) -> Result<()> {
        self.check_pair(keeper.into(), other.into())?;
        let kept = self.live_coface(keeper)?.clone();
        let absorbed = self.live_coface(other)?.clone();
        let mismatch = || self.mismatch(keeper.into(), other.into());

        if kept.coedges.len() != absorbed.coedges.len() {
            return Err(mismatch());
        }
        let kept_vertices = self.coface_vertices(keeper).ok_or_else(mismatch)?;
        let absorbed_vertices = self.coface_vertices(other).ok_or_else(mismatch)?;
        if !same_set(&kept_vertices, &absorbed_vertices) {
            return Err(mismatch());
        }

        // Pair every absorbed co-edge with the keeper's co-edge on the same
        // vertices; two absorbed co-edges may not land on one keeper co-edge.
        let mut pairs = Vec::with_capacity(absorbed.coedges.len());
        let mut used = FxHashSet::default();
        for &oc in &absorbed.coedges {
            let ov = self.live_coedge(oc)?.vertices;
            let kc = kept
                .coedges
                .iter()
                .copied()
                .find(|kc| self.coedge(*kc).is_some_and(|d| same_set(&d.vertices, &ov)))
                .ok_or_else(mismatch)?;
            if !used.insert(kc) {
                return Err(mismatch());
            }
            pairs.push((kc, oc));
        }

        for (kc, oc) in pairs {
            if kc != oc {
                self.merge_coedges(ledger, kc, oc)?;
            }
        }
        for &c in &kept.coedges {
            self.edit_coedge(ledger, c)?.cofaces.retain(|f| *f != other);
        }
        for &b in &absorbed.blocks {
            replace_all(&mut self.edit_block(ledger, b)?.cofaces, other, keeper);
            push_unique(&mut self.edit_coface(ledger, keeper)?.blocks, b);
        }
        self.edit_coface(ledger, other)?.blocks.clear();

        if self.adopts_geom(kept.geom, absorbed.geom) {
            self.edit_coface(ledger, keeper)?.geom = absorbed.geom;
        }
        self.retire(ledger, other.into(), Some(keeper.into()))
    }

    /// Replaces several surfaces with a single union surface.
    ///
    /// Curves bounding exactly one input become boundaries of the union.
    /// Curves bounding two or more inputs lie inside the union: they are
    /// retired (replaced by the union) unless a surface outside the input
    /// set still uses them. Points left without a live curve are retired
    /// too. Volumes and topological associations are re-pointed at the
    /// union, and every input is retired with a `Replaced` record.
    ///
    /// The caller validates the inputs (live, distinct, same volumes).
    pub fn unite_surfaces(
        &mut self,
        ledger: &mut ChangeLedger,
        inputs: &[SurfaceKey],
        rep: Representation,
    ) -> Result<SurfaceKey> {
        let first = *inputs.first().ok_or(Error::EmptyBoundary(EntityType::Surface))?;
        let input_set: FxHashSet<SurfaceKey> = inputs.iter().copied().collect();

        let mut order = Vec::new();
        let mut uses: FxHashMap<CurveKey, usize> = FxHashMap::default();
        for &s in inputs {
            for &c in &self.live_surface(s)?.curves {
                let n = uses.entry(c).or_insert(0);
                if *n == 0 {
                    order.push(c);
                }
                *n += 1;
            }
        }
        let boundary: Vec<CurveKey> = order.iter().copied().filter(|c| uses[c] == 1).collect();
        let inner: Vec<CurveKey> = order.iter().copied().filter(|c| uses[c] > 1).collect();
        let volumes = self.live_surface(first)?.volumes.clone();

        let meta = self.new_meta(ledger, EntityType::Surface);
        let union = self.surfaces.insert(SurfaceData {
            meta,
            curves: boundary.clone(),
            volumes: volumes.clone(),
            rep,
        });
        ledger.record_created(self, union.into())?;
        let union_key = EntityKey::from(union);

        for &c in &boundary {
            let curve = self.edit_curve(ledger, c)?;
            curve.surfaces.retain(|s| !input_set.contains(s));
            curve.surfaces.push(union);
        }

        let mut retired_geom: FxHashSet<GeomKey> = inputs.iter().map(|s| GeomKey::Surface(*s)).collect();
        for &c in &inner {
            let curve = self.edit_curve(ledger, c)?;
            curve.surfaces.retain(|s| !input_set.contains(s));
            let still_used = curve.surfaces.clone();
            if still_used.iter().any(|s| self.is_live((*s).into())) {
                continue;
            }
            let points = self.live_curve(c)?.points.clone();
            for p in points {
                let point = self.edit_point(ledger, p)?;
                point.curves.retain(|k| *k != c);
                let remaining = point.curves.clone();
                let orphan = !remaining.iter().any(|k| self.is_live((*k).into()));
                if orphan && self.is_live(p.into()) {
                    self.retire(ledger, p.into(), Some(union_key))?;
                    retired_geom.insert(GeomKey::Point(p));
                }
            }
            self.retire(ledger, c.into(), Some(union_key))?;
            retired_geom.insert(GeomKey::Curve(c));
        }

        for &v in &volumes {
            let volume = self.edit_volume(ledger, v)?;
            volume.surfaces.retain(|s| !input_set.contains(s));
            volume.surfaces.push(union);
        }

        let union_geom = GeomKey::Surface(union);
        for topo in self.associated_with(&retired_geom) {
            self.associate(ledger, topo, union_geom)?;
        }

        for &s in inputs {
            self.edit_surface(ledger, s)?.volumes.clear();
            self.retire(ledger, s.into(), Some(union_key))?;
        }
        Ok(union)
    }

    /// Replaces a chain of curves with a single union curve.
    ///
    /// The union runs between the chain's ends and bounds every surface the
    /// inputs bound, taking the place of the first input in each of them.
    /// Inner points left without a live curve are retired, topological
    /// associations are re-pointed at the union, and every input is retired
    /// with a `Replaced` record.
    ///
    /// The caller validates the inputs (live, same surfaces) and builds the
    /// chain with [`ModelArena::chain_curves`].
    pub fn unite_curves(
        &mut self,
        ledger: &mut ChangeLedger,
        chain: &CurveChain,
        rep: Representation,
    ) -> Result<CurveKey> {
        if chain.curves.is_empty() {
            return Err(Error::EmptyBoundary(EntityType::Curve));
        }
        let input_set: FxHashSet<CurveKey> = chain.curves.iter().copied().collect();
        let mut surfaces = Vec::new();
        for &c in &chain.curves {
            for &s in &self.live_curve(c)?.surfaces {
                push_unique(&mut surfaces, s);
            }
        }

        let meta = self.new_meta(ledger, EntityType::Curve);
        let union = self.curves.insert(CurveData {
            meta,
            points: chain.ends.clone(),
            surfaces: surfaces.clone(),
            rep,
        });
        ledger.record_created(self, union.into())?;
        let union_key = EntityKey::from(union);

        for &p in &chain.ends {
            let point = self.edit_point(ledger, p)?;
            point.curves.retain(|c| !input_set.contains(c));
            point.curves.push(union);
        }

        let mut retired_geom: FxHashSet<GeomKey> = chain.curves.iter().map(|c| GeomKey::Curve(*c)).collect();
        for &p in &chain.inner {
            let point = self.edit_point(ledger, p)?;
            point.curves.retain(|c| !input_set.contains(c));
            let remaining = point.curves.clone();
            if !remaining.iter().any(|c| self.is_live((*c).into())) {
                self.retire(ledger, p.into(), Some(union_key))?;
                retired_geom.insert(GeomKey::Point(p));
            }
        }

        for &s in &surfaces {
            let surface = self.edit_surface(ledger, s)?;
            let mut placed = false;
            let mut curves = Vec::with_capacity(surface.curves.len());
            for &c in &surface.curves {
                if !input_set.contains(&c) {
                    curves.push(c);
                } else if !placed {
                    curves.push(union);
                    placed = true;
                }
            }
            surface.curves = curves;
        }

        let union_geom = GeomKey::Curve(union);
        for topo in self.associated_with(&retired_geom) {
            self.associate(ledger, topo, union_geom)?;
        }

        for &c in &chain.curves {
            self.edit_curve(ledger, c)?.surfaces.clear();
            self.retire(ledger, c.into(), Some(union_key))?;
        }
        Ok(union)
    }

    /// Live topological entities associated with any of the given geometric
    /// entities.
    pub fn associated_with(&self, geoms: &FxHashSet<GeomKey>) -> Vec<EntityKey> {
        let hit = |g: &Option<GeomKey>| g.is_some_and(|g| geoms.contains(&g));
        self.vertices()
            .filter(|(_, d)| hit(&d.geom))
            .map(|(k, _)| EntityKey::from(k))
            .chain(self.coedges().filter(|(_, d)| hit(&d.geom)).map(|(k, _)| k.into()))
            .chain(self.cofaces().filter(|(_, d)| hit(&d.geom)).map(|(k, _)| k.into()))
            .chain(self.blocks().filter(|(_, d)| hit(&d.geom)).map(|(k, _)| k.into()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction::make_quad;
    use crate::ledger::ChangeKind;
    use nalgebra::Point3;

    /// Two unit quads side by side that do not share their middle edge:
    /// `a` spans x in [0, 1], `b` spans x in [1, 2], with duplicated vertices
    /// along x = 1.
    struct SplitQuads {
        arena: ModelArena,
        a: CoFaceKey,
        b: CoFaceKey,
        a_edges: [CoEdgeKey; 4],
        b_edges: [CoEdgeKey; 4],
        a_verts: [VertexKey; 4],
        b_verts: [VertexKey; 4],
    }

    fn split_quads() -> SplitQuads {
        let mut arena = ModelArena::new();
        let mut ledger = ChangeLedger::new(None);
        let p = |x: f64, y: f64| Point3::new(x, y, 0.0);
        let mut add = |arena: &mut ModelArena, x, y| arena.add_vertex(&mut ledger, p(x, y));
        let a_verts = [
            add(&mut arena, 0.0, 0.0),
            add(&mut arena, 1.0, 0.0),
            add(&mut arena, 1.0, 1.0),
            add(&mut arena, 0.0, 1.0),
        ];
        let b_verts = [
            add(&mut arena, 1.0, 0.0),
            add(&mut arena, 2.0, 0.0),
            add(&mut arena, 2.0, 1.0),
            add(&mut arena, 1.0, 1.0),
        ];
        let mut ledger = ChangeLedger::new(None);
        let (a, a_edges) = make_quad(&mut arena, &mut ledger, a_verts).unwrap();
        let (b, b_edges) = make_quad(&mut arena, &mut ledger, b_verts).unwrap();
        SplitQuads {
            arena,
            a,
            b,
            a_edges,
            b_edges,
            a_verts,
            b_verts,
        }
    }

    #[test]
    fn unite_curves_retires_shared_points() {
        let mut arena = ModelArena::new();
        let mut ledger = ChangeLedger::new(None);
        let p: Vec<PointKey> = (0..4)
            .map(|i| arena.add_point(&mut ledger, Point3::new(i as f64, 0.0, 0.0)))
            .collect();
        let c: Vec<CurveKey> = p
            .windows(2)
            .map(|w| arena.add_curve(&mut ledger, &[w[0], w[1]], Representation::default()).unwrap())
            .collect();
        let apex = arena.add_point(&mut ledger, Point3::new(1.5, 1.0, 0.0));
        let left = arena.add_curve(&mut ledger, &[apex, p[0]], Representation::default()).unwrap();
        let right = arena.add_curve(&mut ledger, &[p[3], apex], Representation::default()).unwrap();
        let surface = arena
            .add_surface(&mut ledger, &[left, c[0], c[1], c[2], right], Representation::default())
            .unwrap();
        let vertex = arena.add_vertex(&mut ledger, Point3::new(1.0, 0.0, 0.0));
        arena.associate(&mut ledger, vertex.into(), GeomKey::Point(p[1])).unwrap();

        let mut ledger = ChangeLedger::new(None);
        let chain = arena.chain_curves(&c).unwrap();
        let union = arena.unite_curves(&mut ledger, &chain, Representation::default()).unwrap();

        let data = arena.live_curve(union).unwrap();
        assert_eq!(data.points, vec![p[0], p[3]]);
        assert_eq!(data.surfaces, vec![surface]);
        assert_eq!(arena.surface(surface).unwrap().curves, vec![left, union, right]);
        for inner in [p[1], p[2]] {
            assert_eq!(arena.resolve(inner.into()), union.into());
        }
        assert_eq!(arena.point(p[0]).unwrap().curves, vec![left, union]);
        assert_eq!(arena.geom_of(vertex.into()), Some(GeomKey::Curve(union)));
        for input in c {
            assert_eq!(ledger.get(input.into()), Some(ChangeKind::Replaced { by: union.into() }));
        }
        arena.validate().unwrap();
    }

    #[test]
    fn merge_vertices_relinks_coedges() {
        let mut q = split_quads();
        let mut ledger = ChangeLedger::new(None);
        q.arena.merge_vertices(&mut ledger, q.a_verts[1], q.b_verts[0]).unwrap();

        let keeper = q.arena.live_vertex(q.a_verts[1]).unwrap();
        assert!(keeper.coedges.contains(&q.b_edges[0]));
        assert!(keeper.coedges.contains(&q.b_edges[3]));
        assert_eq!(q.arena.coedge(q.b_edges[0]).unwrap().vertices[0], q.a_verts[1]);
        assert_eq!(
            ledger.get(q.b_verts[0].into()),
            Some(ChangeKind::Replaced { by: q.a_verts[1].into() })
        );
        q.arena.validate().unwrap();
    }

    #[test]
    fn merge_vertices_rejects_collapsing_an_edge() {
        let mut q = split_quads();
        let mut ledger = ChangeLedger::new(None);
        let err = q
            .arena
            .merge_vertices(&mut ledger, q.a_verts[0], q.a_verts[1])
            .unwrap_err();
        assert!(matches!(err, Error::DegenerateCoEdge(_)));
        assert_eq!(err.to_string(), "degenerate co-edge: both ends are vertex Som0");
        assert!(ledger.is_empty());
    }

    #[test]
    fn merge_coedges_after_vertex_merge() {
        let mut q = split_quads();
        let mut ledger = ChangeLedger::new(None);
        // a's right edge (v1 -> v2) and b's left edge (v3 -> v0).
        q.arena.merge_vertices(&mut ledger, q.a_verts[1], q.b_verts[0]).unwrap();
        q.arena.merge_vertices(&mut ledger, q.a_verts[2], q.b_verts[3]).unwrap();
        q.arena.merge_coedges(&mut ledger, q.a_edges[1], q.b_edges[3]).unwrap();

        let kept = q.arena.live_coedge(q.a_edges[1]).unwrap();
        assert_eq!(kept.cofaces, vec![q.a, q.b]);
        assert!(q.arena.coface(q.b).unwrap().coedges.contains(&q.a_edges[1]));
        assert!(!q.arena.is_live(q.b_edges[3].into()));
        assert_eq!(q.arena.resolve(q.b_edges[3].into()), EntityKey::CoEdge(q.a_edges[1]));
        q.arena.validate().unwrap();
    }

    #[test]
    fn merge_coedges_requires_same_vertices() {
        let mut q = split_quads();
        let mut ledger = ChangeLedger::new(None);
        let err = q
            .arena
            .merge_coedges(&mut ledger, q.a_edges[1], q.b_edges[3])
            .unwrap_err();
        assert!(matches!(err, Error::MismatchedBoundary { .. }));
    }

    #[test]
    fn keeper_inherits_lower_dimension_geometry() {
        let mut q = split_quads();
        let mut ledger = ChangeLedger::new(None);
        let pt = q.arena.add_point(&mut ledger, Point3::new(1.0, 0.0, 0.0));
        let surf_pt = q.arena.add_point(&mut ledger, Point3::new(1.0, 0.0, 0.0));
        let curve = q
            .arena
            .add_curve(&mut ledger, &[surf_pt], Representation::default())
            .unwrap();
        let surf = q.arena.add_surface(&mut ledger, &[curve], Representation::default()).unwrap();
        q.arena
            .associate(&mut ledger, q.a_verts[1].into(), GeomKey::Surface(surf))
            .unwrap();
        q.arena
            .associate(&mut ledger, q.b_verts[0].into(), GeomKey::Point(pt))
            .unwrap();

        q.arena.merge_vertices(&mut ledger, q.a_verts[1], q.b_verts[0]).unwrap();
        assert_eq!(q.arena.geom_of(q.a_verts[1].into()), Some(GeomKey::Point(pt)));
    }

    #[test]
    fn merge_identical_quads() {
        let mut arena = ModelArena::new();
        let mut ledger = ChangeLedger::new(None);
        let corners = [
            arena.add_vertex(&mut ledger, Point3::new(0.0, 0.0, 0.0)),
            arena.add_vertex(&mut ledger, Point3::new(1.0, 0.0, 0.0)),
            arena.add_vertex(&mut ledger, Point3::new(1.0, 1.0, 0.0)),
            arena.add_vertex(&mut ledger, Point3::new(0.0, 1.0, 0.0)),
        ];
        let (f0, _) = make_quad(&mut arena, &mut ledger, corners).unwrap();
        // Same corners, opposite winding, fresh co-edges.
        let [v0, v1, v2, v3] = corners;
        let (f1, _) = make_quad(&mut arena, &mut ledger, [v0, v3, v2, v1]).unwrap();
        let b0 = arena.add_block(&mut ledger, &[f0]).unwrap();
        let b1 = arena.add_block(&mut ledger, &[f1]).unwrap();

        let mut fuse = ChangeLedger::new(None);
        arena.merge_cofaces(&mut fuse, f0, f1).unwrap();

        assert_eq!(arena.coface_count(), 1);
        assert_eq!(arena.coedge_count(), 4);
        assert_eq!(arena.live_coface(f0).unwrap().blocks, vec![b0, b1]);
        assert_eq!(arena.live_block(b1).unwrap().cofaces, vec![f0]);
        assert_eq!(fuse.count(EntityType::CoFace, |c| matches!(c, ChangeKind::Replaced { .. })), 1);
        assert_eq!(fuse.count(EntityType::CoEdge, |c| matches!(c, ChangeKind::Replaced { .. })), 4);
        arena.validate().unwrap();
    }

    #[test]
    fn merge_cofaces_rejects_self() {
        let mut q = split_quads();
        let mut ledger = ChangeLedger::new(None);
        assert!(matches!(
            q.arena.merge_cofaces(&mut ledger, q.a, q.a),
            Err(Error::SelfFusion(_))
        ));
    }
}

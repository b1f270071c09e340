// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-only traversal of the entity graph.
//!
//! Downward queries (face → co-edges → vertices) follow the ordered lists
//! stored on each record; upward queries (vertex → co-edges → faces) follow
//! the back-reference lists. Lookups by vertex set locate the co-edge or
//! co-face bounded by exactly those vertices.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::arena::ModelArena;
use crate::error::{Error, Result};
use crate::keys::*;

/// Walks a co-edge loop and returns its vertices in loop order.
///
/// Fails with [`Error::DisconnectedBoundary`] naming the first pair of
/// consecutive co-edges that do not meet (the pair `(n - 1, 0)` when the
/// loop does not close).
pub(crate) fn walk_loop(arena: &ModelArena, coedges: &[CoEdgeKey]) -> Result<Vec<VertexKey>> {
    let ends = |i: usize| -> Result<[VertexKey; 2]> {
        arena
            .coedge(coedges[i])
            .map(|c| c.vertices)
            .ok_or(Error::NotFound(coedges[i].into()))
    };

    let n = coedges.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let first = ends(0)?;
    if n == 1 {
        return Ok(first.to_vec());
    }

    let second = ends(1)?;
    let start = if second.contains(&first[1]) {
        first[0]
    } else if second.contains(&first[0]) {
        first[1]
    } else {
        return Err(Error::DisconnectedBoundary(0, 1));
    };

    let mut verts = Vec::with_capacity(n);
    let mut current = start;
    for i in 0..n {
        let [a, b] = ends(i)?;
        if a == current {
            verts.push(a);
            current = b;
        } else if b == current {
            verts.push(b);
            current = a;
        } else {
            return Err(Error::DisconnectedBoundary(i - 1, i));
        }
    }
    if current != start {
        return Err(Error::DisconnectedBoundary(n - 1, 0));
    }
    Ok(verts)
}

/// Curves ordered end to end, as found by [`ModelArena::chain_curves`].
#[derive(Debug, Clone, PartialEq)]
pub struct CurveChain {
    /// Curves in walk order.
    pub curves: Vec<CurveKey>,
    /// For each curve, whether the walk runs against its point order.
    pub reversed: Vec<bool>,
    /// Free ends of the chain. A closed chain keeps its start point only.
    pub ends: Vec<PointKey>,
    /// Points joining two consecutive curves.
    pub inner: Vec<PointKey>,
}

fn same_vertex_set(a: &[VertexKey], b: &[VertexKey]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let set: FxHashSet<VertexKey> = a.iter().copied().collect();
    set.len() == b.len() && b.iter().all(|v| set.contains(v))
}

impl ModelArena {
    // --- Downward ---

    /// Both ends of a co-edge.
    pub fn coedge_vertices(&self, key: CoEdgeKey) -> Option<[VertexKey; 2]> {
        self.coedge(key).map(|c| c.vertices)
    }

    /// Boundary vertices of a co-face, in loop order.
    pub fn coface_vertices(&self, key: CoFaceKey) -> Option<Vec<VertexKey>> {
        let face = self.coface(key)?;
        walk_loop(self, &face.coedges).ok()
    }

    /// Distinct vertices of all faces of a block.
    pub fn block_vertices(&self, key: BlockKey) -> Option<FxHashSet<VertexKey>> {
        let block = self.block(key)?;
        let mut result = FxHashSet::default();
        for &f in &block.cofaces {
            result.extend(self.coface_vertices(f)?);
        }
        Some(result)
    }

    /// Distinct co-edges of all faces of a block.
    pub fn block_coedges(&self, key: BlockKey) -> Option<FxHashSet<CoEdgeKey>> {
        let block = self.block(key)?;
        let mut result = FxHashSet::default();
        for &f in &block.cofaces {
            result.extend(self.coface(f)?.coedges.iter().copied());
        }
        Some(result)
    }

    // --- Upward ---

    /// Live co-edges incident to a vertex.
    pub fn vertex_coedges(&self, key: VertexKey) -> Vec<CoEdgeKey> {
        self.vertex(key)
            .map(|v| v.coedges.iter().copied().filter(|c| self.is_live((*c).into())).collect())
            .unwrap_or_default()
    }

    /// Live co-faces incident to a vertex, through its co-edges.
    pub fn vertex_cofaces(&self, key: VertexKey) -> Vec<CoFaceKey> {
        let mut seen = FxHashSet::default();
        let mut result = Vec::new();
        for c in self.vertex_coedges(key) {
            for &f in self.coedge(c).map(|c| c.cofaces.as_slice()).unwrap_or_default() {
                if self.is_live(f.into()) && seen.insert(f) {
                    result.push(f);
                }
            }
        }
        result
    }

    /// Live blocks associated with a geometric volume.
    pub fn volume_blocks(&self, key: VolumeKey) -> Vec<BlockKey> {
        self.blocks()
            .filter(|(_, b)| b.geom == Some(GeomKey::Volume(key)))
            .map(|(k, _)| k)
            .collect()
    }

    /// Co-faces of the given blocks that bound exactly one live block, in
    /// first-seen order.
    pub fn boundary_cofaces(&self, blocks: &[BlockKey]) -> Vec<CoFaceKey> {
        let mut seen = FxHashSet::default();
        let mut result = Vec::new();
        for &b in blocks {
            for &f in self.block(b).map(|b| b.cofaces.as_slice()).unwrap_or_default() {
                if seen.insert(f) && self.is_live(f.into()) && self.coface_blocks(f).len() == 1 {
                    result.push(f);
                }
            }
        }
        result
    }

    /// Live blocks bounded by a co-face.
    pub fn coface_blocks(&self, key: CoFaceKey) -> Vec<BlockKey> {
        self.coface(key)
            .map(|f| f.blocks.iter().copied().filter(|b| self.is_live((*b).into())).collect())
            .unwrap_or_default()
    }

    // --- Lookup by vertices ---

    /// The live co-edge joining `a` and `b`, in either direction.
    pub fn find_coedge(&self, a: VertexKey, b: VertexKey) -> Option<CoEdgeKey> {
        self.find_coedges(a, b).into_iter().next()
    }

    /// Every live co-edge joining `a` and `b`.
    pub fn find_coedges(&self, a: VertexKey, b: VertexKey) -> Vec<CoEdgeKey> {
        self.vertex_coedges(a)
            .into_iter()
            .filter(|c| {
                self.coedge(*c)
                    .is_some_and(|d| same_vertex_set(&d.vertices, &[a, b]))
            })
            .collect()
    }

    /// Every live co-face whose full boundary vertex set equals `vertices`.
    pub fn find_cofaces(&self, vertices: &[VertexKey]) -> Vec<CoFaceKey> {
        let Some(&first) = vertices.first() else {
            return Vec::new();
        };
        self.vertex_cofaces(first)
            .into_iter()
            .filter(|f| {
                self.coface_vertices(*f)
                    .is_some_and(|vs| same_vertex_set(&vs, vertices))
            })
            .collect()
    }

    /// `true` if some live co-edge joins the two vertices.
    pub fn vertices_share_coedge(&self, a: VertexKey, b: VertexKey) -> bool {
        self.find_coedge(a, b).is_some()
    }

    // --- Curve chains ---

    /// Orders live curves end to end.
    ///
    /// Every curve must run between two distinct points, no point may join
    /// more than two of the curves, and the curves must be connected. An
    /// open chain is walked from the first free end met in input order; a
    /// closed one from the first point of its first curve.
    pub fn chain_curves(&self, curves: &[CurveKey]) -> Result<CurveChain> {
        let name = |k: EntityKey| self.name_of(k).to_string();
        let mut links = Vec::with_capacity(curves.len());
        let mut uses: FxHashMap<PointKey, usize> = FxHashMap::default();
        let mut order = Vec::new();
        for &c in curves {
            let &[a, b] = self.live_curve(c)?.points.as_slice() else {
                return Err(Error::BrokenChain(format!("{} does not join two points", name(c.into()))));
            };
            if a == b {
                return Err(Error::BrokenChain(format!("{} is closed on itself", name(c.into()))));
            }
            for p in [a, b] {
                let n = uses.entry(p).or_insert(0);
                if *n == 0 {
                    order.push(p);
                }
                *n += 1;
            }
            links.push((c, [a, b]));
        }
        if let Some(p) = order.iter().find(|p| uses[*p] > 2) {
            return Err(Error::BrokenChain(format!(
                "point {} joins more than two curves",
                name((*p).into())
            )));
        }

        let free: Vec<PointKey> = order.iter().copied().filter(|p| uses[p] == 1).collect();
        let start = match free.as_slice() {
            [] => links
                .first()
                .map(|(_, [a, _])| *a)
                .ok_or(Error::EmptyBoundary(EntityType::Curve))?,
            [a, _] => *a,
            _ => return Err(Error::BrokenChain(format!("{} free ends", free.len()))),
        };

        let mut chain = CurveChain {
            curves: Vec::with_capacity(links.len()),
            reversed: Vec::with_capacity(links.len()),
            ends: if free.is_empty() { vec![start] } else { free },
            inner: Vec::new(),
        };
        let mut current = start;
        while let Some(i) = links.iter().position(|(_, ps)| ps.contains(&current)) {
            let (c, [a, b]) = links.remove(i);
            let reversed = a != current;
            chain.curves.push(c);
            chain.reversed.push(reversed);
            current = if reversed { a } else { b };
        }
        if let Some((c, _)) = links.first() {
            return Err(Error::BrokenChain(format!(
                "{} is not connected to {}",
                name((*c).into()),
                name(curves[0].into())
            )));
        }
        chain.inner = order
            .into_iter()
            .filter(|p| uses[p] == 2 && !chain.ends.contains(p))
            .collect();
        Ok(chain)
    }
}

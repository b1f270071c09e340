// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fusion commands.
//!
//! Pairwise fusions (edges, faces, and their list forms) share one
//! algorithm:
//!
//! 1. Boundary vertices of both groups are classified as belonging to the
//!    first group only, the second only, or both (already common).
//! 2. Each first-group vertex is matched with its nearest second-group
//!    vertex. A target claimed twice, a source without a candidate and a tie
//!    are all fatal.
//! 3. Each first-group entity is mirrored through the matching and its
//!    counterpart is the second-group entity bounded by exactly the mirrored
//!    vertices.
//! 4. Matched vertices and then the entity pair are merged, the first-group
//!    entity being the keeper. Merged vertices become common for the rest of
//!    the command.
//!
//! Matching and counterpart lookup for an entity both happen before any of
//! its merges; on any error the command is rolled back as a whole.
//!
//! [`Glue2Topo`] runs the same classification over the boundary faces of two
//! volumes' blocks but pairs vertices by coincidence and skips faces without
//! a partner. [`JoinCurves`] and [`JoinSurfaces`] replace several geometric
//! entities with their union.

mod edges;
mod faces;
mod glue;
mod join;
mod vertices;

pub use edges::{Fuse2EdgeList, Fuse2Edges};
pub use faces::{Fuse2FaceList, Fuse2Faces};
pub use glue::Glue2Topo;
pub use join::{JoinCurves, JoinSurfaces};
pub use vertices::Fuse2Vertices;

use mgx_topology::correspondence::solve;
use mgx_topology::{
    ChangeLedger, CoEdgeKey, CoFaceKey, EntityKey, EntityType, GeomKey, ModelArena, VertexKey,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::command::ExecutionScope;
use crate::context::Context;
use crate::error::{CommandError, Result};

/// Membership of a boundary vertex during a fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    /// First-group vertex left without a counterpart.
    Unmatched = 0,
    /// Bounds first-group entities only.
    First = 1,
    /// Bounds second-group entities only.
    Second = 2,
    /// Bounds entities of both groups, or was merged already.
    Common = 3,
    /// Second-group vertex already claimed by a first-group vertex.
    Consumed = 4,
}

impl Filter {
    fn join(self, other: Filter) -> Filter {
        if self == other {
            self
        } else {
            Filter::Common
        }
    }
}

/// An entity kind that pairwise fusion works on.
pub(crate) trait Fusible: Copy + Eq + std::hash::Hash + Into<EntityKey> {
    const KIND: EntityType;

    /// Full boundary vertex list.
    fn boundary(arena: &ModelArena, key: Self) -> Result<Vec<VertexKey>>;

    /// Live entities bounded by exactly these vertices.
    fn bounded_by(arena: &ModelArena, vertices: &[VertexKey]) -> Vec<Self>;

    fn merge(arena: &mut ModelArena, ledger: &mut ChangeLedger, keeper: Self, other: Self) -> Result<()>;
}

impl Fusible for CoEdgeKey {
    const KIND: EntityType = EntityType::CoEdge;

    fn boundary(arena: &ModelArena, key: Self) -> Result<Vec<VertexKey>> {
        Ok(arena.live_coedge(key)?.vertices.to_vec())
    }

    fn bounded_by(arena: &ModelArena, vertices: &[VertexKey]) -> Vec<Self> {
        match vertices {
            [a, b] => arena.find_coedges(*a, *b),
            _ => Vec::new(),
        }
    }

    fn merge(arena: &mut ModelArena, ledger: &mut ChangeLedger, keeper: Self, other: Self) -> Result<()> {
        Ok(arena.merge_coedges(ledger, keeper, other)?)
    }
}

impl Fusible for CoFaceKey {
    const KIND: EntityType = EntityType::CoFace;

    fn boundary(arena: &ModelArena, key: Self) -> Result<Vec<VertexKey>> {
        arena.live_coface(key)?;
        arena.coface_vertices(key).ok_or_else(|| {
            CommandError::validation(format!("boundary of {} is not a closed loop", arena.name_of(key.into())))
        })
    }

    fn bounded_by(arena: &ModelArena, vertices: &[VertexKey]) -> Vec<Self> {
        arena.find_cofaces(vertices)
    }

    fn merge(arena: &mut ModelArena, ledger: &mut ChangeLedger, keeper: Self, other: Self) -> Result<()> {
        Ok(arena.merge_cofaces(ledger, keeper, other)?)
    }
}

/// Validation shared by the list fusions, run before anything is touched.
pub(crate) fn check_lists<K: Fusible>(first: &[K], second: &[K]) -> Result<()> {
    if first.is_empty() || second.is_empty() {
        return Err(CommandError::validation(format!(
            "cannot fuse empty lists of {}",
            K::KIND
        )));
    }
    if first.len() != second.len() {
        return Err(CommandError::validation(format!(
            "lists must be of equal size ({} and {})",
            first.len(),
            second.len()
        )));
    }
    let mut seen = FxHashSet::default();
    if first.iter().chain(second).any(|k| !seen.insert(*k)) {
        return Err(CommandError::validation(format!(
            "a {} appears more than once in the lists to fuse",
            K::KIND
        )));
    }
    Ok(())
}

fn check_live<K: Fusible>(arena: &ModelArena, keys: &[K]) -> Result<()> {
    for key in keys {
        arena.ensure_live((*key).into())?;
    }
    Ok(())
}

/// Boundary vertices of two groups of entities, classified by side.
struct Classification<K> {
    filter: FxHashMap<VertexKey, Filter>,
    /// Every boundary vertex, in first-seen order.
    order: Vec<VertexKey>,
    boundaries: FxHashMap<K, Vec<VertexKey>>,
}

impl<K: Fusible> Classification<K> {
    fn new(arena: &ModelArena, first: &[K], second: &[K]) -> Result<Self> {
        let mut filter: FxHashMap<VertexKey, Filter> = FxHashMap::default();
        let mut order = Vec::new();
        let mut boundaries = FxHashMap::default();
        for (keys, side) in [(first, Filter::First), (second, Filter::Second)] {
            for &key in keys {
                let boundary = K::boundary(arena, key)?;
                for &v in &boundary {
                    match filter.get(&v).copied() {
                        Some(f) => {
                            filter.insert(v, f.join(side));
                        }
                        None => {
                            filter.insert(v, side);
                            order.push(v);
                        }
                    }
                }
                boundaries.insert(key, boundary);
            }
        }
        Ok(Self {
            filter,
            order,
            boundaries,
        })
    }

    /// Vertices currently classified as `side`, in first-seen order.
    fn side(&self, side: Filter) -> Vec<VertexKey> {
        self.order
            .iter()
            .copied()
            .filter(|v| self.filter[v] == side)
            .collect()
    }
}

/// Fuses every entity of `second` into its counterpart in `first`.
///
/// Returns the `(keeper, absorbed)` pairs in `first` order.
pub(crate) fn fuse_groups<K: Fusible>(
    ctx: &mut Context,
    scope: &mut ExecutionScope<'_>,
    first: &[K],
    second: &[K],
) -> Result<Vec<(K, K)>> {
    check_live(ctx.arena(), first)?;
    check_live(ctx.arena(), second)?;
    let options = ctx.config().match_options();

    // Classification, in first-seen order so that matching is deterministic.
    let classes = Classification::new(ctx.arena(), first, second)?;
    let sources = classes.side(Filter::First);
    let targets = classes.side(Filter::Second);
    let Classification {
        mut filter,
        order,
        boundaries,
    } = classes;

    // Correspondence: every target may be consumed once.
    let matching = solve(ctx.arena(), &sources, &targets, &options)?;
    for &(_, t) in matching.pairs() {
        filter.insert(t, Filter::Consumed);
    }
    tracing::debug!(
        kind = %K::KIND,
        sources = sources.len(),
        common = order.len() - sources.len() - targets.len(),
        "Vertex correspondence established"
    );

    let mut remaining: Vec<K> = second.to_vec();
    let mut fused = Vec::with_capacity(first.len());
    for &keeper in first {
        scope.checkpoint()?;
        let boundary = &boundaries[&keeper];
        let mirror: Vec<VertexKey> = boundary
            .iter()
            .map(|v| match filter[v] {
                Filter::First => matching.get(*v).unwrap_or(*v),
                _ => *v,
            })
            .collect();

        let candidates = K::bounded_by(ctx.arena(), &mirror);
        let Some(other) = remaining.iter().copied().find(|k| candidates.contains(k)) else {
            let name = ctx.arena().name_of(keeper.into()).to_string();
            if candidates.contains(&keeper) {
                return Err(CommandError::validation(format!("{name} matches itself")));
            }
            return Err(CommandError::NoCounterpart(name));
        };
        remaining.retain(|k| *k != other);

        for &v in boundary {
            if filter[&v] != Filter::First {
                continue;
            }
            if let Some(t) = matching.get(v) {
                ctx.arena_mut().merge_vertices(scope.ledger(), v, t)?;
                snap_vertex(ctx, scope.ledger(), v)?;
            }
            filter.insert(v, Filter::Common);
        }
        K::merge(ctx.arena_mut(), scope.ledger(), keeper, other)?;
        tracing::debug!(
            keeper = ctx.arena().name_of(keeper.into()),
            absorbed = ctx.arena().name_of(other.into()),
            "Fused"
        );
        fused.push((keeper, other));
    }

    scope.ledger().clean_temporaries(ctx.arena_mut());
    Ok(fused)
}

/// Moves a vertex onto the geometry it is associated with.
pub(crate) fn snap_vertex(ctx: &mut Context, ledger: &mut ChangeLedger, vertex: VertexKey) -> Result<()> {
    let arena = ctx.arena();
    let data = arena.live_vertex(vertex)?;
    let target = match data.geom {
        Some(GeomKey::Point(p)) => arena.point(p).map(|p| p.coord),
        Some(GeomKey::Curve(c)) => match arena.curve(c) {
            Some(curve) if !curve.rep.is_empty() => Some(ctx.kernel().project(&data.coord, &curve.rep)?),
            _ => None,
        },
        Some(GeomKey::Surface(s)) => match arena.surface(s) {
            Some(surface) if !surface.rep.is_empty() => Some(ctx.kernel().project(&data.coord, &surface.rep)?),
            _ => None,
        },
        Some(GeomKey::Volume(_)) | None => None,
    };
    if let Some(coord) = target {
        if coord != data.coord {
            ctx.arena_mut().edit_vertex(ledger, vertex)?.coord = coord;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_join() {
        assert_eq!(Filter::First.join(Filter::First), Filter::First);
        assert_eq!(Filter::First.join(Filter::Second), Filter::Common);
        assert_eq!(Filter::Second.join(Filter::Common), Filter::Common);
    }

    #[test]
    fn list_checks() {
        let a = CoEdgeKey::default();
        assert!(matches!(
            check_lists::<CoEdgeKey>(&[], &[]),
            Err(CommandError::Validation(_))
        ));
        let err = check_lists(&[a], &[a]).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}

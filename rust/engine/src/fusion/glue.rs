// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Gluing the block topologies of two volumes along coincident faces.

use mgx_topology::{CoFaceKey, VertexKey, VolumeKey};
use rustc_hash::{FxHashMap, FxHashSet};

use super::{snap_vertex, Classification, Filter, Fusible};
use crate::command::{ExecutionScope, Operation};
use crate::context::Context;
use crate::error::{CommandError, Result};

/// Glues the blocks of volume `second` onto the blocks of volume `first`.
///
/// Only boundary co-faces take part, that is faces bounding a single block.
/// A vertex of the first volume's faces is paired with the first unclaimed
/// vertex of the second volume's faces lying within `glue_epsilon` on every
/// coordinate. Each first-volume face whose vertices all found a partner is
/// fused with the second-volume face bounded by those partners; faces with
/// an unpaired vertex or without such a partner face are left alone.
#[derive(Debug, Clone)]
pub struct Glue2Topo {
    first: VolumeKey,
    second: VolumeKey,
    glued: Vec<(CoFaceKey, CoFaceKey)>,
}

impl Glue2Topo {
    pub fn new(first: VolumeKey, second: VolumeKey) -> Result<Self> {
        if first == second {
            return Err(CommandError::validation(
                "the topology of a volume cannot be glued to itself",
            ));
        }
        Ok(Self {
            first,
            second,
            glued: Vec::new(),
        })
    }

    /// `(keeper, absorbed)` face pairs of the last execute.
    pub fn glued(&self) -> &[(CoFaceKey, CoFaceKey)] {
        &self.glued
    }
}

impl Operation for Glue2Topo {
    fn name(&self) -> &str {
        "Glue2Topo"
    }

    fn pre_execute(&mut self, ctx: &mut Context) -> Result<()> {
        ctx.arena().ensure_live(self.first.into())?;
        ctx.arena().ensure_live(self.second.into())?;
        Ok(())
    }

    fn internal_execute(&mut self, ctx: &mut Context, scope: &mut ExecutionScope<'_>) -> Result<()> {
        let arena = ctx.arena();
        let faces1 = arena.boundary_cofaces(&arena.volume_blocks(self.first));
        let faces2 = arena.boundary_cofaces(&arena.volume_blocks(self.second));

        let classes = Classification::new(arena, &faces1, &faces2)?;
        let sources = classes.side(Filter::First);
        let targets = classes.side(Filter::Second);
        let Classification {
            mut filter,
            boundaries,
            ..
        } = classes;

        let epsilon = ctx.config().glue_epsilon;
        let mut matching: FxHashMap<VertexKey, VertexKey> = FxHashMap::default();
        let mut claimed = FxHashSet::default();
        for &s in &sources {
            let origin = arena.live_vertex(s)?.coord;
            let mut partner = None;
            for &t in &targets {
                if !claimed.contains(&t) && (arena.live_vertex(t)?.coord - origin).amax() <= epsilon {
                    partner = Some(t);
                    break;
                }
            }
            match partner {
                Some(t) => {
                    claimed.insert(t);
                    matching.insert(s, t);
                }
                None => {
                    filter.insert(s, Filter::Unmatched);
                }
            }
        }
        tracing::debug!(
            first_faces = faces1.len(),
            second_faces = faces2.len(),
            paired = matching.len(),
            "Glue candidates collected"
        );

        self.glued.clear();
        let mut remaining = faces2;
        for keeper in faces1 {
            scope.checkpoint()?;
            let boundary = &boundaries[&keeper];
            if boundary.iter().any(|v| filter[v] == Filter::Unmatched) {
                continue;
            }
            let mirror: Vec<VertexKey> = boundary
                .iter()
                .map(|v| match filter[v] {
                    Filter::First => matching.get(v).copied().unwrap_or(*v),
                    _ => *v,
                })
                .collect();
            let candidates = CoFaceKey::bounded_by(ctx.arena(), &mirror);
            let Some(other) = remaining
                .iter()
                .copied()
                .find(|f| *f != keeper && candidates.contains(f))
            else {
                continue;
            };
            remaining.retain(|f| *f != other);

            for &v in boundary {
                if filter[&v] != Filter::First {
                    continue;
                }
                if let Some(&t) = matching.get(&v) {
                    ctx.arena_mut().merge_vertices(scope.ledger(), v, t)?;
                    snap_vertex(ctx, scope.ledger(), v)?;
                }
                filter.insert(v, Filter::Common);
            }
            CoFaceKey::merge(ctx.arena_mut(), scope.ledger(), keeper, other)?;
            tracing::debug!(
                keeper = ctx.arena().name_of(keeper.into()),
                absorbed = ctx.arena().name_of(other.into()),
                "Faces glued"
            );
            self.glued.push((keeper, other));
        }

        scope.ledger().clean_temporaries(ctx.arena_mut());
        Ok(())
    }

    fn post_execute(&mut self, _ctx: &mut Context, has_error: bool) {
        if has_error {
            self.glued.clear();
        }
    }
}

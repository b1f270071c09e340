// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Co-face fusion.
//!
//! Gluing two blocks along a face: the vertices and co-edges of the absorbed
//! face are merged into those of the keeper, and the blocks bounded by the
//! absorbed face end up bounded by the keeper.

use mgx_topology::CoFaceKey;

use super::{check_lists, fuse_groups};
use crate::command::{ExecutionScope, Operation};
use crate::context::Context;
use crate::error::Result;

/// Fuses co-face `other` into `keeper`.
#[derive(Debug, Clone)]
pub struct Fuse2Faces {
    keeper: CoFaceKey,
    other: CoFaceKey,
}

impl Fuse2Faces {
    pub fn new(keeper: CoFaceKey, other: CoFaceKey) -> Result<Self> {
        check_lists(&[keeper], &[other])?;
        Ok(Self { keeper, other })
    }
}

impl Operation for Fuse2Faces {
    fn name(&self) -> &str {
        "Fuse2Faces"
    }

    fn internal_execute(&mut self, ctx: &mut Context, scope: &mut ExecutionScope<'_>) -> Result<()> {
        fuse_groups(ctx, scope, &[self.keeper], &[self.other])?;
        Ok(())
    }
}

/// Fuses two equal-size lists of co-faces.
#[derive(Debug, Clone)]
pub struct Fuse2FaceList {
    first: Vec<CoFaceKey>,
    second: Vec<CoFaceKey>,
    fused: Vec<(CoFaceKey, CoFaceKey)>,
}

impl Fuse2FaceList {
    pub fn new(first: Vec<CoFaceKey>, second: Vec<CoFaceKey>) -> Result<Self> {
        check_lists(&first, &second)?;
        Ok(Self {
            first,
            second,
            fused: Vec::new(),
        })
    }

    /// `(keeper, absorbed)` pairs of the last execute.
    pub fn fused(&self) -> &[(CoFaceKey, CoFaceKey)] {
        &self.fused
    }
}

impl Operation for Fuse2FaceList {
    fn name(&self) -> &str {
        "Fuse2FaceList"
    }

    fn internal_execute(&mut self, ctx: &mut Context, scope: &mut ExecutionScope<'_>) -> Result<()> {
        self.fused = fuse_groups(ctx, scope, &self.first, &self.second)?;
        Ok(())
    }

    fn post_execute(&mut self, _ctx: &mut Context, has_error: bool) {
        if has_error {
            self.fused.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::config::EngineConfig;
    use crate::error::CommandError;
    use mgx_topology::construction::make_quad;
    use mgx_topology::{ChangeKind, ChangeLedger, EntityType, Point3, VertexKey};

    fn quad_at(ctx: &mut Context, ledger: &mut ChangeLedger, x: f64, z: f64) -> CoFaceKey {
        let arena = ctx.arena_mut();
        let corners: [VertexKey; 4] = [
            arena.add_vertex(ledger, Point3::new(x, 0.0, z)),
            arena.add_vertex(ledger, Point3::new(x + 1.0, 0.0, z)),
            arena.add_vertex(ledger, Point3::new(x + 1.0, 1.0, z)),
            arena.add_vertex(ledger, Point3::new(x, 1.0, z)),
        ];
        make_quad(arena, ledger, corners).unwrap().0
    }

    #[test]
    fn glued_faces_share_blocks() {
        let mut ctx = Context::new(EngineConfig::new());
        let mut ledger = ChangeLedger::new(None);
        let top = quad_at(&mut ctx, &mut ledger, 0.0, 0.0);
        let bottom = quad_at(&mut ctx, &mut ledger, 0.0, 0.0005);
        let upper = ctx.arena_mut().add_block(&mut ledger, &[top]).unwrap();
        let lower = ctx.arena_mut().add_block(&mut ledger, &[bottom]).unwrap();

        let cmd = Command::new(&mut ctx, Fuse2Faces::new(top, bottom).unwrap());
        cmd.execute(&mut ctx).unwrap();

        let arena = ctx.arena();
        assert_eq!(arena.coface(top).unwrap().blocks, vec![upper, lower]);
        assert_eq!(arena.block(lower).unwrap().cofaces, vec![top]);
        assert_eq!(arena.live_count(EntityType::CoFace), 1);
        assert_eq!(arena.live_count(EntityType::CoEdge), 4);
        assert_eq!(arena.live_count(EntityType::Vertex), 4);
        arena.validate().unwrap();
        assert_eq!(
            cmd.ledger().get(bottom.into()),
            Some(ChangeKind::Replaced { by: top.into() })
        );
    }

    #[test]
    fn face_lists_are_paired_by_geometry() {
        let mut ctx = Context::new(EngineConfig::new());
        let mut ledger = ChangeLedger::new(None);
        let a = quad_at(&mut ctx, &mut ledger, 0.0, 0.0);
        let b = quad_at(&mut ctx, &mut ledger, 3.0, 0.0);
        let c = quad_at(&mut ctx, &mut ledger, 3.0, 0.0005);
        let d = quad_at(&mut ctx, &mut ledger, 0.0, 0.0005);

        let op = Fuse2FaceList::new(vec![a, b], vec![c, d]).unwrap();
        let cmd = Command::new(&mut ctx, op);
        cmd.execute(&mut ctx).unwrap();

        let arena = ctx.arena();
        assert_eq!(arena.resolve(d.into()), a.into());
        assert_eq!(arena.resolve(c.into()), b.into());
        assert_eq!(arena.live_count(EntityType::CoFace), 2);
        let ledger = cmd.ledger();
        assert_eq!(
            ledger.count(EntityType::CoFace, |k| matches!(k, ChangeKind::Replaced { .. })),
            2
        );
    }

    #[test]
    fn faces_without_counterpart_fail_cleanly() {
        let mut ctx = Context::new(EngineConfig::new());
        let mut ledger = ChangeLedger::new(None);
        let a = quad_at(&mut ctx, &mut ledger, 0.0, 0.0);
        // A triangle over three corners of the quad: the fourth corner is
        // equidistant from two triangle vertices.
        let arena = ctx.arena_mut();
        let t0 = arena.add_vertex(&mut ledger, Point3::new(0.0, 0.0, 0.0005));
        let t1 = arena.add_vertex(&mut ledger, Point3::new(1.0, 0.0, 0.0005));
        let t2 = arena.add_vertex(&mut ledger, Point3::new(1.0, 1.0, 0.0005));
        let e0 = arena.add_coedge(&mut ledger, t0, t1).unwrap();
        let e1 = arena.add_coedge(&mut ledger, t1, t2).unwrap();
        let e2 = arena.add_coedge(&mut ledger, t2, t0).unwrap();
        let tri = arena.add_coface(&mut ledger, &[e0, e1, e2]).unwrap();
        let before = ctx.arena().snapshot();

        let cmd = Command::new(&mut ctx, Fuse2Faces::new(a, tri).unwrap());
        let err = cmd.execute(&mut ctx).unwrap_err();
        assert!(matches!(err, CommandError::Correspondence(_)));
        assert_eq!(ctx.arena().snapshot(), before);
    }
}

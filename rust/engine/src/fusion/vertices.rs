// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use mgx_topology::VertexKey;

use super::snap_vertex;
use crate::command::{ExecutionScope, Operation};
use crate::context::Context;
use crate::error::{CommandError, Result};

/// Fuses vertex `other` into `keeper`.
///
/// Rejected when both vertices bound the same co-edge, which would
/// collapse it.
#[derive(Debug, Clone)]
pub struct Fuse2Vertices {
    keeper: VertexKey,
    other: VertexKey,
}

impl Fuse2Vertices {
    pub fn new(keeper: VertexKey, other: VertexKey) -> Result<Self> {
        if keeper == other {
            return Err(CommandError::validation("cannot fuse a vertex with itself"));
        }
        Ok(Self { keeper, other })
    }
}

impl Operation for Fuse2Vertices {
    fn name(&self) -> &str {
        "Fuse2Vertices"
    }

    fn pre_execute(&mut self, ctx: &mut Context) -> Result<()> {
        let arena = ctx.arena();
        arena.ensure_live(self.keeper.into())?;
        arena.ensure_live(self.other.into())?;
        if arena.vertices_share_coedge(self.keeper, self.other) {
            return Err(CommandError::validation(format!(
                "{} and {} bound the same co-edge",
                arena.name_of(self.keeper.into()),
                arena.name_of(self.other.into())
            )));
        }
        Ok(())
    }

    fn internal_execute(&mut self, ctx: &mut Context, scope: &mut ExecutionScope<'_>) -> Result<()> {
        ctx.arena_mut().merge_vertices(scope.ledger(), self.keeper, self.other)?;
        snap_vertex(ctx, scope.ledger(), self.keeper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, CommandStatus};
    use crate::config::EngineConfig;
    use mgx_topology::{ChangeLedger, GeomKey, Point3, Representation};

    #[test]
    fn absorbed_vertex_edges_move_to_keeper() {
        let mut ctx = Context::new(EngineConfig::new());
        let mut ledger = ChangeLedger::new(None);
        let arena = ctx.arena_mut();
        let a = arena.add_vertex(&mut ledger, Point3::new(0.0, 0.0, 0.0));
        let b = arena.add_vertex(&mut ledger, Point3::new(0.0, 0.0, 0.01));
        let c = arena.add_vertex(&mut ledger, Point3::new(1.0, 0.0, 0.0));
        let e = arena.add_coedge(&mut ledger, b, c).unwrap();

        let cmd = Command::new(&mut ctx, Fuse2Vertices::new(a, b).unwrap());
        cmd.execute(&mut ctx).unwrap();
        assert_eq!(ctx.arena().coedge_vertices(e), Some([a, c]));
        assert_eq!(ctx.arena().resolve(b.into()), a.into());
    }

    #[test]
    fn vertices_of_one_edge_cannot_fuse() {
        let mut ctx = Context::new(EngineConfig::new());
        let mut ledger = ChangeLedger::new(None);
        let arena = ctx.arena_mut();
        let a = arena.add_vertex(&mut ledger, Point3::new(0.0, 0.0, 0.0));
        let b = arena.add_vertex(&mut ledger, Point3::new(1.0, 0.0, 0.0));
        arena.add_coedge(&mut ledger, a, b).unwrap();

        let cmd = Command::new(&mut ctx, Fuse2Vertices::new(a, b).unwrap());
        assert!(matches!(cmd.execute(&mut ctx), Err(CommandError::Validation(_))));
        assert_eq!(cmd.status(), CommandStatus::Fail);
        assert!(ctx.arena().is_live(b.into()));
    }

    #[test]
    fn keeper_snaps_onto_adopted_curve() {
        let mut ctx = Context::new(EngineConfig::new());
        let mut ledger = ChangeLedger::new(None);
        let arena = ctx.arena_mut();
        let a = arena.add_vertex(&mut ledger, Point3::new(0.5, 0.2, 0.0));
        let b = arena.add_vertex(&mut ledger, Point3::new(0.5, 0.0, 0.0));
        let p0 = arena.add_point(&mut ledger, Point3::new(0.0, 0.0, 0.0));
        let p1 = arena.add_point(&mut ledger, Point3::new(1.0, 0.0, 0.0));
        let rep = Representation::polyline(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)]);
        let curve = arena.add_curve(&mut ledger, &[p0, p1], rep).unwrap();
        arena.associate(&mut ledger, b.into(), GeomKey::Curve(curve)).unwrap();

        let cmd = Command::new(&mut ctx, Fuse2Vertices::new(a, b).unwrap());
        cmd.execute(&mut ctx).unwrap();
        let kept = ctx.arena().vertex(a).unwrap();
        assert_eq!(kept.geom, Some(GeomKey::Curve(curve)));
        approx::assert_relative_eq!(kept.coord, Point3::new(0.5, 0.0, 0.0), epsilon = 1e-12);
    }
}

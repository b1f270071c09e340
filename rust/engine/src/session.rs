// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session facade: a context plus its command history.

use std::sync::Arc;

use mgx_topology::{
    ChangeLedger, CoEdgeKey, CoFaceKey, CurveKey, EntityKey, EntityType, ModelArena, SurfaceKey,
    VertexKey, VolumeKey,
};
use parking_lot::Mutex;

use crate::command::{Command, ExecutionScope, Operation};
use crate::config::EngineConfig;
use crate::context::Context;
use crate::error::{CommandError, Result};
use crate::fusion::{
    Fuse2EdgeList, Fuse2Edges, Fuse2FaceList, Fuse2Faces, Fuse2Vertices, Glue2Topo, JoinCurves, JoinSurfaces,
};
use crate::kernel::GeometricKernel;
use crate::manager::CommandManager;

type BuildFn = Box<dyn FnOnce(&mut ModelArena, &mut ChangeLedger) -> mgx_topology::Result<()> + Send>;

/// Runs arbitrary ledger-tracked construction code as an undoable command.
pub struct Construct {
    name: String,
    build: Option<BuildFn>,
}

impl Construct {
    pub fn new<F>(name: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ModelArena, &mut ChangeLedger) -> mgx_topology::Result<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            build: Some(Box::new(build)),
        }
    }
}

impl Operation for Construct {
    fn name(&self) -> &str {
        &self.name
    }

    fn internal_execute(&mut self, ctx: &mut Context, scope: &mut ExecutionScope<'_>) -> Result<()> {
        let build = self
            .build
            .take()
            .ok_or_else(|| CommandError::InvalidState(format!("{} already ran", self.name)))?;
        build(ctx.arena_mut(), scope.ledger())?;
        Ok(())
    }
}

/// A modelling session.
///
/// Every model change goes through a command recorded in the history, so
/// any of them can be undone.
#[derive(Debug)]
pub struct Session {
    ctx: Context,
    history: CommandManager,
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        let limit = config.history_limit;
        Self {
            ctx: Context::new(config),
            history: CommandManager::new(limit),
        }
    }

    pub fn with_kernel(config: EngineConfig, kernel: Box<dyn GeometricKernel>) -> Self {
        let limit = config.history_limit;
        Self {
            ctx: Context::with_kernel(config, kernel),
            history: CommandManager::new(limit),
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn arena(&self) -> &ModelArena {
        self.ctx.arena()
    }

    pub fn history(&self) -> &CommandManager {
        &self.history
    }

    /// Executes an operation as a new command.
    pub fn run(&mut self, operation: impl Operation + 'static) -> Result<&Command> {
        let command = Command::new(&mut self.ctx, operation);
        self.history.execute(&mut self.ctx, command)
    }

    /// Runs construction code as one undoable command and returns its
    /// output.
    pub fn build<T, F>(&mut self, name: &str, build: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut ModelArena, &mut ChangeLedger) -> mgx_topology::Result<T> + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(None));
        let output = Arc::clone(&slot);
        self.run(Construct::new(name, move |arena, ledger| {
            *output.lock() = Some(build(arena, ledger)?);
            Ok(())
        }))?;
        let value = slot.lock().take();
        value.ok_or_else(|| CommandError::InvalidState(format!("{name} produced nothing")))
    }

    pub fn undo(&mut self) -> Result<&Command> {
        self.history.undo(&mut self.ctx)
    }

    pub fn redo(&mut self) -> Result<&Command> {
        self.history.redo(&mut self.ctx)
    }

    // --- Fusion ---

    pub fn fuse2_edges(&mut self, keeper: CoEdgeKey, other: CoEdgeKey) -> Result<&Command> {
        self.run(Fuse2Edges::new(keeper, other)?)
    }

    pub fn fuse2_edge_list(&mut self, first: Vec<CoEdgeKey>, second: Vec<CoEdgeKey>) -> Result<&Command> {
        self.run(Fuse2EdgeList::new(first, second)?)
    }

    pub fn fuse2_faces(&mut self, keeper: CoFaceKey, other: CoFaceKey) -> Result<&Command> {
        self.run(Fuse2Faces::new(keeper, other)?)
    }

    pub fn fuse2_face_list(&mut self, first: Vec<CoFaceKey>, second: Vec<CoFaceKey>) -> Result<&Command> {
        self.run(Fuse2FaceList::new(first, second)?)
    }

    pub fn fuse2_vertices(&mut self, keeper: VertexKey, other: VertexKey) -> Result<&Command> {
        self.run(Fuse2Vertices::new(keeper, other)?)
    }

    /// Glues the blocks of volume `second` onto those of volume `first`.
    pub fn glue2_topo(&mut self, first: VolumeKey, second: VolumeKey) -> Result<&Command> {
        self.run(Glue2Topo::new(first, second)?)
    }

    /// Joins a chain of curves and returns the union curve.
    pub fn join_curves(&mut self, curves: Vec<CurveKey>) -> Result<CurveKey> {
        let command = self.run(JoinCurves::new(curves)?)?;
        let union = command.ledger().created().find_map(|k| match k {
            EntityKey::Curve(c) => Some(c),
            _ => None,
        });
        union.ok_or_else(|| CommandError::InvalidState("join created no curve".into()))
    }

    /// Joins surfaces and returns the union surface.
    pub fn join_surfaces(&mut self, surfaces: Vec<SurfaceKey>) -> Result<SurfaceKey> {
        let command = self.run(JoinSurfaces::new(surfaces)?)?;
        let union = command.ledger().created().find_map(|k| match k {
            EntityKey::Surface(s) => Some(s),
            _ => None,
        });
        union.ok_or_else(|| CommandError::InvalidState("join created no surface".into()))
    }

    // --- Lookup by name ---

    /// Live entity with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<EntityKey> {
        self.arena().find_by_name(name)
    }

    fn lookup<K>(&self, name: &str, expected: EntityType, extract: fn(EntityKey) -> Option<K>) -> Result<K> {
        let key = self
            .find_by_name(name)
            .ok_or_else(|| CommandError::validation(format!("no entity named {name}")))?;
        extract(key).ok_or_else(|| {
            CommandError::validation(format!(
                "{name} is a {}, expected a {expected}",
                key.entity_type()
            ))
        })
    }

    pub fn vertex_named(&self, name: &str) -> Result<VertexKey> {
        self.lookup(name, EntityType::Vertex, |k| match k {
            EntityKey::Vertex(v) => Some(v),
            _ => None,
        })
    }

    pub fn coedge_named(&self, name: &str) -> Result<CoEdgeKey> {
        self.lookup(name, EntityType::CoEdge, |k| match k {
            EntityKey::CoEdge(e) => Some(e),
            _ => None,
        })
    }

    pub fn coface_named(&self, name: &str) -> Result<CoFaceKey> {
        self.lookup(name, EntityType::CoFace, |k| match k {
            EntityKey::CoFace(f) => Some(f),
            _ => None,
        })
    }

    pub fn curve_named(&self, name: &str) -> Result<CurveKey> {
        self.lookup(name, EntityType::Curve, |k| match k {
            EntityKey::Curve(c) => Some(c),
            _ => None,
        })
    }

    /// Surface with the given name; any other kind of entity is a
    /// dimension error.
    pub fn surface_named(&self, name: &str) -> Result<SurfaceKey> {
        self.lookup(name, EntityType::Surface, |k| match k {
            EntityKey::Surface(s) => Some(s),
            _ => None,
        })
    }

    pub fn volume_named(&self, name: &str) -> Result<VolumeKey> {
        self.lookup(name, EntityType::Volume, |k| match k {
            EntityKey::Volume(v) => Some(v),
            _ => None,
        })
    }

    pub fn join_curves_by_name(&mut self, names: &[&str]) -> Result<CurveKey> {
        let curves = names
            .iter()
            .map(|n| self.curve_named(n))
            .collect::<Result<Vec<_>>>()?;
        self.join_curves(curves)
    }

    pub fn glue2_topo_by_name(&mut self, first: &str, second: &str) -> Result<&Command> {
        let first = self.volume_named(first)?;
        let second = self.volume_named(second)?;
        self.glue2_topo(first, second)
    }

    pub fn join_surfaces_by_name(&mut self, names: &[&str]) -> Result<SurfaceKey> {
        let surfaces = names
            .iter()
            .map(|n| self.surface_named(n))
            .collect::<Result<Vec<_>>>()?;
        self.join_surfaces(surfaces)
    }

    /// JSON export of the live model.
    pub fn to_json(&self) -> Result<String> {
        Ok(self.arena().to_json()?)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mgx_topology::Point3;

    #[test]
    fn build_returns_output_and_is_undoable() {
        let mut session = Session::new(EngineConfig::new());
        let (a, b) = session
            .build("two vertices", |arena, ledger| {
                Ok((
                    arena.add_vertex(ledger, Point3::origin()),
                    arena.add_vertex(ledger, Point3::new(1.0, 0.0, 0.0)),
                ))
            })
            .unwrap();
        assert!(session.arena().is_live(a.into()));
        assert_eq!(session.vertex_named("Som1").unwrap(), b);

        session.undo().unwrap();
        assert_eq!(session.arena().vertex_count(), 0);
        session.redo().unwrap();
        assert_eq!(session.arena().vertex_count(), 2);
    }

    #[test]
    fn failed_build_leaves_no_trace() {
        let mut session = Session::new(EngineConfig::new());
        let err = session
            .build("bad edge", |arena, ledger| {
                let v = arena.add_vertex(ledger, Point3::origin());
                arena.add_coedge(ledger, v, v)
            })
            .unwrap_err();
        assert!(matches!(err, CommandError::Topology(_)));
        assert_eq!(session.arena().total_count(), 0);
        assert!(!session.history().can_undo());
    }

    #[test]
    fn name_lookup_checks_kind() {
        let mut session = Session::new(EngineConfig::new());
        session
            .build("vertex", |arena, ledger| Ok(arena.add_vertex(ledger, Point3::origin())))
            .unwrap();
        let err = session.surface_named("Som0").unwrap_err();
        assert_eq!(err.to_string(), "Som0 is a Vertex, expected a Surface");
        assert!(session.coedge_named("Ar9").is_err());
    }
}

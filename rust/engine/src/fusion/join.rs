// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Union of several curves or surfaces into one.

use mgx_topology::{CurveChain, CurveKey, Representation, SurfaceKey, VolumeKey};
use rustc_hash::FxHashSet;

use crate::command::{ExecutionScope, Operation};
use crate::context::Context;
use crate::error::{CommandError, Result};

/// Replaces several surfaces of the same volumes with their union.
///
/// The union's representation is built by the geometric kernel from copies
/// of the inputs' representations. Curves bounding a single input bound the
/// union; curves between two inputs are retired. The union joins every group
/// of the first input.
#[derive(Debug, Clone)]
pub struct JoinSurfaces {
    inputs: Vec<SurfaceKey>,
    union: Option<SurfaceKey>,
}

impl JoinSurfaces {
    pub fn new(inputs: Vec<SurfaceKey>) -> Result<Self> {
        if inputs.len() < 2 {
            return Err(CommandError::validation("at least two surfaces are needed for a join"));
        }
        let mut seen = FxHashSet::default();
        if inputs.iter().any(|s| !seen.insert(*s)) {
            return Err(CommandError::validation("a surface appears more than once in the join"));
        }
        Ok(Self { inputs, union: None })
    }

    /// Surface created by the last successful execute.
    pub fn union(&self) -> Option<SurfaceKey> {
        self.union
    }
}

impl Operation for JoinSurfaces {
    fn name(&self) -> &str {
        "JoinSurfaces"
    }

    fn pre_execute(&mut self, ctx: &mut Context) -> Result<()> {
        let arena = ctx.arena();
        let volumes_of = |s: SurfaceKey| -> Result<FxHashSet<VolumeKey>> {
            Ok(arena.live_surface(s)?.volumes.iter().copied().collect())
        };
        let first = self.inputs[0];
        let expected = volumes_of(first)?;
        for &s in &self.inputs[1..] {
            if volumes_of(s)? != expected {
                return Err(CommandError::validation(format!(
                    "surfaces {} and {} do not belong to the same volumes",
                    arena.name_of(first.into()),
                    arena.name_of(s.into())
                )));
            }
        }
        Ok(())
    }

    fn internal_execute(&mut self, ctx: &mut Context, scope: &mut ExecutionScope<'_>) -> Result<()> {
        let mut reps: Vec<Representation> = Vec::with_capacity(self.inputs.len());
        for &s in &self.inputs {
            let rep = &ctx.arena().live_surface(s)?.rep;
            reps.push(ctx.kernel().clone_representation(rep)?);
        }
        let rep = ctx.kernel().union(&reps)?;
        scope.checkpoint()?;

        let union = ctx.arena_mut().unite_surfaces(scope.ledger(), &self.inputs, rep)?;
        let first = self.inputs[0];
        for group in ctx.arena().groups_containing(first.into()) {
            ctx.arena_mut().add_to_group(scope.ledger(), group, union.into())?;
        }
        tracing::debug!(
            inputs = self.inputs.len(),
            union = ctx.arena().name_of(union.into()),
            "Surfaces joined"
        );
        self.union = Some(union);
        Ok(())
    }

    fn post_execute(&mut self, _ctx: &mut Context, has_error: bool) {
        if has_error {
            self.union = None;
        }
    }
}

/// Replaces a chain of curves bounding the same surfaces with their union.
///
/// The inputs must meet end to end. Their representations are oriented
/// along the chain before the kernel unites them. Points shared by two
/// inputs are retired; the union joins every group of the first input.
#[derive(Debug, Clone)]
pub struct JoinCurves {
    inputs: Vec<CurveKey>,
    chain: Option<CurveChain>,
    union: Option<CurveKey>,
}

impl JoinCurves {
    pub fn new(inputs: Vec<CurveKey>) -> Result<Self> {
        if inputs.len() < 2 {
            return Err(CommandError::validation("at least two curves are needed for a join"));
        }
        let mut seen = FxHashSet::default();
        if inputs.iter().any(|c| !seen.insert(*c)) {
            return Err(CommandError::validation("a curve appears more than once in the join"));
        }
        Ok(Self {
            inputs,
            chain: None,
            union: None,
        })
    }

    /// Curve created by the last successful execute.
    pub fn union(&self) -> Option<CurveKey> {
        self.union
    }
}

impl Operation for JoinCurves {
    fn name(&self) -> &str {
        "JoinCurves"
    }

    fn pre_execute(&mut self, ctx: &mut Context) -> Result<()> {
        let arena = ctx.arena();
        let surfaces_of = |c: CurveKey| -> Result<FxHashSet<SurfaceKey>> {
            Ok(arena.live_curve(c)?.surfaces.iter().copied().collect())
        };
        let first = self.inputs[0];
        let expected = surfaces_of(first)?;
        for &c in &self.inputs[1..] {
            if surfaces_of(c)? != expected {
                return Err(CommandError::validation(format!(
                    "curves {} and {} do not bound the same surfaces",
                    arena.name_of(first.into()),
                    arena.name_of(c.into())
                )));
            }
        }
        self.chain = Some(arena.chain_curves(&self.inputs)?);
        Ok(())
    }

    fn internal_execute(&mut self, ctx: &mut Context, scope: &mut ExecutionScope<'_>) -> Result<()> {
        let chain = self
            .chain
            .take()
            .ok_or_else(|| CommandError::InvalidState("curves were not chained".into()))?;
        let mut reps: Vec<Representation> = Vec::with_capacity(chain.curves.len());
        for (&c, &reversed) in chain.curves.iter().zip(&chain.reversed) {
            let mut rep = ctx.kernel().clone_representation(&ctx.arena().live_curve(c)?.rep)?;
            if reversed && rep.is_polyline() {
                rep.points.reverse();
            }
            reps.push(rep);
        }
        let rep = ctx.kernel().union(&reps)?;
        scope.checkpoint()?;

        let union = ctx.arena_mut().unite_curves(scope.ledger(), &chain, rep)?;
        for group in ctx.arena().groups_containing(self.inputs[0].into()) {
            ctx.arena_mut().add_to_group(scope.ledger(), group, union.into())?;
        }
        tracing::debug!(
            inputs = chain.curves.len(),
            retired_points = chain.inner.len(),
            union = ctx.arena().name_of(union.into()),
            "Curves joined"
        );
        self.union = Some(union);
        Ok(())
    }

    fn post_execute(&mut self, _ctx: &mut Context, has_error: bool) {
        self.chain = None;
        if has_error {
            self.union = None;
        }
    }
}

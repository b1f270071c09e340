// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Co-edge fusion.

use mgx_topology::CoEdgeKey;

use super::{check_lists, fuse_groups};
use crate::command::{ExecutionScope, Operation};
use crate::context::Context;
use crate::error::Result;

/// Fuses co-edge `other` into `keeper`, merging their matched vertices.
#[derive(Debug, Clone)]
pub struct Fuse2Edges {
    keeper: CoEdgeKey,
    other: CoEdgeKey,
}

impl Fuse2Edges {
    pub fn new(keeper: CoEdgeKey, other: CoEdgeKey) -> Result<Self> {
        check_lists(&[keeper], &[other])?;
        Ok(Self { keeper, other })
    }
}

impl Operation for Fuse2Edges {
    fn name(&self) -> &str {
        "Fuse2Edges"
    }

    fn internal_execute(&mut self, ctx: &mut Context, scope: &mut ExecutionScope<'_>) -> Result<()> {
        fuse_groups(ctx, scope, &[self.keeper], &[self.other])?;
        Ok(())
    }
}

/// Fuses two equal-size lists of co-edges.
///
/// The lists need not be in corresponding order: counterparts are found
/// through the vertex correspondence of the two lists' boundaries.
#[derive(Debug, Clone)]
pub struct Fuse2EdgeList {
    first: Vec<CoEdgeKey>,
    second: Vec<CoEdgeKey>,
    fused: Vec<(CoEdgeKey, CoEdgeKey)>,
}

impl Fuse2EdgeList {
    pub fn new(first: Vec<CoEdgeKey>, second: Vec<CoEdgeKey>) -> Result<Self> {
        check_lists(&first, &second)?;
        Ok(Self {
            first,
            second,
            fused: Vec::new(),
        })
    }

    /// `(keeper, absorbed)` pairs of the last execute.
    pub fn fused(&self) -> &[(CoEdgeKey, CoEdgeKey)] {
        &self.fused
    }
}

impl Operation for Fuse2EdgeList {
    fn name(&self) -> &str {
        "Fuse2EdgeList"
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

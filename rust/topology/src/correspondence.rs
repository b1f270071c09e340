// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Nearest-vertex correspondence between two vertex sets.
//!
//! Every source vertex is matched greedily with its nearest target under
//! Euclidean distance. This is not a globally optimal assignment. Ties are
//! made explicit instead of being settled by iteration order: when the two
//! closest targets are within [`MatchOptions::tie_epsilon`] of each other
//! the source is reported as [`CorrespondenceError::Ambiguous`].
//!
//! [`solve`] returns either a total, injective map over the sources or an
//! error; a partial map is never returned.

use rustc_hash::FxHashMap;

use crate::arena::ModelArena;
use crate::error::{Error, Result};
use crate::keys::VertexKey;

/// Tuning of the nearest-vertex search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Candidates whose distance differs from the best by at most this much
    /// are considered tied.
    pub tie_epsilon: f64,
    /// Candidates farther than this are ignored. `None` accepts any distance.
    pub max_distance: Option<f64>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            tie_epsilon: 1e-10,
            max_distance: None,
        }
    }
}

/// Failure of the correspondence search.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CorrespondenceError {
    /// No target lies within reach of the source.
    #[error("no matching vertex for {source_name}")]
    NoCandidate {
        vertex: VertexKey,
        source_name: String,
    },

    /// Two targets are equally close to the source.
    #[error("ambiguous match for {source_name}: {first_name} and {second_name} are equidistant")]
    Ambiguous {
        vertex: VertexKey,
        candidates: [VertexKey; 2],
        source_name: String,
        first_name: String,
        second_name: String,
    },

    /// Two sources were matched with the same target.
    #[error("two vertices ({first_name}, {second_name}) map onto the same vertex {target_name}")]
    Conflict {
        target: VertexKey,
        sources: [VertexKey; 2],
        target_name: String,
        first_name: String,
        second_name: String,
    },
}

/// An injective map from source vertices to target vertices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Correspondence {
    pairs: Vec<(VertexKey, VertexKey)>,
    index: FxHashMap<VertexKey, VertexKey>,
}

impl Correspondence {
    /// Target matched with `source`.
    pub fn get(&self, source: VertexKey) -> Option<VertexKey> {
        self.index.get(&source).copied()
    }

    /// Pairs in source order.
    pub fn pairs(&self) -> &[(VertexKey, VertexKey)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Finds the nearest target of a single source vertex.
pub fn nearest(
    arena: &ModelArena,
    source: VertexKey,
    targets: &[VertexKey],
    options: &MatchOptions,
) -> Result<VertexKey> {
    let origin = arena.live_vertex(source)?.coord;

    let mut best: Option<(VertexKey, f64)> = None;
    let mut runner_up: Option<(VertexKey, f64)> = None;
    for &t in targets {
        let d = nalgebra::distance(&origin, &arena.live_vertex(t)?.coord);
        if options.max_distance.is_some_and(|max| d > max) {
            continue;
        }
        match best {
            Some((_, bd)) if d >= bd => {
                if runner_up.map_or(true, |(_, rd)| d < rd) {
                    runner_up = Some((t, d));
                }
            }
            _ => {
                runner_up = best;
                best = Some((t, d));
            }
        }
    }

    let (winner, best_distance) = best.ok_or_else(|| CorrespondenceError::NoCandidate {
        vertex: source,
        source_name: arena.name_of(source.into()).to_string(),
    })?;
    if let Some((other, d)) = runner_up {
        if d - best_distance <= options.tie_epsilon {
            // Report in target order so the message does not depend on which
            // of the two was met first.
            let (a, b) = if targets.iter().position(|t| *t == winner) < targets.iter().position(|t| *t == other) {
                (winner, other)
            } else {
                (other, winner)
            };
            return Err(CorrespondenceError::Ambiguous {
                vertex: source,
                candidates: [a, b],
                source_name: arena.name_of(source.into()).to_string(),
                first_name: arena.name_of(a.into()).to_string(),
                second_name: arena.name_of(b.into()).to_string(),
            }
            .into());
        }
    }
    Ok(winner)
}

/// Matches every source with its nearest target.
///
/// Fails on the first source without a candidate, on the first tie, and when
/// two sources pick the same target.
pub fn solve(
    arena: &ModelArena,
    sources: &[VertexKey],
    targets: &[VertexKey],
    options: &MatchOptions,
) -> Result<Correspondence> {
    let mut result = Correspondence::default();
    let mut claimed: FxHashMap<VertexKey, VertexKey> = FxHashMap::default();

    for &s in sources {
        if result.index.contains_key(&s) {
            continue;
        }
        let t = nearest(arena, s, targets, options)?;
        if let Some(&previous) = claimed.get(&t) {
            return Err(conflict(arena, t, previous, s));
        }
        claimed.insert(t, s);
        result.pairs.push((s, t));
        result.index.insert(s, t);
    }
    Ok(result)
}

/// Builds the error for two sources claiming one target.
fn conflict(arena: &ModelArena, target: VertexKey, first: VertexKey, second: VertexKey) -> Error {
    CorrespondenceError::Conflict {
        target,
        sources: [first, second],
        target_name: arena.name_of(target.into()).to_string(),
        first_name: arena.name_of(first.into()).to_string(),
        second_name: arena.name_of(second.into()).to_string(),
    }
    .into()
}

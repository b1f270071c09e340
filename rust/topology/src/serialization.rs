// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON export of the live model.
//!
//! Export writers consume a read-only snapshot of the live entities in which
//! every reference is replaced by the referenced entity's name. Two
//! snapshots compare equal exactly when the live entities, their names and
//! their ordered adjacency lists are the same, which makes the snapshot the
//! natural fingerprint for comparing a model before and after a command.

use serde::{Deserialize, Serialize};

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;

/// Serializable view of every live entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub vertices: Vec<VertexSnapshot>,
    pub coedges: Vec<CoEdgeSnapshot>,
    pub cofaces: Vec<CoFaceSnapshot>,
    pub blocks: Vec<BlockSnapshot>,
    pub points: Vec<PointSnapshot>,
    pub curves: Vec<CurveSnapshot>,
    pub surfaces: Vec<SurfaceSnapshot>,
    pub volumes: Vec<VolumeSnapshot>,
    pub groups: Vec<GroupSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexSnapshot {
    pub name: String,
    pub coord: [f64; 3],
    pub coedges: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geom: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoEdgeSnapshot {
    pub name: String,
    pub vertices: [String; 2],
    pub cofaces: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geom: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoFaceSnapshot {
    pub name: String,
    pub coedges: Vec<String>,
    pub blocks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geom: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub name: String,
    pub cofaces: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geom: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSnapshot {
    pub name: String,
    pub coord: [f64; 3],
    pub curves: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSnapshot {
    pub name: String,
    pub points: Vec<String>,
    pub surfaces: Vec<String>,
    pub facets: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSnapshot {
    pub name: String,
    pub curves: Vec<String>,
    pub volumes: Vec<String>,
    pub facets: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeSnapshot {
    pub name: String,
    pub surfaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub name: String,
    pub dim: u8,
    /// Live members only.
    pub members: Vec<String>,
}

impl ModelArena {
    /// Serializes the live model to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        let snapshot = self.snapshot();
        serde_json::to_string_pretty(&snapshot).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Creates a name-based snapshot of the live model.
    pub fn snapshot(&self) -> ModelSnapshot {
        let names = |list: &[EntityKey]| -> Vec<String> {
            list.iter().map(|k| self.name_of(*k).to_string()).collect()
        };
        let name = |k: EntityKey| self.name_of(k).to_string();
        let geom = |g: Option<GeomKey>| g.map(|g| self.name_of(g.into()).to_string());

        ModelSnapshot {
            vertices: self
                .vertices()
                .map(|(k, v)| VertexSnapshot {
                    name: name(k.into()),
                    coord: [v.coord.x, v.coord.y, v.coord.z],
                    coedges: v.coedges.iter().map(|c| name((*c).into())).collect(),
                    geom: geom(v.geom),
                })
                .collect(),
            coedges: self
                .coedges()
                .map(|(k, c)| CoEdgeSnapshot {
                    name: name(k.into()),
                    vertices: [name(c.vertices[0].into()), name(c.vertices[1].into())],
                    cofaces: c.cofaces.iter().map(|f| name((*f).into())).collect(),
                    geom: geom(c.geom),
                })
                .collect(),
            cofaces: self
                .cofaces()
                .map(|(k, f)| CoFaceSnapshot {
                    name: name(k.into()),
                    coedges: f.coedges.iter().map(|c| name((*c).into())).collect(),
                    blocks: f.blocks.iter().map(|b| name((*b).into())).collect(),
                    geom: geom(f.geom),
                })
                .collect(),
            blocks: self
                .blocks()
                .map(|(k, b)| BlockSnapshot {
                    name: name(k.into()),
                    cofaces: b.cofaces.iter().map(|f| name((*f).into())).collect(),
                    geom: geom(b.geom),
                })
                .collect(),
            points: self
                .points()
                .map(|(k, p)| PointSnapshot {
                    name: name(k.into()),
                    coord: [p.coord.x, p.coord.y, p.coord.z],
                    curves: p.curves.iter().map(|c| name((*c).into())).collect(),
                })
                .collect(),
            curves: self
                .curves()
                .map(|(k, c)| CurveSnapshot {
                    name: name(k.into()),
                    points: c.points.iter().map(|p| name((*p).into())).collect(),
                    surfaces: c.surfaces.iter().map(|s| name((*s).into())).collect(),
                    facets: c.rep.points.len(),
                })
                .collect(),
            surfaces: self
                .surfaces()
                .map(|(k, s)| SurfaceSnapshot {
                    name: name(k.into()),
                    curves: s.curves.iter().map(|c| name((*c).into())).collect(),
                    volumes: s.volumes.iter().map(|v| name((*v).into())).collect(),
                    facets: s.rep.triangles.len(),
                })
                .collect(),
            volumes: self
                .volumes()
                .map(|(k, v)| VolumeSnapshot {
                    name: name(k.into()),
                    surfaces: v.surfaces.iter().map(|s| name((*s).into())).collect(),
                })
                .collect(),
            groups: self
                .groups()
                .map(|(k, g)| GroupSnapshot {
                    name: name(k.into()),
                    dim: g.dim,
                    members: names(
                        &g.members
                            .iter()
                            .copied()
                            .filter(|m| self.is_live(*m))
                            .collect::<Vec<_>>(),
                    ),
                })
                .collect(),
        }
    }
}

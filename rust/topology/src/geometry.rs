// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Faceted representations and simple metric queries on entities.
//!
//! Curves and surfaces carry a [`Representation`]: a polyline (curves) or a
//! triangle soup (surfaces). The entity graph never evaluates these itself;
//! projection and boolean work go through the engine's geometric kernel.

use nalgebra::Point3;

use crate::arena::ModelArena;
use crate::keys::*;

/// Faceted computational representation of a curve or surface.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Representation {
    pub points: Vec<Point3<f64>>,
    /// Triangles indexing into `points`. Empty for polylines.
    pub triangles: Vec<[u32; 3]>,
}

impl Representation {
    /// A polyline through the given points.
    pub fn polyline(points: Vec<Point3<f64>>) -> Self {
        Self {
            points,
            triangles: Vec::new(),
        }
    }

    /// A triangle soup.
    pub fn mesh(points: Vec<Point3<f64>>, triangles: Vec<[u32; 3]>) -> Self {
        Self { points, triangles }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_polyline(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Appends another representation, offsetting its triangle indices.
    pub fn append(&mut self, other: &Representation) {
        let offset = self.points.len() as u32;
        self.points.extend_from_slice(&other.points);
        self.triangles.extend(
            other
                .triangles
                .iter()
                .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );
    }
}

impl ModelArena {
    /// Returns the position of a vertex.
    pub fn vertex_point(&self, key: VertexKey) -> Option<Point3<f64>> {
        self.vertex(key).map(|v| v.coord)
    }

    /// Euclidean distance between two vertices.
    pub fn vertex_distance(&self, a: VertexKey, b: VertexKey) -> Option<f64> {
        Some(nalgebra::distance(&self.vertex_point(a)?, &self.vertex_point(b)?))
    }

    /// Euclidean length of a co-edge.
    pub fn coedge_length(&self, key: CoEdgeKey) -> Option<f64> {
        let [a, b] = self.coedge(key)?.vertices;
        self.vertex_distance(a, b)
    }

    /// Average of the boundary vertex positions of a co-face.
    pub fn coface_centroid(&self, key: CoFaceKey) -> Option<Point3<f64>> {
        let verts = self.coface_vertices(key)?;
        if verts.is_empty() {
            return None;
        }
        let mut sum = nalgebra::Vector3::zeros();
        for v in &verts {
            sum += self.vertex_point(*v)?.coords;
        }
        Some(Point3::from(sum / verts.len() as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChangeLedger;
    use approx::assert_relative_eq;

    #[test]
    fn append_offsets_triangles() {
        let mut a = Representation::mesh(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let b = a.clone();
        a.append(&b);
        assert_eq!(a.points.len(), 6);
        assert_eq!(a.triangles, vec![[0, 1, 2], [3, 4, 5]]);
        assert!(!a.is_polyline());
    }

    #[test]
    fn coedge_length_and_centroid() {
        let mut arena = ModelArena::new();
        let mut ledger = ChangeLedger::new(None);
        let v0 = arena.add_vertex(&mut ledger, Point3::new(0.0, 0.0, 0.0));
        let v1 = arena.add_vertex(&mut ledger, Point3::new(3.0, 0.0, 0.0));
        let v2 = arena.add_vertex(&mut ledger, Point3::new(3.0, 4.0, 0.0));
        let e0 = arena.add_coedge(&mut ledger, v0, v1).unwrap();
        let e1 = arena.add_coedge(&mut ledger, v1, v2).unwrap();
        let e2 = arena.add_coedge(&mut ledger, v2, v0).unwrap();
        let face = arena.add_coface(&mut ledger, &[e0, e1, e2]).unwrap();

        assert_relative_eq!(arena.coedge_length(e0).unwrap(), 3.0);
        assert_relative_eq!(arena.coedge_length(e2).unwrap(), 5.0);
        let c = arena.coface_centroid(face).unwrap();
        assert_relative_eq!(c.x, 2.0);
        assert_relative_eq!(c.y, 4.0 / 3.0);
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric kernel capability.
//!
//! Commands never evaluate geometry themselves. Projection of a point onto a
//! curve or surface, curve parameters, facets, copies and unions of
//! representations are delegated to a [`GeometricKernel`]. The
//! default [`FacetedKernel`] works directly on the polylines and triangle
//! soups stored in the model.

use mgx_topology::{Point3, Representation};
use nalgebra::Vector3;
use thiserror::Error;

/// Failure inside the geometric kernel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("representation has no points")]
    EmptyRepresentation,

    /// A triangle indexes a point the representation does not have.
    #[error("facet {0} references a missing point")]
    BadFacet(usize),

    #[error("nothing to unite")]
    EmptyUnion,

    #[error("representation is not a curve")]
    NotACurve,

    #[error("representation is not a surface")]
    NotASurface,
}

/// Geometric operations commands rely on.
pub trait GeometricKernel: Send + Sync + std::fmt::Debug {
    /// Closest point of `rep` to `point`.
    fn project(&self, point: &Point3<f64>, rep: &Representation) -> Result<Point3<f64>, KernelError>;

    /// An independent copy of a representation.
    fn clone_representation(&self, rep: &Representation) -> Result<Representation, KernelError>;

    /// A single representation covering all of `reps`.
    fn union(&self, reps: &[Representation]) -> Result<Representation, KernelError>;

    /// Parameter in `[0, 1]` of the point of curve `rep` closest to `point`.
    fn parameter(&self, point: &Point3<f64>, rep: &Representation) -> Result<f64, KernelError>;

    /// Point of curve `rep` at parameter `t`, clamped to `[0, 1]`.
    fn point_at(&self, rep: &Representation, t: f64) -> Result<Point3<f64>, KernelError>;

    /// Facets of surface `rep` as corner triples.
    fn triangulation(&self, rep: &Representation) -> Result<Vec<[Point3<f64>; 3]>, KernelError>;
}

/// Kernel working on faceted representations.
#[derive(Debug, Default, Clone, Copy)]
pub struct FacetedKernel;

impl FacetedKernel {
    fn check(rep: &Representation) -> Result<(), KernelError> {
        let n = rep.points.len();
        match rep
            .triangles
            .iter()
            .position(|t| t.iter().any(|i| *i as usize >= n))
        {
            Some(i) => Err(KernelError::BadFacet(i)),
            None => Ok(()),
        }
    }

    /// Points of a polyline with the cumulative length at each of them.
    fn arc_lengths(rep: &Representation) -> Result<(&[Point3<f64>], Vec<f64>), KernelError> {
        if !rep.is_polyline() {
            return Err(KernelError::NotACurve);
        }
        if rep.points.is_empty() {
            return Err(KernelError::EmptyRepresentation);
        }
        let mut lengths = Vec::with_capacity(rep.points.len());
        let mut total = 0.0;
        lengths.push(total);
        for w in rep.points.windows(2) {
            total += nalgebra::distance(&w[0], &w[1]);
            lengths.push(total);
        }
        Ok((&rep.points, lengths))
    }
}

impl GeometricKernel for FacetedKernel {
    fn project(&self, point: &Point3<f64>, rep: &Representation) -> Result<Point3<f64>, KernelError> {
        Self::check(rep)?;
        let candidates: Vec<Point3<f64>> = if rep.is_polyline() {
            match rep.points.as_slice() {
                [] => return Err(KernelError::EmptyRepresentation),
                [single] => vec![*single],
                pts => pts
                    .windows(2)
                    .map(|w| closest_on_segment(point, &w[0], &w[1]))
                    .collect(),
            }
        } else {
            rep.triangles
                .iter()
                .map(|t| {
                    let [a, b, c] = (*t).map(|i| rep.points[i as usize]);
                    closest_on_triangle(point, &a, &b, &c)
                })
                .collect()
        };

        candidates
            .into_iter()
            .min_by(|a, b| {
                nalgebra::distance_squared(point, a).total_cmp(&nalgebra::distance_squared(point, b))
            })
            .ok_or(KernelError::EmptyRepresentation)
    }

    fn clone_representation(&self, rep: &Representation) -> Result<Representation, KernelError> {
        Self::check(rep)?;
        Ok(rep.clone())
    }

    fn union(&self, reps: &[Representation]) -> Result<Representation, KernelError> {
        if reps.is_empty() {
            return Err(KernelError::EmptyUnion);
        }
        let mut result = Representation::default();
        for rep in reps {
            Self::check(rep)?;
            result.append(rep);
        }
        Ok(result)
    }

    fn parameter(&self, point: &Point3<f64>, rep: &Representation) -> Result<f64, KernelError> {
        let (points, lengths) = Self::arc_lengths(rep)?;
        let total = lengths.last().copied().unwrap_or(0.0);
        if points.len() < 2 || total <= f64::EPSILON {
            return Ok(0.0);
        }
        let mut best = (f64::INFINITY, 0.0);
        for (i, w) in points.windows(2).enumerate() {
            let q = closest_on_segment(point, &w[0], &w[1]);
            let d = nalgebra::distance_squared(point, &q);
            if d < best.0 {
                best = (d, lengths[i] + nalgebra::distance(&w[0], &q));
            }
        }
        Ok(best.1 / total)
    }

    fn point_at(&self, rep: &Representation, t: f64) -> Result<Point3<f64>, KernelError> {
        let (points, lengths) = Self::arc_lengths(rep)?;
        let total = lengths.last().copied().unwrap_or(0.0);
        let target = t.clamp(0.0, 1.0) * total;
        for (i, w) in points.windows(2).enumerate() {
            let span = lengths[i + 1] - lengths[i];
            if target <= lengths[i + 1] && span > f64::EPSILON {
                return Ok(w[0] + (w[1] - w[0]) * ((target - lengths[i]) / span));
            }
        }
        points.last().copied().ok_or(KernelError::EmptyRepresentation)
    }

    fn triangulation(&self, rep: &Representation) -> Result<Vec<[Point3<f64>; 3]>, KernelError> {
        if rep.is_polyline() {
            return Err(KernelError::NotASurface);
        }
        Self::check(rep)?;
        Ok(rep
            .triangles
            .iter()
            .map(|t| (*t).map(|i| rep.points[i as usize]))
            .collect())
    }
}

fn closest_on_segment(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> Point3<f64> {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= f64::EPSILON {
        return *a;
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest point on a triangle, by Voronoi region of the query point.
fn closest_on_triangle(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Point3<f64> {
    let ab: Vector3<f64> = b - a;
    let ac: Vector3<f64> = c - a;

    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let sum = va + vb + vc;
    if sum.abs() <= f64::EPSILON {
        // Degenerate triangle: fall back to its edges.
        return [
            closest_on_segment(p, a, b),
            closest_on_segment(p, b, c),
            closest_on_segment(p, c, a),
        ]
        .into_iter()
        .min_by(|x, y| nalgebra::distance_squared(p, x).total_cmp(&nalgebra::distance_squared(p, y)))
        .unwrap_or(*a);
    }
    a + ab * (vb / sum) + ac * (vc / sum)
}

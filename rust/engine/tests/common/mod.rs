// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use mgx_engine::{EngineConfig, Session};
use mgx_topology::construction::make_quad;
use mgx_topology::{
    ChangeLedger, CoFaceKey, CurveKey, ModelArena, Point3, PointKey, Representation, SurfaceKey,
    VertexKey,
};
use tracing_subscriber::EnvFilter;

/// Routes engine logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

pub fn session() -> Session {
    init_tracing();
    Session::new(EngineConfig::new())
}

/// Unit quad with its lower-left corner at `(x, 0, z)`.
pub fn quad_at(
    arena: &mut ModelArena,
    ledger: &mut ChangeLedger,
    x: f64,
    z: f64,
) -> mgx_topology::Result<CoFaceKey> {
    let corners: [VertexKey; 4] = [
        arena.add_vertex(ledger, Point3::new(x, 0.0, z)),
        arena.add_vertex(ledger, Point3::new(x + 1.0, 0.0, z)),
        arena.add_vertex(ledger, Point3::new(x + 1.0, 1.0, z)),
        arena.add_vertex(ledger, Point3::new(x, 1.0, z)),
    ];
    Ok(make_quad(arena, ledger, corners)?.0)
}

/// Straight curve between two points.
pub fn line(
    arena: &mut ModelArena,
    ledger: &mut ChangeLedger,
    a: PointKey,
    b: PointKey,
) -> mgx_topology::Result<CurveKey> {
    let ends = [a, b].map(|p| arena.point(p).map(|p| p.coord).unwrap_or_else(Point3::origin));
    arena.add_curve(ledger, &[a, b], Representation::polyline(ends.to_vec()))
}

/// Two-triangle mesh of the unit square at `x`.
pub fn square_rep(x: f64) -> Representation {
    Representation::mesh(
        vec![
            Point3::new(x, 0.0, 0.0),
            Point3::new(x + 1.0, 0.0, 0.0),
            Point3::new(x + 1.0, 1.0, 0.0),
            Point3::new(x, 1.0, 0.0),
        ],
        vec![[0, 1, 2], [0, 2, 3]],
    )
}

/// Three unit squares in a row, all bounding the same two volumes.
pub struct Strip {
    pub surfaces: [SurfaceKey; 3],
    /// Vertical curves at x = 0, 1, 2, 3.
    pub verticals: [CurveKey; 4],
    pub bottoms: [CurveKey; 3],
    pub tops: [CurveKey; 3],
}

pub fn strip(session: &mut Session) -> Strip {
    session
        .build("strip", |arena, ledger| {
            let low: Vec<PointKey> = (0..4)
                .map(|i| arena.add_point(ledger, Point3::new(i as f64, 0.0, 0.0)))
                .collect();
            let high: Vec<PointKey> = (0..4)
                .map(|i| arena.add_point(ledger, Point3::new(i as f64, 1.0, 0.0)))
                .collect();
            let mut verticals = Vec::new();
            for i in 0..4 {
                verticals.push(line(arena, ledger, low[i], high[i])?);
            }
            let mut bottoms = Vec::new();
            let mut tops = Vec::new();
            for i in 0..3 {
                bottoms.push(line(arena, ledger, low[i], low[i + 1])?);
                tops.push(line(arena, ledger, high[i], high[i + 1])?);
            }
            let mut surfaces = Vec::new();
            for i in 0..3 {
                surfaces.push(arena.add_surface(
                    ledger,
                    &[bottoms[i], verticals[i + 1], tops[i], verticals[i]],
                    square_rep(i as f64),
                )?);
            }
            arena.add_volume(ledger, &surfaces)?;
            arena.add_volume(ledger, &surfaces)?;
            Ok(Strip {
                surfaces: [surfaces[0], surfaces[1], surfaces[2]],
                verticals: [verticals[0], verticals[1], verticals[2], verticals[3]],
                bottoms: [bottoms[0], bottoms[1], bottoms[2]],
                tops: [tops[0], tops[1], tops[2]],
            })
        })
        .expect("strip fixture")
}

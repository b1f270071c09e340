// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests of the correspondence solver and the change ledger.

use proptest::prelude::*;

use mgx_topology::construction::make_quad;
use mgx_topology::correspondence::solve;
use mgx_topology::{ChangeLedger, EntityType, MatchOptions, ModelArena, Point3, VertexKey};
use rustc_hash::FxHashSet;

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_coord() -> impl Strategy<Value = [f64; 3]> {
    [-10.0f64..10.0, -10.0f64..10.0, -10.0f64..10.0]
}

/// Source and target coordinate sets, never more sources than targets.
fn arb_sets() -> impl Strategy<Value = (Vec<[f64; 3]>, Vec<[f64; 3]>)> {
    (1usize..8).prop_flat_map(|n| {
        (
            proptest::collection::vec(arb_coord(), n),
            proptest::collection::vec(arb_coord(), n..n + 5),
        )
    })
}

fn add_vertices(arena: &mut ModelArena, ledger: &mut ChangeLedger, coords: &[[f64; 3]]) -> Vec<VertexKey> {
    coords
        .iter()
        .map(|c| arena.add_vertex(ledger, Point3::new(c[0], c[1], c[2])))
        .collect()
}

// ---------------------------------------------------------------------------
// 1. The solver returns a total injective map or nothing
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn solver_is_total_and_injective((sources, targets) in arb_sets()) {
        let mut arena = ModelArena::new();
        let mut ledger = ChangeLedger::new(None);
        let s = add_vertices(&mut arena, &mut ledger, &sources);
        let t = add_vertices(&mut arena, &mut ledger, &targets);

        if let Ok(map) = solve(&arena, &s, &t, &MatchOptions::default()) {
            prop_assert_eq!(map.len(), s.len());
            let mut hit = FxHashSet::default();
            for &source in &s {
                let target = map.get(source);
                prop_assert!(target.is_some(), "source left unmatched");
                let target = target.unwrap();
                prop_assert!(t.contains(&target));
                prop_assert!(hit.insert(target), "target claimed twice");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 2. Every match is a nearest target
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn solver_matches_are_nearest((sources, targets) in arb_sets()) {
        let mut arena = ModelArena::new();
        let mut ledger = ChangeLedger::new(None);
        let s = add_vertices(&mut arena, &mut ledger, &sources);
        let t = add_vertices(&mut arena, &mut ledger, &targets);

        if let Ok(map) = solve(&arena, &s, &t, &MatchOptions::default()) {
            for &(source, target) in map.pairs() {
                let origin = arena.vertex(source).unwrap().coord;
                let best = nalgebra::distance(&origin, &arena.vertex(target).unwrap().coord);
                for &other in &t {
                    let d = nalgebra::distance(&origin, &arena.vertex(other).unwrap().coord);
                    prop_assert!(best <= d, "matched at {} but {} is closer", best, d);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 3. Rollback restores the model exactly
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn rollback_restores_snapshot(
        base in proptest::collection::vec(arb_coord(), 4..8),
        extra in proptest::collection::vec(arb_coord(), 4..8),
    ) {
        let mut arena = ModelArena::new();
        let mut setup = ChangeLedger::new(None);
        let existing = add_vertices(&mut arena, &mut setup, &base);
        let before = arena.snapshot();
        let names = arena.names().internal_stats();

        let mut ledger = ChangeLedger::new(None);
        let fresh = add_vertices(&mut arena, &mut ledger, &extra);
        make_quad(&mut arena, &mut ledger, [existing[0], existing[1], existing[2], existing[3]]).unwrap();
        make_quad(&mut arena, &mut ledger, [fresh[0], fresh[1], fresh[2], fresh[3]]).unwrap();
        arena.merge_vertices(&mut ledger, existing[0], fresh[0]).unwrap();

        ledger.rollback(&mut arena).unwrap();
        arena.names_mut().set_internal_stats(names);
        prop_assert_eq!(&arena.snapshot(), &before);
        prop_assert_eq!(arena.live_count(EntityType::CoEdge), 0);
        prop_assert!(arena.validate().is_ok());
    }
}

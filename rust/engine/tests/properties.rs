// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests of the fusion commands.

mod common;

use proptest::prelude::*;

use mgx_engine::{CommandStatus, Session};
use mgx_topology::{ChangeKind, CoFaceKey, EntityType};

use common::{quad_at, session};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// Row length, the quads to fuse, and the order of their counterparts.
fn arb_face_selection() -> impl Strategy<Value = (usize, Vec<usize>, Vec<usize>)> {
    (1usize..7).prop_flat_map(|n| {
        proptest::sample::subsequence((0..n).collect::<Vec<_>>(), 1..=n).prop_flat_map(move |picked| {
            let order = Just(picked.clone()).prop_shuffle();
            (Just(n), Just(picked), order)
        })
    })
}

/// Gap between the two rows, well below the quad spacing.
fn arb_gap() -> impl Strategy<Value = f64> {
    1e-6f64..0.1
}

/// Two rows of `n` unit quads, the upper one `gap` above the lower one.
fn two_rows(session: &mut Session, n: usize, gap: f64) -> (Vec<CoFaceKey>, Vec<CoFaceKey>) {
    session
        .build("rows", move |arena, ledger| {
            let mut lower = Vec::with_capacity(n);
            let mut upper = Vec::with_capacity(n);
            for i in 0..n {
                lower.push(quad_at(arena, ledger, 2.0 * i as f64, 0.0)?);
            }
            for i in 0..n {
                upper.push(quad_at(arena, ledger, 2.0 * i as f64, gap)?);
            }
            Ok((lower, upper))
        })
        .expect("rows fixture")
}

// ---------------------------------------------------------------------------
// 1. Face fusion keeps the graph consistent and is exactly reversible
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn face_fusion_preserves_invariants(
        (n, picked, order) in arb_face_selection(),
        gap in arb_gap(),
    ) {
        let mut session = session();
        let (lower, upper) = two_rows(&mut session, n, gap);
        let first: Vec<CoFaceKey> = picked.iter().map(|&i| lower[i]).collect();
        let second: Vec<CoFaceKey> = order.iter().map(|&i| upper[i]).collect();
        let k = picked.len();

        let before = session.arena().snapshot();
        let faces_before = session.arena().live_count(EntityType::CoFace);

        let command = session.fuse2_face_list(first, second).unwrap();
        prop_assert_eq!(command.status(), CommandStatus::Done);
        let replaced = command
            .ledger()
            .count(EntityType::CoFace, |c| matches!(c, ChangeKind::Replaced { .. }));
        prop_assert_eq!(replaced, k);

        prop_assert!(session.arena().validate().is_ok());
        prop_assert_eq!(session.arena().live_count(EntityType::CoFace), faces_before - k);
        for &i in &picked {
            prop_assert_eq!(session.arena().resolve(upper[i].into()), lower[i].into());
        }
        let after = session.arena().snapshot();

        session.undo().unwrap();
        prop_assert_eq!(&session.arena().snapshot(), &before);
        session.redo().unwrap();
        prop_assert_eq!(&session.arena().snapshot(), &after);
    }
}

// ---------------------------------------------------------------------------
// 2. Repeated undo/redo is idempotent
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn undo_redo_cycles_are_stable(n in 1usize..5, cycles in 1usize..4) {
        let mut session = session();
        let (lower, upper) = two_rows(&mut session, n, 1e-3);
        let before = session.arena().snapshot();
        session.fuse2_face_list(lower, upper).unwrap();
        let after = session.arena().snapshot();

        for _ in 0..cycles {
            session.undo().unwrap();
            prop_assert_eq!(&session.arena().snapshot(), &before);
            session.redo().unwrap();
            prop_assert_eq!(&session.arena().snapshot(), &after);
        }
        prop_assert!(session.arena().validate().is_ok());
    }
}

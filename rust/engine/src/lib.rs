// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # MGX Engine
//!
//! Transactional commands over an [`mgx_topology`] model.
//!
//! Every change to the model is made by a [`Command`] executing an
//! [`Operation`] against a [`Context`]. The command owns the change ledger
//! the operation records into, which gives it:
//!
//! - **Atomicity**: a failing operation is rolled back, model and name
//!   allocator alike.
//! - **Undo/redo**: committed commands are swapped back and forth through
//!   their ledgers, under the control of a [`CommandManager`].
//! - **Refresh**: groups and display state are reconciled from the ledger
//!   after each transition.
//!
//! The [`fusion`] module holds the gluing commands (edge, face and vertex
//! fusion, block gluing, curve and surface join). [`Session`] bundles a context with its history and
//! exposes them as plain method calls.
//!
//! ```
//! use mgx_engine::{EngineConfig, Session};
//! use mgx_topology::Point3;
//!
//! let mut session = Session::new(EngineConfig::new());
//! let (e1, e2) = session
//!     .build("edges", |arena, ledger| {
//!         let a = arena.add_vertex(ledger, Point3::new(0.0, 0.0, 0.0));
//!         let b = arena.add_vertex(ledger, Point3::new(1.0, 0.0, 0.0));
//!         let c = arena.add_vertex(ledger, Point3::new(0.0, 0.0, 1e-3));
//!         let d = arena.add_vertex(ledger, Point3::new(1.0, 0.0, 1e-3));
//!         Ok((arena.add_coedge(ledger, a, b)?, arena.add_coedge(ledger, c, d)?))
//!     })
//!     .unwrap();
//!
//! session.fuse2_edges(e1, e2).unwrap();
//! assert_eq!(session.arena().resolve(e2.into()), e1.into());
//!
//! session.undo().unwrap();
//! assert!(session.arena().is_live(e2.into()));
//! ```

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod fusion;
pub mod groups;
pub mod kernel;
pub mod manager;
pub mod session;

pub use command::{CancelHandle, Command, CommandStatus, ExecutionScope, Operation};
pub use config::EngineConfig;
pub use context::{Context, DisplayState};
pub use error::{CommandError, Result};
pub use fusion::{
    Fuse2EdgeList, Fuse2Edges, Fuse2FaceList, Fuse2Faces, Fuse2Vertices, Glue2Topo, JoinCurves, JoinSurfaces,
};
pub use groups::{update_deleted_groups, update_display_properties, GroupChanges};
pub use kernel::{FacetedKernel, GeometricKernel, KernelError};
pub use manager::CommandManager;
pub use session::{Construct, Session};

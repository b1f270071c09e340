// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine configuration loaded from environment variables.

use mgx_topology::MatchOptions;

/// Engine configuration, passed to every command through the [`Context`].
///
/// [`Context`]: crate::Context
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum distance between two vertices matched by a fusion.
    /// `None` accepts any distance.
    pub fuse_tolerance: Option<f64>,
    /// Two candidate vertices whose distances differ by at most this much
    /// are a tie.
    pub tie_epsilon: f64,
    /// Largest per-coordinate offset between two vertices glued by
    /// `Glue2Topo`.
    pub glue_epsilon: f64,
    /// Maintain the display state of entities after every command.
    pub graphical: bool,
    /// Validate the entity graph after every successful execute.
    pub check_invariants: bool,
    /// Number of committed commands kept for undo.
    pub history_limit: usize,
}

impl EngineConfig {
    /// Built-in defaults, ignoring the environment.
    pub fn new() -> Self {
        Self {
            fuse_tolerance: None,
            tie_epsilon: 1e-10,
            glue_epsilon: 1e-6,
            graphical: false,
            check_invariants: true,
            history_limit: 100,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::new();
        Self {
            fuse_tolerance: std::env::var("MGX_FUSE_TOLERANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|t: &f64| *t >= 0.0),
            tie_epsilon: std::env::var("MGX_TIE_EPSILON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.tie_epsilon),
            glue_epsilon: std::env::var("MGX_GLUE_EPSILON")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|e: &f64| *e >= 0.0)
                .unwrap_or(defaults.glue_epsilon),
            graphical: env_flag("MGX_GRAPHICAL").unwrap_or(defaults.graphical),
            check_invariants: env_flag("MGX_CHECK_INVARIANTS").unwrap_or(defaults.check_invariants),
            history_limit: std::env::var("MGX_HISTORY_LIMIT")
                .unwrap_or_else(|_| "100".into())
                .parse()
                .unwrap_or(defaults.history_limit),
        }
    }

    /// Options of the nearest-vertex search used by fusions.
    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            tie_epsilon: self.tie_epsilon,
            max_distance: self.fuse_tolerance,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_flag(name: &str) -> Option<bool> {
    match std::env::var(name).ok()?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command error types.

use mgx_topology::CorrespondenceError;
use thiserror::Error;

use crate::kernel::KernelError;

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Errors a command can fail with.
///
/// The `Display` text of the error is the message stored on a failed
/// command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Bad input detected before the model is touched.
    #[error("{0}")]
    Validation(String),

    /// The nearest-vertex matching could not produce a bijection.
    #[error(transparent)]
    Correspondence(CorrespondenceError),

    /// No entity of the second list is bounded by the mirrored vertices.
    #[error("no counterpart found for {0}")]
    NoCounterpart(String),

    /// The entity graph rejected a mutation.
    #[error(transparent)]
    Topology(mgx_topology::Error),

    /// The geometric kernel failed. Its own diagnostic is kept as the source
    /// but never shown.
    #[error("geometric kernel failure")]
    Kernel(#[source] KernelError),

    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The command is already executing, undoing or redoing.
    #[error("command {0} is busy")]
    Busy(String),

    #[error("command canceled")]
    Canceled,

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,
}

impl CommandError {
    pub fn validation(message: impl Into<String>) -> Self {
        CommandError::Validation(message.into())
    }
}

impl From<mgx_topology::Error> for CommandError {
    fn from(err: mgx_topology::Error) -> Self {
        match err {
            mgx_topology::Error::Correspondence(c) => CommandError::Correspondence(c),
            other => CommandError::Topology(other),
        }
    }
}

impl From<KernelError> for CommandError {
    fn from(err: KernelError) -> Self {
        CommandError::Kernel(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_errors_hide_their_diagnostic() {
        let err = CommandError::from(KernelError::BadFacet(3));
        assert_eq!(err.to_string(), "geometric kernel failure");
    }

    #[test]
    fn correspondence_errors_are_lifted() {
        let err = CommandError::from(mgx_topology::Error::Correspondence(
            CorrespondenceError::NoCandidate {
                vertex: Default::default(),
                source_name: "Som4".into(),
            },
        ));
        assert!(matches!(err, CommandError::Correspondence(_)));
        assert_eq!(err.to_string(), "no matching vertex for Som4");
    }
}

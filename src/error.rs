//! Error types shared by the program model, the editor operations and the
//! execution engine.

use std::time::Duration;

use thiserror::Error;

use crate::block_types::BlockKind;
use crate::model::BlockId;

/// Edit-time errors. An edit that fails with one of these leaves the program
/// untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("invalid parameter {slot} of {kind:?}: {reason}")]
    InvalidParameter {
        kind: BlockKind,
        slot: usize,
        reason: String,
    },

    #[error("illegal structural edit: {0}")]
    IllegalStructuralEdit(String),

    #[error("no block with id {0}")]
    UnknownBlock(BlockId),

    #[error("unknown block kind: {0}")]
    UnknownKind(String),
}

impl EditError {
    pub(crate) fn invalid(kind: BlockKind, slot: usize, reason: impl Into<String>) -> Self {
        EditError::InvalidParameter {
            kind,
            slot,
            reason: reason.into(),
        }
    }

    pub(crate) fn illegal(reason: impl Into<String>) -> Self {
        EditError::IllegalStructuralEdit(reason.into())
    }
}

/// Failure reported by a motor or sensor collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    /// No sample / not delivered this time; the engine retries on a later tick.
    #[error("transient link failure: {0}")]
    Transient(String),

    /// The link is gone (e.g. the robot disconnected).
    #[error("link failure: {0}")]
    Fatal(String),

    /// The collaborator did not answer within the bounded timeout.
    #[error("link did not respond within {0:?}")]
    Timeout(Duration),
}

impl LinkError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, LinkError::Transient(_))
    }
}

/// Reason a run ended in the failed state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunFailure {
    #[error("collaborator failure: {0}")]
    CollaboratorFatal(String),
}

impl From<LinkError> for RunFailure {
    fn from(err: LinkError) -> Self {
        RunFailure::CollaboratorFatal(err.to_string())
    }
}

/// Errors starting a run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("a program is already running")]
    AlreadyRunning,

    #[error("failed to spawn the run thread")]
    Spawn(#[from] std::io::Error),
}

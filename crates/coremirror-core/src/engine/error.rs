use super::adapter::AdapterError;
use crate::core::interactions::error::DefinitionError;
use crate::core::models::structure::StructureError;
use std::fmt;
use thiserror::Error;

/// A step of a synchronization round, in the order a full initialization runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStep {
    PushAtoms,
    PushCoordinates,
    PushCharges,
    PushCell,
    PushInteractionTables,
    BuildLookupTables,
    BuildNeighborLists,
    PushNeighborLists,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SyncStep::PushAtoms => "push atoms",
            SyncStep::PushCoordinates => "push coordinates",
            SyncStep::PushCharges => "push charges",
            SyncStep::PushCell => "push the cell",
            SyncStep::PushInteractionTables => "push interaction tables",
            SyncStep::BuildLookupTables => "build interaction lookup tables",
            SyncStep::BuildNeighborLists => "build neighbor lists",
            SyncStep::PushNeighborLists => "push neighbor lists",
        };
        f.write_str(text)
    }
}

/// Coarse classification of [`SyncError`]s for callers that only care about
/// how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Sequencing,
    ResourceConflict,
    Engine,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid interaction definition: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Invalid structure: {0}")]
    Structure(#[from] StructureError),

    #[error("No structure has been assigned to the controller")]
    MissingStructure,

    #[error("Definition #{index} does not exist or has no coordinator")]
    UnknownGroup { index: usize },

    #[error("The cell is singular but periodic along {periodic:?}")]
    DegenerateCell { periodic: [bool; 3] },

    #[error("Cannot {step} before the engine has {requires}")]
    Sequencing {
        step: SyncStep,
        requires: &'static str,
    },

    #[error("Cannot {step}: the engine has no {missing}")]
    MissingDependency {
        step: SyncStep,
        missing: &'static str,
    },

    #[error(
        "Engine holds {engine_atoms} atoms but this controller last synchronized {expected_atoms}; \
         another client appears to have taken over the engine"
    )]
    ResourceConflict {
        expected_atoms: usize,
        engine_atoms: usize,
    },

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl SyncError {
    pub fn kind(&self) -> ErrorClass {
        match self {
            SyncError::Definition(_)
            | SyncError::Structure(_)
            | SyncError::MissingStructure
            | SyncError::UnknownGroup { .. }
            | SyncError::DegenerateCell { .. } => ErrorClass::Validation,
            SyncError::Sequencing { .. } | SyncError::MissingDependency { .. } => {
                ErrorClass::Sequencing
            }
            SyncError::ResourceConflict { .. } => ErrorClass::ResourceConflict,
            SyncError::Adapter(_) | SyncError::Internal(_) => ErrorClass::Engine,
        }
    }
}

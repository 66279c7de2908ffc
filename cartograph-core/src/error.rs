//! Error types for catalog operations

use crate::{EntityRef, Kind};
use std::fmt;
use thiserror::Error;

/// Segment of an entity reference that failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefSegment {
    Kind,
    Namespace,
    Name,
}

impl fmt::Display for RefSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            RefSegment::Kind => "kind",
            RefSegment::Namespace => "namespace",
            RefSegment::Name => "name",
        };
        write!(f, "{}", value)
    }
}

/// Entity reference parse errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityRefError {
    #[error("Empty {segment} in entity reference {input:?}")]
    EmptySegment { segment: RefSegment, input: String },
}

/// Step of a storage operation, used to say where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageStep {
    Open,
    Schema,
    Begin,
    BaseRow,
    SpecRow,
    Labels,
    Annotations,
    Links,
    Listing,
    Commit,
}

impl fmt::Display for StorageStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            StorageStep::Open => "open",
            StorageStep::Schema => "schema",
            StorageStep::Begin => "begin",
            StorageStep::BaseRow => "base row",
            StorageStep::SpecRow => "spec row",
            StorageStep::Labels => "labels",
            StorageStep::Annotations => "annotations",
            StorageStep::Links => "links",
            StorageStep::Listing => "listing",
            StorageStep::Commit => "commit",
        };
        write!(f, "{}", value)
    }
}

/// Storage layer errors.
///
/// Engine errors never cross this boundary as values; they are rendered into
/// `reason` so callers depend only on this crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{operation} failed at {step}: {reason}")]
    StepFailed {
        operation: String,
        step: StorageStep,
        reason: String,
    },

    #[error("rollback failed ({rollback}): original error ({original})")]
    RollbackFailed {
        rollback: String,
        original: Box<CatalogError>,
    },

    #[error("Inconsistent state for {entity_ref}: no row in {table}")]
    InconsistentState {
        entity_ref: EntityRef,
        table: &'static str,
    },

    #[error("Unsupported schema version {found}, this build supports up to {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    /// Build a `StepFailed` from any displayable engine error.
    pub fn step(operation: impl Into<String>, step: StorageStep, reason: impl fmt::Display) -> Self {
        StorageError::StepFailed {
            operation: operation.into(),
            step,
            reason: reason.to_string(),
        }
    }
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid entity reference: {0}")]
    InvalidReference(#[from] EntityRefError),

    #[error("Found non-string value in column {column}")]
    NonTextColumn { column: String },

    #[error("Entity reference {reference:?} contains a space and cannot be stored in a reference list")]
    ReferenceContainsSpace { reference: String },

    #[error("Tag {tag:?} contains ',' which is the tag delimiter")]
    TagContainsDelimiter { tag: String },

    #[error("Empty tag")]
    EmptyTag,

    #[error("Duplicate link url: {url}")]
    DuplicateLinkUrl { url: String },

    #[error("Unknown column {column}")]
    UnknownColumn { column: String },

    #[error("Kind mismatch: expected {expected}, got {actual}")]
    KindMismatch { expected: Kind, actual: Kind },

    #[error("Unsupported kind: {kind}")]
    UnsupportedKind { kind: String },

    #[error("Unsupported filter key: {key}")]
    UnsupportedFilterKey { key: String },

    #[error("Unsupported order by field: {field}")]
    UnsupportedOrderBy { field: String },

    #[error("Entity reference mismatch: expected {expected}, got {actual}")]
    ReferenceMismatch {
        expected: EntityRef,
        actual: EntityRef,
    },
}

/// Master error type for catalog operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Entity not found: {entity_ref}")]
    NotFound { entity_ref: EntityRef },

    #[error("Entity already exists: {entity_ref}")]
    Conflict { entity_ref: EntityRef },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<EntityRefError> for CatalogError {
    fn from(err: EntityRefError) -> Self {
        CatalogError::Validation(ValidationError::InvalidReference(err))
    }
}

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

// =============================================================================
// TESTS
// =============================================================================

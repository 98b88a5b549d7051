//! Error types for seedcheck operations

use crate::value::{FieldType, FieldValue};
use thiserror::Error;

/// Field selector resolution errors.
///
/// Every variant is a test-author mistake and is raised when the selector
/// is registered, never while rows are being processed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("Selector '{member}' on {entity} refers to a computed member, not a property")]
    TargetsMethod { entity: &'static str, member: String },

    #[error("Selector '{member}' on {entity} refers to a member with no backing property")]
    NotAProperty { entity: &'static str, member: String },

    #[error("Selector '{member}' is not declared on {entity}")]
    ForeignMember { entity: &'static str, member: String },
}

/// A value could not be converted to a field's declared type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Cannot convert '{value}' to {target}: {reason}")]
pub struct CoercionError {
    pub value: String,
    pub target: FieldType,
    pub reason: String,
}

impl CoercionError {
    pub fn new(value: impl Into<String>, target: FieldType, reason: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            target,
            reason: reason.into(),
        }
    }
}

/// Predicate construction errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PredicateError {
    #[error("Cannot build a predicate over {entity} from zero fields")]
    Empty { entity: &'static str },

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("Lookup value for field {field} is invalid: {source}")]
    Coercion {
        field: String,
        #[source]
        source: CoercionError,
    },
}

/// Pipe-table parsing errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("Table has no header line")]
    MissingHeader,

    #[error("Header column {column} is empty")]
    EmptyHeader { column: usize },

    #[error("Header '{header}' appears more than once")]
    DuplicateHeader { header: String },

    #[error("Line {line} has {found} cells, header has {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line} is not a pipe-delimited table row")]
    Malformed { line: usize },
}

/// Row-to-entity materialization errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MaterializeError {
    #[error("Column '{column}' does not match any property of {entity}")]
    UnknownColumn { entity: &'static str, column: String },

    #[error("Column '{column}' maps to a read-only member of {entity}")]
    ReadOnlyColumn { entity: &'static str, column: String },

    #[error("Column '{column}' matches more than one member of {entity}: {candidates:?}")]
    AmbiguousColumn {
        entity: &'static str,
        column: String,
        candidates: Vec<&'static str>,
    },

    #[error("Columns '{first}' and '{second}' both map to {entity}.{field}")]
    DuplicateColumn {
        entity: &'static str,
        field: &'static str,
        first: String,
        second: String,
    },

    #[error("Row {row}, column '{column}': {source}")]
    InvalidCell {
        row: usize,
        column: String,
        #[source]
        source: CoercionError,
    },
}

/// Store collaborator errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Add failed for {entity}: {reason}")]
    AddFailed { entity: &'static str, reason: String },

    #[error("Commit failed: {reason}")]
    CommitFailed { reason: String },

    #[error("Lookup on {entity} matched {matches} entities, expected at most one")]
    AmbiguousMatch { entity: &'static str, matches: usize },

    #[error("Stored record for {entity} is unreadable: {source}")]
    CorruptRecord {
        entity: &'static str,
        #[source]
        source: CoercionError,
    },

    #[error("Snapshot serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Configuration errors raised while building a seeder or verifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid field selector: {0}")]
    InvalidField(#[from] FieldError),

    #[error("Verifier for {entity} needs at least one lookup field")]
    EmptyLookupFields { entity: &'static str },

    #[error("Override value for {field} is invalid: {source}")]
    InvalidOverride {
        field: String,
        #[source]
        source: CoercionError,
    },
}

/// Master error type for a seed or verify call.
///
/// Row numbers are 1-based, matching the visible table numbering.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FixtureError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error("Row {row}: value for {field} cannot be used: {source}")]
    Coercion {
        row: usize,
        field: String,
        #[source]
        source: CoercionError,
    },

    #[error("Row {row}: lookup field {entity}.{field} has no value")]
    MissingLookup {
        entity: &'static str,
        row: usize,
        field: String,
    },

    #[error("Row {row}: no {entity} found where {lookup}")]
    NotFound {
        entity: &'static str,
        row: usize,
        lookup: String,
    },

    #[error("Row {row}: {matches} {entity} entities found where {lookup}")]
    Ambiguous {
        entity: &'static str,
        row: usize,
        matches: usize,
        lookup: String,
    },

    #[error("Row {row}: {entity}.{field} expected {expected}, actual {actual}")]
    Mismatch {
        entity: &'static str,
        row: usize,
        field: String,
        expected: FieldValue,
        actual: FieldValue,
    },

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl From<FieldError> for FixtureError {
    fn from(err: FieldError) -> Self {
        FixtureError::Config(ConfigError::InvalidField(err))
    }
}

impl FixtureError {
    /// 1-based table row the failure refers to, when there is one.
    pub fn row(&self) -> Option<usize> {
        match self {
            FixtureError::Coercion { row, .. }
            | FixtureError::MissingLookup { row, .. }
            | FixtureError::NotFound { row, .. }
            | FixtureError::Ambiguous { row, .. }
            | FixtureError::Mismatch { row, .. } => Some(*row),
            FixtureError::Materialize(MaterializeError::InvalidCell { row, .. }) => Some(*row),
            _ => None,
        }
    }
}

/// Result type alias for seedcheck operations.
pub type FixtureResult<T> = Result<T, FixtureError>;

// =============================================================================
// TESTS
// =============================================================================

//! Error taxonomy for validation and extraction runs
//!
//! Everything except [`CellCoercionError`] is fatal to a run. Cell errors are
//! row-local and only escalate when the engine runs with strict typing.

use crate::config::{ColumnType, SourceKind};
use std::path::PathBuf;
use thiserror::Error;

/// Bad or missing settings, caught before any I/O happens
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] serde_json::Error),

    #[error("the {0:?} source requires its location to be set")]
    MissingLocation(SourceKind),

    #[error("variable `{0}` doesn't exist")]
    UnknownVariable(String),

    #[error("the field map must contain at least one mapping")]
    EmptyFieldMap,

    #[error("field mapping #{0} has an empty input path")]
    EmptyInputPath(usize),

    #[error("field mapping #{0} has an empty output column")]
    EmptyOutputColumn(usize),

    #[error("input path `{0}` is mapped more than once")]
    DuplicateInputPath(String),

    #[error("output column `{0}` is mapped more than once")]
    DuplicateOutputColumn(String),

    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("column `{0}` is declared more than once in the output schema")]
    DuplicateColumnName(String),

    #[error("slot {slot} is outside the {width}-column output schema")]
    InvalidSlot { slot: usize, width: usize },

    #[error("slot {0} is used by more than one output column")]
    DuplicateColumnSlot(usize),

    #[error("unable to locate output column `{0}` in the output schema")]
    UnknownColumn(String),
}

/// The source could not be located, materialized or read
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("the {0:?} source has no location set")]
    NoLocation(SourceKind),

    #[error("file {0} doesn't exist")]
    NotFound(PathBuf),

    #[error("variable `{0}` is not defined")]
    UnknownVariable(String),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("local temp directory doesn't exist: {0}")]
    TempDir(PathBuf),

    #[error("cannot download the json file from {url}")]
    Unreachable {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to read the source stream: {0}")]
    Read(#[source] std::io::Error),
}

/// The document's shape does not match what the root path expects
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("root path `{path}` doesn't match any token")]
    NoMatch { path: String },

    #[error("invalid token returned by root path `{path}`: {found}")]
    UnsupportedRoot { path: String, found: &'static str },

    #[error("element {index} of the array at `{path}` is {found}, expected an object")]
    NonObjectElement {
        path: String,
        index: usize,
        found: &'static str,
    },
}

/// A resolved token could not be converted into its column's declared type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("row {row}: cannot store {found} from `{input_path}` into {expected:?} column `{column}`")]
pub struct CellCoercionError {
    pub row: usize,
    pub column: String,
    pub input_path: String,
    pub expected: ColumnType,
    pub found: String,
}

/// Fatal outcome of an extraction run
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error("malformed JSON document: {0}")]
    Parse(#[source] serde_json::Error),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("row rejected under strict typing: {0}")]
    RowRejected(#[source] CellCoercionError),

    #[error("{context}: {source}")]
    Runtime {
        context: String,
        #[source]
        source: anyhow::Error,
    },
}

impl RunError {
    pub(crate) fn runtime(context: impl Into<String>, source: anyhow::Error) -> Self {
        RunError::Runtime {
            context: context.into(),
            source,
        }
    }
}

/// Short name of a JSON token's variant, used in error messages
pub(crate) fn token_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

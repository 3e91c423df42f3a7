//! # jsonsource - tabular rows from JSON documents
//!
//! Extracts rows from a JSON document whose shape is only known at run time,
//! driven by a declarative configuration: a root path selecting the record
//! set and a field map assigning record fields to output columns.
//!
//! ## Modules
//!
//! - **config**: persisted configuration and validate-then-run checks
//! - **extract**: path selection, record set resolution, row extraction and the run engine
//! - **source**: acquisition of the document stream (files, variables, downloads)
//! - **sink**: where extracted rows are handed off
//! - **diagnostics**: informational messages and warnings emitted during a run
//!
//! ## Quick Start
//!
//! ```rust
//! use jsonsource::{extract_rows, Cell, ColumnType, Configuration, OutputColumn};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Configuration::for_url("http://example.com/feed.json")
//!     .with_root_path("items")
//!     .with_mapping("id", "Id")
//!     .with_mapping("name", "Name");
//!
//! let columns = vec![
//!     OutputColumn::new("Id", ColumnType::Int, 0),
//!     OutputColumn::new("Name", ColumnType::Text, 1),
//! ];
//!
//! let doc = br#"{"items": [{"id": 1, "name": "a"}, {"id": 2}]}"#;
//! let rows = extract_rows(config, &columns, &doc[..])?;
//!
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[1].get(1), Some(&Cell::Missing));
//! # Ok(())
//! # }
//! ```

use std::io::Read;

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod sink;
pub mod source;

// Re-export commonly used types for convenience
pub use config::{
    validate, ColumnType, Configuration, FieldMapping, OutputColumn, SourceKind, ValidatedConfig,
};
pub use error::{AcquisitionError, CellCoercionError, ConfigError, RunError, StructuralError};
pub use extract::{
    run, Cell, EngineOptions, EngineState, ExtractionEngine, JsonPath, Row, RunSummary,
};
pub use sink::{JsonLinesSink, RowSink, VecSink};
pub use source::{Acquirer, Downloader, SourceStream, VariableStore};

/// Validate `config`, run it over `reader` and collect the rows in memory
pub fn extract_rows<R: Read>(
    config: Configuration,
    columns: &[OutputColumn],
    reader: R,
) -> Result<Vec<Row>, RunError> {
    let validated = validate(config, columns)?;
    let mut sink = VecSink::new();
    run(validated, reader, &mut sink)?;
    Ok(sink.into_rows())
}

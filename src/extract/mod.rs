//! Extraction of tabular rows from a parsed JSON document
//!
//! The pipeline is: parse the stream, select the record set with the root
//! path, then build one row per record from the field map. [`ExtractionEngine`]
//! drives a single run through those stages.

pub mod coerce;
pub mod engine;
pub mod path;
pub mod record_set;
pub mod row;

pub use engine::{run, EngineOptions, EngineState, ExtractionEngine, RunSummary};
pub use path::{select, JsonPath, PathError, Segment};
pub use record_set::{resolve, RecordSet};
pub use row::{Cell, Row, RowExtractor, RowOutcome};

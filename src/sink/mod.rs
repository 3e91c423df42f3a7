//! Row sinks: where extracted rows are handed off
//!
//! The engine calls [`RowSink::add_row`] once per record in document order
//! and [`RowSink::set_end_of_rowset`] once after the last record of a
//! successful run. Rows are not retained by the engine after hand-off.

pub mod writer;

use crate::extract::Row;
use anyhow::{bail, Result};

pub use writer::JsonLinesSink;

/// Destination buffer for extracted rows
pub trait RowSink {
    /// Append one row; unmapped slots are `None` and left at the sink's default
    fn add_row(&mut self, row: Row) -> Result<()>;

    /// Signal that no more rows will follow
    fn set_end_of_rowset(&mut self) -> Result<()>;
}

/// Collects rows in memory
#[derive(Debug, Default)]
pub struct VecSink {
    rows: Vec<Row>,
    finished: bool,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Whether end-of-rowset has been signalled
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl RowSink for VecSink {
    fn add_row(&mut self, row: Row) -> Result<()> {
        if self.finished {
            bail!("row added after end of rowset");
        }
        self.rows.push(row);
        Ok(())
    }

    fn set_end_of_rowset(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

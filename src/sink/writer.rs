use crate::config::OutputColumn;
use crate::extract::Row;
use crate::sink::RowSink;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::io::Write;

/// Writes each row as one JSON object per line, keyed by output column name
///
/// Keys follow slot order. Unmapped slots are omitted; missing cells are
/// written as `null`.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    names: Vec<Option<String>>,
    rows_written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W, columns: &[OutputColumn]) -> Self {
        // slots outside the schema never receive a cell
        let mut names = vec![None; columns.len()];
        for column in columns {
            if let Some(name) = names.get_mut(column.slot) {
                *name = Some(column.name.clone());
            }
        }

        JsonLinesSink {
            writer,
            names,
            rows_written: 0,
        }
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RowSink for JsonLinesSink<W> {
    fn add_row(&mut self, row: Row) -> Result<()> {
        let mut data = Map::new();
        for (slot, cell) in row.cells().iter().enumerate() {
            let (Some(cell), Some(Some(name))) = (cell, self.names.get(slot)) else {
                continue;
            };
            data.insert(name.clone(), cell.to_json());
        }

        let json = serde_json::to_string(&Value::Object(data))
            .context("Failed to serialize row")?;
        writeln!(self.writer, "{}", json).context("Failed to write row")?;
        self.rows_written += 1;
        Ok(())
    }

    fn set_end_of_rowset(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}

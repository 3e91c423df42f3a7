//! Per-record field extraction into pre-sized rows
//!
//! Every mapped column owns one slot in the row, fixed at validation time.
//! Workers each receive a distinct `&mut` slot from `par_iter_mut`, so the
//! row needs no locking.

use crate::config::SlotBinding;
use crate::error::CellCoercionError;
use crate::extract::coerce::coerce;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use serde_json::Value;

/// Value stored in one row slot
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// The input path did not resolve in this record
    Missing,
    /// The input path resolved to JSON `null`
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(Value),
}

impl Cell {
    /// JSON rendering; missing and null both become `null`
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Missing | Cell::Null => Value::Null,
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => Value::from(*f),
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Json(v) => v.clone(),
        }
    }
}

/// One output row, indexed by column slot
///
/// Slots that no field mapping targets stay `None` so the sink can apply
/// its own default.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    cells: Vec<Option<Cell>>,
}

impl Row {
    pub fn with_width(width: usize) -> Self {
        Row {
            cells: vec![None; width],
        }
    }

    pub fn width(&self) -> usize {
        self.cells.len()
    }

    /// The cell at `slot`, or `None` for unmapped or out-of-range slots
    pub fn get(&self, slot: usize) -> Option<&Cell> {
        self.cells.get(slot).and_then(Option::as_ref)
    }

    /// Store `cell` at `slot`; out-of-range slots are ignored
    pub fn set(&mut self, slot: usize, cell: Cell) {
        if let Some(target) = self.cells.get_mut(slot) {
            *target = Some(cell);
        }
    }

    pub fn cells(&self) -> &[Option<Cell>] {
        &self.cells
    }
}

/// A populated row plus the cells that failed type coercion
#[derive(Debug)]
pub struct RowOutcome {
    pub row: Row,
    pub errors: Vec<CellCoercionError>,
}

/// Resolves every mapped field of a record, optionally on a bounded pool
pub struct RowExtractor {
    pool: Option<ThreadPool>,
}

impl RowExtractor {
    /// Extractor backed by `workers` threads; one or zero means sequential
    pub fn new(workers: usize) -> Result<Self, ThreadPoolBuildError> {
        if workers <= 1 {
            return Ok(Self::sequential());
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("jsonsource-field-{}", i))
            .build()?;
        Ok(RowExtractor { pool: Some(pool) })
    }

    pub fn sequential() -> Self {
        RowExtractor { pool: None }
    }

    pub fn workers(&self) -> usize {
        self.pool.as_ref().map_or(1, |p| p.current_num_threads())
    }

    /// Build the row for `record`; `slots` comes from the validated config
    ///
    /// Coercion failures leave the cell `Missing` and are returned alongside
    /// the row, in slot order.
    pub fn extract(
        &self,
        record: &Value,
        slots: &[Option<SlotBinding>],
        row_index: usize,
    ) -> RowOutcome {
        let mut row = Row::with_width(slots.len());

        let errors: Vec<CellCoercionError> = match &self.pool {
            Some(pool) => pool.install(|| {
                row.cells
                    .par_iter_mut()
                    .zip(slots.par_iter())
                    .filter_map(|(cell, binding)| {
                        fill_cell(cell, record, binding.as_ref()?, row_index)
                    })
                    .collect()
            }),
            None => row
                .cells
                .iter_mut()
                .zip(slots)
                .filter_map(|(cell, binding)| fill_cell(cell, record, binding.as_ref()?, row_index))
                .collect(),
        };

        RowOutcome { row, errors }
    }
}

fn fill_cell(
    cell: &mut Option<Cell>,
    record: &Value,
    binding: &SlotBinding,
    row_index: usize,
) -> Option<CellCoercionError> {
    let Some(token) = binding.path.resolve(record) else {
        *cell = Some(Cell::Missing);
        return None;
    };

    match coerce(token, binding.column_type) {
        Ok(value) => {
            *cell = Some(value);
            None
        }
        Err(found) => {
            *cell = Some(Cell::Missing);
            Some(CellCoercionError {
                row: row_index,
                column: binding.column.clone(),
                input_path: binding.input_path.clone(),
                expected: binding.column_type,
                found,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{validate, ColumnType, Configuration, OutputColumn};
    use serde_json::json;

    fn slots_for(mappings: &[(&str, &str, ColumnType)], width: usize) -> Vec<Option<SlotBinding>> {
        let mut config = Configuration::for_url("http://example.com/feed.json");
        let mut columns = Vec::new();
        for (slot, (input, output, ty)) in mappings.iter().enumerate() {
            config = config.with_mapping(input, output);
            columns.push(OutputColumn::new(*output, *ty, slot));
        }
        for slot in mappings.len()..width {
            columns.push(OutputColumn::new(format!("unused{}", slot), ColumnType::Text, slot));
        }
        validate(config, &columns).unwrap().slots().to_vec()
    }

    #[test]
    fn test_missing_field_is_missing_cell() {
        let slots = slots_for(
            &[("id", "Id", ColumnType::Int), ("name", "Name", ColumnType::Text)],
            2,
        );
        let outcome = RowExtractor::sequential().extract(&json!({"id": 2}), &slots, 0);

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.row.get(0), Some(&Cell::Int(2)));
        assert_eq!(outcome.row.get(1), Some(&Cell::Missing));
    }

    #[test]
    fn test_unmapped_slots_stay_unset() {
        let slots = slots_for(&[("id", "Id", ColumnType::Int)], 3);
        let outcome = RowExtractor::sequential().extract(&json!({"id": 1}), &slots, 0);

        assert_eq!(outcome.row.width(), 3);
        assert_eq!(outcome.row.cells()[1], None);
        assert_eq!(outcome.row.get(2), None);
    }

    #[test]
    fn test_nested_and_indexed_paths() {
        let slots = slots_for(
            &[
                ("user.name", "Name", ColumnType::Text),
                ("tags.0", "FirstTag", ColumnType::Text),
                ("tags.9", "TenthTag", ColumnType::Text),
            ],
            3,
        );
        let record = json!({"user": {"name": "Alice"}, "tags": ["rust", "json"]});
        let outcome = RowExtractor::sequential().extract(&record, &slots, 0);

        assert_eq!(outcome.row.get(0), Some(&Cell::Text("Alice".into())));
        assert_eq!(outcome.row.get(1), Some(&Cell::Text("rust".into())));
        assert_eq!(outcome.row.get(2), Some(&Cell::Missing));
    }

    #[test]
    fn test_coercion_failure_is_row_local() {
        let slots = slots_for(
            &[("id", "Id", ColumnType::Int), ("name", "Name", ColumnType::Text)],
            2,
        );
        let record = json!({"id": "x7", "name": "a"});
        let outcome = RowExtractor::sequential().extract(&record, &slots, 4);

        assert_eq!(outcome.row.get(0), Some(&Cell::Missing));
        assert_eq!(outcome.row.get(1), Some(&Cell::Text("a".into())));
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].row, 4);
        assert_eq!(outcome.errors[0].column, "Id");
        assert_eq!(outcome.errors[0].expected, ColumnType::Int);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mappings: Vec<(String, String, ColumnType)> = (0..64)
            .map(|i| {
                let ty = match i % 4 {
                    0 => ColumnType::Int,
                    1 => ColumnType::Text,
                    2 => ColumnType::Float,
                    _ => ColumnType::Json,
                };
                (format!("f{}.v", i), format!("C{}", i), ty)
            })
            .collect();
        let borrowed: Vec<(&str, &str, ColumnType)> = mappings
            .iter()
            .map(|(i, o, t)| (i.as_str(), o.as_str(), *t))
            .collect();
        let slots = slots_for(&borrowed, 64);

        let mut record = serde_json::Map::new();
        for i in 0..64 {
            // every fifth field absent, every seventh uncoercible
            if i % 5 == 0 {
                continue;
            }
            let v = if i % 7 == 0 { json!({"bad": i}) } else { json!(i) };
            record.insert(format!("f{}", i), json!({ "v": v }));
        }
        let record = Value::Object(record);

        let parallel = RowExtractor::new(4).unwrap();
        assert_eq!(parallel.workers(), 4);
        for _ in 0..20 {
            let a = parallel.extract(&record, &slots, 0);
            let b = RowExtractor::sequential().extract(&record, &slots, 0);
            assert_eq!(a.row, b.row);
            assert_eq!(a.errors, b.errors);
        }
    }
}

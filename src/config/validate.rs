//! Validate-then-run: turns a [`Configuration`] plus the host's declared
//! output columns into an immutable [`ValidatedConfig`].

use crate::config::model::{Configuration, FieldMapping, SourceKind};
use crate::diagnostics::{codes, Diagnostics, NullDiagnostics};
use crate::error::ConfigError;
use crate::extract::path::JsonPath;
use crate::source::VariableStore;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Declared type of a destination column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    Bool,
    Int,
    Float,
    Text,
    /// ISO-8601 date or date-time, kept as text
    DateTime,
    /// Any token, passed through unchanged
    Json,
}

/// A column declared by the host, with its stable slot in the row buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub slot: usize,
}

impl OutputColumn {
    pub fn new(name: impl Into<String>, column_type: ColumnType, slot: usize) -> Self {
        OutputColumn {
            name: name.into(),
            column_type,
            slot,
        }
    }
}

/// A field mapping whose input path has been parsed
#[derive(Debug, Clone)]
pub struct FieldBinding {
    pub mapping: FieldMapping,
    pub path: JsonPath,
}

/// Ordered field mappings, unique on both sides
#[derive(Debug, Clone)]
pub struct FieldMap {
    bindings: Vec<FieldBinding>,
}

impl FieldMap {
    pub fn new(mappings: &[FieldMapping]) -> Result<Self, ConfigError> {
        if mappings.is_empty() {
            return Err(ConfigError::EmptyFieldMap);
        }

        let mut inputs = HashSet::new();
        let mut outputs = HashSet::new();
        let mut bindings = Vec::with_capacity(mappings.len());

        for (idx, mapping) in mappings.iter().enumerate() {
            if mapping.input_path.is_empty() {
                return Err(ConfigError::EmptyInputPath(idx));
            }
            if mapping.output_column.is_empty() {
                return Err(ConfigError::EmptyOutputColumn(idx));
            }
            if !inputs.insert(mapping.input_path.as_str()) {
                return Err(ConfigError::DuplicateInputPath(mapping.input_path.clone()));
            }
            if !outputs.insert(mapping.output_column.as_str()) {
                return Err(ConfigError::DuplicateOutputColumn(
                    mapping.output_column.clone(),
                ));
            }

            let path = parse_path(&mapping.input_path)?;
            if path.has_wildcard() {
                return Err(ConfigError::InvalidPath {
                    path: mapping.input_path.clone(),
                    reason: "wildcards are only allowed in the root path".to_string(),
                });
            }

            bindings.push(FieldBinding {
                mapping: mapping.clone(),
                path,
            });
        }

        Ok(FieldMap { bindings })
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldBinding> {
        self.bindings.iter()
    }
}

/// Output column name to row slot, exact and case-sensitive
#[derive(Debug, Clone)]
pub struct ColumnIndexMap {
    columns: HashMap<String, OutputColumn>,
    width: usize,
}

impl ColumnIndexMap {
    pub fn new(columns: &[OutputColumn]) -> Result<Self, ConfigError> {
        let mut by_name = HashMap::with_capacity(columns.len());
        let mut slots = HashSet::with_capacity(columns.len());

        for column in columns {
            if column.slot >= columns.len() {
                return Err(ConfigError::InvalidSlot {
                    slot: column.slot,
                    width: columns.len(),
                });
            }
            if !slots.insert(column.slot) {
                return Err(ConfigError::DuplicateColumnSlot(column.slot));
            }
            if by_name.insert(column.name.clone(), column.clone()).is_some() {
                return Err(ConfigError::DuplicateColumnName(column.name.clone()));
            }
        }

        Ok(ColumnIndexMap {
            columns: by_name,
            width: columns.len(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&OutputColumn> {
        self.columns.get(name)
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.get(name).map(|c| c.slot)
    }

    /// Number of slots in a destination row
    pub fn width(&self) -> usize {
        self.width
    }
}

/// What a single row slot is filled from
#[derive(Debug, Clone)]
pub struct SlotBinding {
    pub path: JsonPath,
    pub input_path: String,
    pub column: String,
    pub column_type: ColumnType,
}

/// A configuration that passed validation; immutable for the rest of the run
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    config: Configuration,
    root_path: JsonPath,
    field_map: FieldMap,
    columns: ColumnIndexMap,
    slots: Vec<Option<SlotBinding>>,
}

impl ValidatedConfig {
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn root_path(&self) -> &JsonPath {
        &self.root_path
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    pub fn columns(&self) -> &ColumnIndexMap {
        &self.columns
    }

    /// One entry per row slot; `None` for columns no mapping targets
    pub fn slots(&self) -> &[Option<SlotBinding>] {
        &self.slots
    }
}

/// Checks a configuration against the host environment
pub struct Validator<'a> {
    columns: &'a [OutputColumn],
    variables: Option<&'a dyn VariableStore>,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a> Validator<'a> {
    pub fn new(columns: &'a [OutputColumn]) -> Self {
        Validator {
            columns,
            variables: None,
            diagnostics: &NullDiagnostics,
        }
    }

    /// Also check that variable-based sources name an existing variable
    pub fn with_variables(mut self, variables: &'a dyn VariableStore) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: &'a dyn Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn validate(&self, config: Configuration) -> Result<ValidatedConfig, ConfigError> {
        let result = self.check(config);
        if let Err(ref e) = result {
            self.diagnostics.error(error_code(e), &e.to_string());
        }
        result
    }

    fn check(&self, config: Configuration) -> Result<ValidatedConfig, ConfigError> {
        self.check_source(&config)?;

        let field_map = FieldMap::new(&config.field_map)?;
        let columns = ColumnIndexMap::new(self.columns)?;
        let root_path = parse_path(&config.root_path)?;

        let mut slots = vec![None; columns.width()];
        for binding in field_map.iter() {
            let column = columns
                .get(&binding.mapping.output_column)
                .ok_or_else(|| ConfigError::UnknownColumn(binding.mapping.output_column.clone()))?;
            slots[column.slot] = Some(SlotBinding {
                path: binding.path.clone(),
                input_path: binding.mapping.input_path.clone(),
                column: column.name.clone(),
                column_type: column.column_type,
            });
        }

        if let Some(dir) = &config.temp_dir {
            if !dir.as_os_str().is_empty() && !dir.is_dir() {
                self.diagnostics.warning(
                    codes::WARNING_CUSTOM_TEMP_DIR_INVALID,
                    &format!(
                        "The path to {} doesn't exist on this filesystem. Make sure it exists \
                         and is writable wherever the run is deployed.",
                        dir.display()
                    ),
                );
            }
        }

        log::debug!(
            "validated configuration: {} mappings, {} output slots, root path `{}`",
            field_map.len(),
            columns.width(),
            root_path
        );

        Ok(ValidatedConfig {
            config,
            root_path,
            field_map,
            columns,
            slots,
        })
    }

    fn check_source(&self, config: &Configuration) -> Result<(), ConfigError> {
        let location = config
            .location()
            .ok_or(ConfigError::MissingLocation(config.source_kind))?;

        match config.source_kind {
            SourceKind::FilePath => {
                // The file may legitimately be produced before the run starts
                if !Path::new(location).exists() {
                    self.diagnostics.warning(
                        codes::WARNING_FILE_MISSING,
                        &format!(
                            "The file {} doesn't exist. Make sure it will at runtime.",
                            location
                        ),
                    );
                }
            }
            SourceKind::FilePathVariable | SourceKind::WebUrlVariable => {
                if let Some(vars) = self.variables {
                    if vars.get(location).is_none() {
                        return Err(ConfigError::UnknownVariable(location.to_string()));
                    }
                }
            }
            SourceKind::WebUrl => {}
        }

        Ok(())
    }
}

/// Validate `config` against the host's declared output columns
pub fn validate(
    config: Configuration,
    columns: &[OutputColumn],
) -> Result<ValidatedConfig, ConfigError> {
    Validator::new(columns).validate(config)
}

fn parse_path(raw: &str) -> Result<JsonPath, ConfigError> {
    JsonPath::parse(raw).map_err(|e| ConfigError::InvalidPath {
        path: raw.to_string(),
        reason: e.to_string(),
    })
}

fn error_code(error: &ConfigError) -> i32 {
    match error {
        ConfigError::MissingLocation(SourceKind::FilePath) => codes::ERROR_FILE_PATH_MISSING,
        ConfigError::MissingLocation(SourceKind::WebUrl) => codes::ERROR_WEB_URL_MISSING,
        ConfigError::MissingLocation(SourceKind::WebUrlVariable) => {
            codes::ERROR_WEB_URL_VARIABLE_MISSING
        }
        ConfigError::MissingLocation(SourceKind::FilePathVariable)
        | ConfigError::UnknownVariable(_) => codes::ERROR_FILE_VARIABLE_WRONG,
        ConfigError::EmptyFieldMap => codes::ERROR_IOMAP_EMPTY,
        ConfigError::EmptyInputPath(_)
        | ConfigError::EmptyOutputColumn(_)
        | ConfigError::DuplicateInputPath(_)
        | ConfigError::DuplicateOutputColumn(_)
        | ConfigError::InvalidPath { .. } => codes::ERROR_IOMAP_ENTRY_ERROR,
        ConfigError::Load(_)
        | ConfigError::InvalidSlot { .. }
        | ConfigError::DuplicateColumnName(_)
        | ConfigError::DuplicateColumnSlot(_)
        | ConfigError::UnknownColumn(_) => codes::RUNTIME_ERROR_MODEL_INVALID,
    }
}

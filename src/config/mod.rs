//! Component configuration and validation
//!
//! A [`Configuration`] is the persisted settings blob. Validating it against
//! the host's output columns yields a [`ValidatedConfig`], the only thing an
//! extraction run accepts.

pub mod model;
pub mod validate;

pub use model::{Configuration, FieldMapping, SourceKind};
pub use validate::{
    validate, ColumnIndexMap, ColumnType, FieldBinding, FieldMap, OutputColumn, SlotBinding,
    ValidatedConfig, Validator,
};

//! Turns the tokens selected by the root path into the list of records to emit

use crate::error::{token_kind, StructuralError};
use crate::extract::path::JsonPath;
use serde_json::Value;

/// Records borrowed from the parsed document, in encounter order
#[derive(Debug)]
pub struct RecordSet<'a> {
    /// Number of tokens the root path matched
    pub tokens_matched: usize,
    pub records: Vec<&'a Value>,
}

/// Resolve `root_path` against `tree` and flatten the matches into records
///
/// A path without wildcards must match something; a wildcard path that
/// matches nothing yields an empty record set.
pub fn resolve<'a>(
    tree: &'a Value,
    root_path: &JsonPath,
) -> Result<RecordSet<'a>, StructuralError> {
    let matched = root_path.select(tree);

    if matched.is_empty() && !root_path.has_wildcard() {
        return Err(StructuralError::NoMatch {
            path: root_path.to_string(),
        });
    }

    let mut records = Vec::new();
    for &token in &matched {
        match token {
            Value::Array(items) => {
                records.reserve(items.len());
                for (index, item) in items.iter().enumerate() {
                    if !item.is_object() {
                        return Err(StructuralError::NonObjectElement {
                            path: root_path.to_string(),
                            index,
                            found: token_kind(item),
                        });
                    }
                    records.push(item);
                }
            }
            Value::Object(_) => records.push(token),
            other => {
                return Err(StructuralError::UnsupportedRoot {
                    path: root_path.to_string(),
                    found: token_kind(other),
                });
            }
        }
    }

    log::debug!(
        "root path `{}` matched {} tokens, {} records",
        root_path,
        matched.len(),
        records.len()
    );

    Ok(RecordSet {
        tokens_matched: matched.len(),
        records,
    })
}

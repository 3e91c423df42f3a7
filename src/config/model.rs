use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the JSON document comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    /// A literal path on the local filesystem
    FilePath,
    /// A host variable whose value is a local path
    FilePathVariable,
    /// A literal URL, downloaded to a temporary file
    WebUrl,
    /// A host variable whose value is a URL
    WebUrlVariable,
}

/// One (input path, output column) pairing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    /// Dotted path relative to a record token
    pub input_path: String,
    /// Name of the destination column
    pub output_column: String,
}

impl FieldMapping {
    pub fn new(input_path: impl Into<String>, output_column: impl Into<String>) -> Self {
        FieldMapping {
            input_path: input_path.into(),
            output_column: output_column.into(),
        }
    }
}

/// Persisted component configuration
///
/// Only the location field selected by `source_kind` is meaningful; the
/// others are kept so a host can switch kinds without losing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub source_kind: SourceKind,

    #[serde(default)]
    pub file_path: Option<String>,

    #[serde(default)]
    pub file_path_variable: Option<String>,

    #[serde(default)]
    pub web_url: Option<String>,

    #[serde(default)]
    pub web_url_variable: Option<String>,

    /// Dotted path to the record set; empty selects the whole document
    #[serde(default)]
    pub root_path: String,

    #[serde(default)]
    pub field_map: Vec<FieldMapping>,

    /// Override for where downloaded documents are materialized
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Configuration {
    /// A configuration reading a local file, with no mappings yet
    pub fn for_file(path: impl Into<String>) -> Self {
        Configuration {
            file_path: Some(path.into()),
            ..Self::empty(SourceKind::FilePath)
        }
    }

    /// A configuration downloading from a URL, with no mappings yet
    pub fn for_url(url: impl Into<String>) -> Self {
        Configuration {
            web_url: Some(url.into()),
            ..Self::empty(SourceKind::WebUrl)
        }
    }

    fn empty(source_kind: SourceKind) -> Self {
        Configuration {
            source_kind,
            file_path: None,
            file_path_variable: None,
            web_url: None,
            web_url_variable: None,
            root_path: String::new(),
            field_map: Vec::new(),
            temp_dir: None,
        }
    }

    pub fn with_root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = root_path.into();
        self
    }

    pub fn with_mapping(mut self, input_path: &str, output_column: &str) -> Self {
        self.field_map.push(FieldMapping::new(input_path, output_column));
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// The location string selected by `source_kind`, if it is set and non-empty
    pub fn location(&self) -> Option<&str> {
        let location = match self.source_kind {
            SourceKind::FilePath => self.file_path.as_deref(),
            SourceKind::FilePathVariable => self.file_path_variable.as_deref(),
            SourceKind::WebUrl => self.web_url.as_deref(),
            SourceKind::WebUrlVariable => self.web_url_variable.as_deref(),
        };
        location.filter(|s| !s.is_empty())
    }

    /// Load the persisted JSON blob
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_camel_case_blob() {
        let blob = r#"{
            "sourceKind": "webUrlVariable",
            "webUrlVariable": "User::FeedUrl",
            "rootPath": "data.items",
            "fieldMap": [{"inputPath": "id", "outputColumn": "Id"}]
        }"#;

        let config = Configuration::from_json(blob).unwrap();
        assert_eq!(config.source_kind, SourceKind::WebUrlVariable);
        assert_eq!(config.location(), Some("User::FeedUrl"));
        assert_eq!(config.root_path, "data.items");
        assert_eq!(config.field_map, vec![FieldMapping::new("id", "Id")]);
        assert!(config.temp_dir.is_none());
    }

    #[test]
    fn test_location_follows_source_kind() {
        let mut config = Configuration::for_file("/data/feed.json");
        config.web_url = Some("http://example.com/feed.json".to_string());
        assert_eq!(config.location(), Some("/data/feed.json"));

        config.source_kind = SourceKind::WebUrl;
        assert_eq!(config.location(), Some("http://example.com/feed.json"));

        config.source_kind = SourceKind::FilePathVariable;
        assert_eq!(config.location(), None);
    }

    #[test]
    fn test_unknown_source_kind_fails_to_load() {
        let err = Configuration::from_json(r#"{"sourceKind": "ftp"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_json_blob_survives_reload() {
        let config = Configuration::for_url("http://example.com/a.json")
            .with_root_path("items")
            .with_mapping("id", "Id")
            .with_temp_dir("/var/tmp");

        let reloaded = Configuration::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(reloaded, config);
    }
}

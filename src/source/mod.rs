//! Document acquisition
//!
//! Resolves a [`Configuration`]'s source into a readable stream positioned at
//! byte 0. URLs are materialized into a temporary file through a host-supplied
//! [`Downloader`]; the file is removed when the [`SourceStream`] is dropped.

use crate::config::{Configuration, SourceKind};
use crate::error::AcquisitionError;
use anyhow::anyhow;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Host variables (e.g. package variables) visible to a run
pub trait VariableStore {
    fn get(&self, name: &str) -> Option<String>;
}

impl VariableStore for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// No variables defined
pub struct NoVariables;

impl VariableStore for NoVariables {
    fn get(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Fetches a URL into `dest`
pub trait Downloader {
    fn download(&self, url: &str, dest: &mut dyn Write) -> anyhow::Result<()>;
}

/// Rejects every URL
pub struct NoDownloader;

impl Downloader for NoDownloader {
    fn download(&self, _url: &str, _dest: &mut dyn Write) -> anyhow::Result<()> {
        Err(anyhow!("no downloader is configured for URL sources"))
    }
}

/// A source location after variables have been substituted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    File(PathBuf),
    Url(String),
}

impl SourceDescriptor {
    pub fn resolve(
        config: &Configuration,
        variables: &dyn VariableStore,
    ) -> Result<Self, AcquisitionError> {
        let location = config
            .location()
            .ok_or(AcquisitionError::NoLocation(config.source_kind))?;

        let lookup = |name: &str| {
            variables
                .get(name)
                .ok_or_else(|| AcquisitionError::UnknownVariable(name.to_string()))
        };

        Ok(match config.source_kind {
            SourceKind::FilePath => SourceDescriptor::File(PathBuf::from(location)),
            SourceKind::FilePathVariable => {
                SourceDescriptor::File(PathBuf::from(lookup(location)?))
            }
            SourceKind::WebUrl => SourceDescriptor::Url(location.to_string()),
            SourceKind::WebUrlVariable => SourceDescriptor::Url(lookup(location)?),
        })
    }
}

/// An open document; closes (and deletes any downloaded copy) on drop
pub struct SourceStream {
    reader: BufReader<File>,
    path: PathBuf,
    // declared after `reader` so the handle closes before the file is removed
    downloaded: Option<TempPath>,
}

impl SourceStream {
    /// Where the stream reads from on the local filesystem
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_download(&self) -> bool {
        self.downloaded.is_some()
    }
}

impl Read for SourceStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Open a local file as a source stream
pub fn open_file(path: &Path) -> Result<SourceStream, AcquisitionError> {
    if !path.exists() {
        return Err(AcquisitionError::NotFound(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|source| AcquisitionError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(SourceStream {
        reader: BufReader::new(file),
        path: path.to_path_buf(),
        downloaded: None,
    })
}

/// The directory downloads are written to
///
/// A custom directory must already exist; otherwise the system temp dir is used.
pub fn resolve_temp_dir(custom: Option<&Path>) -> Result<PathBuf, AcquisitionError> {
    match custom.filter(|p| !p.as_os_str().is_empty()) {
        Some(dir) if dir.is_dir() => Ok(dir.to_path_buf()),
        Some(dir) => Err(AcquisitionError::TempDir(dir.to_path_buf())),
        None => Ok(std::env::temp_dir()),
    }
}

/// Opens configured sources using the host's variables and downloader
pub struct Acquirer<'a> {
    variables: &'a dyn VariableStore,
    downloader: &'a dyn Downloader,
}

impl<'a> Acquirer<'a> {
    pub fn new(variables: &'a dyn VariableStore, downloader: &'a dyn Downloader) -> Self {
        Acquirer {
            variables,
            downloader,
        }
    }

    pub fn acquire(&self, config: &Configuration) -> Result<SourceStream, AcquisitionError> {
        match SourceDescriptor::resolve(config, self.variables)? {
            SourceDescriptor::File(path) => open_file(&path),
            SourceDescriptor::Url(url) => self.download(&url, config.temp_dir.as_deref()),
        }
    }

    fn download(
        &self,
        url: &str,
        temp_dir: Option<&Path>,
    ) -> Result<SourceStream, AcquisitionError> {
        let dir = resolve_temp_dir(temp_dir)?;

        let mut temp = tempfile::Builder::new()
            .suffix(".json")
            .tempfile_in(&dir)
            .map_err(|source| AcquisitionError::Io {
                path: dir.clone(),
                source,
            })?;

        log::debug!("downloading {} to {}", url, temp.path().display());
        self.downloader
            .download(url, temp.as_file_mut())
            .map_err(|source| AcquisitionError::Unreachable {
                url: url.to_string(),
                source,
            })?;

        let temp_path = temp.into_temp_path();
        let file = File::open(&temp_path).map_err(|source| AcquisitionError::Io {
            path: temp_path.to_path_buf(),
            source,
        })?;

        Ok(SourceStream {
            reader: BufReader::new(file),
            path: temp_path.to_path_buf(),
            downloaded: Some(temp_path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct StaticDownloader(&'static str);

    impl Downloader for StaticDownloader {
        fn download(&self, _url: &str, dest: &mut dyn Write) -> anyhow::Result<()> {
            dest.write_all(self.0.as_bytes())?;
            Ok(())
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolve_variables() {
        let mut config = Configuration::for_file("unused");
        config.source_kind = SourceKind::FilePathVariable;
        config.file_path_variable = Some("User::Path".to_string());

        let store = vars(&[("User::Path", "/data/in.json")]);
        assert_eq!(
            SourceDescriptor::resolve(&config, &store).unwrap(),
            SourceDescriptor::File(PathBuf::from("/data/in.json"))
        );

        let err = SourceDescriptor::resolve(&config, &NoVariables).unwrap_err();
        assert!(matches!(err, AcquisitionError::UnknownVariable(v) if v == "User::Path"));
    }

    #[test]
    fn test_open_local_file_from_start() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, br#"{"id": 1}"#).unwrap();

        let acquirer = Acquirer::new(&NoVariables, &NoDownloader);
        let mut stream = acquirer
            .acquire(&Configuration::for_file(path.to_string_lossy()))
            .unwrap();

        let mut content = String::new();
        stream.read_to_string(&mut content).unwrap();
        assert_eq!(content, r#"{"id": 1}"#);
        assert!(!stream.is_download());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = open_file(&path).err().unwrap();
        assert!(matches!(err, AcquisitionError::NotFound(p) if p == path));
    }

    #[test]
    fn test_download_into_custom_dir_is_cleaned_up() {
        let dir = tempdir().unwrap();
        let config =
            Configuration::for_url("http://example.com/feed.json").with_temp_dir(dir.path());
        let downloader = StaticDownloader(r#"[{"id": 1}]"#);

        let mut stream = Acquirer::new(&NoVariables, &downloader)
            .acquire(&config)
            .unwrap();
        let downloaded = stream.path().to_path_buf();
        assert!(stream.is_download());
        assert!(downloaded.starts_with(dir.path()));

        let mut content = String::new();
        stream.read_to_string(&mut content).unwrap();
        assert_eq!(content, r#"[{"id": 1}]"#);

        drop(stream);
        assert!(!downloaded.exists());
    }

    #[test]
    fn test_missing_custom_temp_dir_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let config = Configuration::for_url("http://example.com/feed.json").with_temp_dir(&missing);

        let err = Acquirer::new(&NoVariables, &StaticDownloader("{}"))
            .acquire(&config)
            .err()
            .unwrap();
        assert!(matches!(err, AcquisitionError::TempDir(p) if p == missing));
    }

    #[test]
    fn test_default_temp_dir() {
        assert_eq!(resolve_temp_dir(None).unwrap(), std::env::temp_dir());
        assert_eq!(resolve_temp_dir(Some(Path::new(""))).unwrap(), std::env::temp_dir());
    }

    #[test]
    fn test_unreachable_url() {
        let dir = tempdir().unwrap();
        let config =
            Configuration::for_url("http://example.com/feed.json").with_temp_dir(dir.path());
        let err = Acquirer::new(&NoVariables, &NoDownloader)
            .acquire(&config)
            .err()
            .unwrap();
        assert!(matches!(err, AcquisitionError::Unreachable { .. }));
        // the failed download leaves nothing behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

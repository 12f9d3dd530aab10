//! Whole-document JSON persistence.
//!
//! Every stateful component owns one [`JsonFile`] and rewrites the full
//! document on each mutation. Writes go to a temporary sibling first and
//! are renamed into place, so a crash mid-write leaves the previous
//! document intact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct JsonFile {
    name: String,
    path: PathBuf,
}

impl JsonFile {
    /// Binds `<dir>/<name>.json`. Nothing touches the disk until the first
    /// `load` or `save`.
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        Self {
            name: name.to_owned(),
            path: dir.as_ref().join(format!("{name}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document, falling back to `T::default()` when the file is
    /// missing or unreadable.
    pub fn load<T: DeserializeOwned + Default>(&self) -> T {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
            Err(e) => {
                tracing::error!(file = %self.path.display(), "failed to read document: {e}");
                return T::default();
            }
        };

        if raw.is_empty() {
            return T::default();
        }

        match serde_json::from_slice(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!(file = %self.path.display(), "corrupt document, starting empty: {e}");
                T::default()
            }
        }
    }

    pub fn save<T: Serialize>(&self, doc: &T) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(doc).map_err(|source| StoreError::Encode {
            name: self.name.clone(),
            source,
        })?;

        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(write_err)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).map_err(write_err)?;
        file.write_all(&data).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(write_err)?;

        Ok(())
    }

    /// `save` for callers that treat persistence as best-effort: the
    /// failure is logged and the in-memory state stays authoritative.
    pub fn save_or_log<T: Serialize>(&self, doc: &T) {
        if let Err(e) = self.save(doc) {
            tracing::error!(document = %self.name, "persist failed: {e}");
        }
    }
}

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Whole-blob storage keyed by file name.
pub trait BlobStore {
    /// Returns `None` when nothing is stored under `name`.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Replaces the blob stored under `name`.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;
}

/// Reads and parses a JSON blob, see [`BlobStore::read`].
///
/// A blob that exists but does not parse is [`Error::Corrupt`].
pub fn load_json<T: DeserializeOwned>(store: &dyn BlobStore, name: &str) -> Result<Option<T>> {
    let Some(bytes) = store.read(name)? else {
        return Ok(None);
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| Error::Corrupt {
            name: name.to_string(),
            source,
        })
}

pub fn save_json<T: Serialize + ?Sized>(store: &dyn BlobStore, name: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value).map_err(io::Error::from)?;
    store.write(name, &bytes)
}

/// Files in one directory, replaced atomically on write.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl BlobStore for FileStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(name);

        // NamedTempFile is created with 0600 on unix
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(bytes)?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|err| err.error)?;

        debug!(path = %path.display(), "saved");
        Ok(())
    }
}

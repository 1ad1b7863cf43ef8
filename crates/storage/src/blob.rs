//! Blob stores: in-memory and filesystem-backed
//!
//! Both assign a fresh `BlobHandle` on every `put`; payloads are never
//! deduplicated, so each batch owns exactly one blob.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use annostore_core::{BlobHandle, BlobStore, Error, Result};

// =============================================================================
// InMemoryBlobStore
// =============================================================================

/// Blob store held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<BlobHandle, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// True if no blobs are stored
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<BlobHandle> {
        let handle = BlobHandle::new();
        self.blobs.write().insert(handle, bytes.to_vec());
        Ok(handle)
    }

    fn get(&self, handle: &BlobHandle) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .get(handle)
            .cloned()
            .ok_or(Error::BlobNotFound(*handle))
    }

    fn exists(&self, handle: &BlobHandle) -> Result<bool> {
        Ok(self.blobs.read().contains_key(handle))
    }

    fn delete(&self, handle: &BlobHandle) -> Result<()> {
        self.blobs.write().remove(handle);
        Ok(())
    }

    fn handles(&self) -> Result<Vec<BlobHandle>> {
        Ok(self.blobs.read().keys().copied().collect())
    }
}

// =============================================================================
// FsBlobStore
// =============================================================================

/// File extension for stored payloads
const BLOB_EXTENSION: &str = "blob";

/// Blob store writing one file per payload under `<root>/<namespace>/`
///
/// Writes go to a temporary file in the same directory and are renamed
/// into place, so a reader never observes a partially written blob.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    /// Open (creating if needed) the namespace directory under `root`
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace is empty or contains a path
    /// separator, or if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>, namespace: &str) -> Result<Self> {
        let has_separator = namespace.contains(|c: char| c == '/' || c == '\\');
        if namespace.is_empty() || has_separator || namespace == ".." {
            return Err(Error::BackendFailure(format!(
                "invalid blob namespace '{namespace}'"
            )));
        }
        let dir = root.as_ref().join(namespace);
        fs::create_dir_all(&dir)?;
        debug!(target: "annostore::storage", dir = %dir.display(), "Opened blob namespace");
        Ok(Self { dir })
    }

    /// Directory holding this namespace's blobs
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, handle: &BlobHandle) -> PathBuf {
        self.dir.join(format!("{handle}.{BLOB_EXTENSION}"))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<BlobHandle> {
        let handle = BlobHandle::new();
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));
        if let Err(e) = write_atomically(&tmp, &self.path_for(&handle), bytes) {
            warn!(target: "annostore::storage", error = %e, "Blob write failed");
            return Err(e.into());
        }
        Ok(handle)
    }

    fn get(&self, handle: &BlobHandle) -> Result<Vec<u8>> {
        match fs::read(self.path_for(handle)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::BlobNotFound(*handle)),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, handle: &BlobHandle) -> Result<bool> {
        Ok(self.path_for(handle).is_file())
    }

    fn delete(&self, handle: &BlobHandle) -> Result<()> {
        match fs::remove_file(self.path_for(handle)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn handles(&self) -> Result<Vec<BlobHandle>> {
        let mut handles = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(BLOB_EXTENSION) {
                continue;
            }
            if let Some(handle) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(BlobHandle::parse)
            {
                handles.push(handle);
            }
        }
        Ok(handles)
    }
}

/// Write `bytes` to `tmp`, then rename it onto `dest`
///
/// On failure the temp file is removed; handles() never sees it, so a
/// leftover would never be swept.
fn write_atomically(tmp: &Path, dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let written = fs::File::create(tmp)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(tmp, dest));
    if written.is_err() {
        let _ = fs::remove_file(tmp);
    }
    written
}

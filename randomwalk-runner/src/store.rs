//! Artifact stores.
//!
//! The only coordination between workers (and between machines) is the set
//! of uniquely keyed artifacts in a shared namespace. A store therefore needs
//! just two things: write one artifact, count the artifacts in a namespace.
//!
//! - `FsArtifactStore`: one directory per namespace, one `{name}.csv` file
//!   per artifact. Writes land in a temp file and are renamed into place so a
//!   concurrent count never sees a half-written artifact.
//! - `InMemoryArtifactStore`: a mutex-guarded map, for tests and dry runs.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use randomwalk_core::domain::is_file_safe_symbol;
use thiserror::Error;

use crate::artifact::ArtifactKey;

const ARTIFACT_EXT: &str = "csv";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("write {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("read {key}: {source}")]
    Read {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("list namespace {namespace}: {source}")]
    List {
        namespace: String,
        #[source]
        source: io::Error,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("artifact key {0} does not name a file inside its namespace")]
    InvalidKey(String),
}

/// Shared artifact namespace.
pub trait ArtifactStore: Send + Sync {
    /// Write one artifact, replacing any previous artifact under the same key.
    fn put(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<(), StoreError>;

    fn get(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>, StoreError>;

    /// Artifact names in `namespace`, sorted.
    fn list(&self, namespace: &str) -> Result<Vec<String>, StoreError>;

    /// Number of artifacts in `namespace`. A namespace that was never written
    /// to has zero artifacts.
    fn count(&self, namespace: &str) -> Result<usize, StoreError> {
        Ok(self.list(namespace)?.len())
    }
}

// ─── Filesystem ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(namespace)
    }

    /// File holding `key`. Keys whose namespace or name carry a path
    /// separator or `..` are refused.
    pub fn path_for(&self, key: &ArtifactKey) -> Result<PathBuf, StoreError> {
        if !is_file_safe_symbol(&key.namespace) || !is_file_safe_symbol(&key.name) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self
            .namespace_dir(&key.namespace)
            .join(format!("{}.{ARTIFACT_EXT}", key.name)))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn put(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            key: key.to_string(),
            source,
        };

        let path = self.path_for(key)?;
        std::fs::create_dir_all(self.namespace_dir(&key.namespace)).map_err(write_err)?;
        let tmp = path.with_extension(format!("{ARTIFACT_EXT}.tmp"));
        std::fs::write(&tmp, bytes).map_err(write_err)?;
        std::fs::rename(&tmp, &path).map_err(write_err)
    }

    fn get(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>, StoreError> {
        match std::fs::read(self.path_for(key)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn list(&self, namespace: &str) -> Result<Vec<String>, StoreError> {
        let list_err = |source| StoreError::List {
            namespace: namespace.to_string(),
            source,
        };

        if !is_file_safe_symbol(namespace) {
            return Err(StoreError::InvalidKey(namespace.to_string()));
        }
        let entries = match std::fs::read_dir(self.namespace_dir(namespace)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(list_err(source)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(list_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

// ─── In-memory ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    artifacts: Mutex<BTreeMap<ArtifactKey, Vec<u8>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<ArtifactKey, Vec<u8>>> {
        self.artifacts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Total artifacts across every namespace.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn put(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<(), StoreError> {
        self.lock().insert(key.clone(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &ArtifactKey) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    fn list(&self, namespace: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lock()
            .keys()
            .filter(|k| k.namespace == namespace)
            .map(|k| k.name.clone())
            .collect())
    }
}

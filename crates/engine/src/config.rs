//! Engine configuration via `annostore.toml`
//!
//! Collection names and the blob namespace are explicit values handed to
//! the engine at construction; nothing in the storage path looks them up
//! globally.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use annostore_core::{Error, Result, StorageScope};

/// Config file name expected next to the data directory.
pub const CONFIG_FILE_NAME: &str = "annostore.toml";

// ============================================================================
// StorageCollections
// ============================================================================

/// Mapping from storage tier to the collection that backs it
///
/// An operation targeting a tier with no binding fails with
/// `StorageNotConfigured` before any store call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageCollections {
    record: Option<String>,
    batch: Option<String>,
}

impl StorageCollections {
    /// No tiers bound
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the record tier
    pub fn with_record(mut self, collection: impl Into<String>) -> Self {
        self.record = Some(collection.into());
        self
    }

    /// Bind the batch tier (metadata records)
    pub fn with_batch(mut self, collection: impl Into<String>) -> Self {
        self.batch = Some(collection.into());
        self
    }

    /// Collection for a single tier
    ///
    /// # Errors
    ///
    /// `UnsupportedStorageScope` for `All` (it names two collections),
    /// `StorageNotConfigured` if the tier is unbound.
    pub fn collection(&self, scope: StorageScope) -> Result<&str> {
        let bound = match scope {
            StorageScope::Record => self.record.as_deref(),
            StorageScope::Batch => self.batch.as_deref(),
            StorageScope::All => return Err(Error::UnsupportedStorageScope(scope.to_string())),
        };
        bound.ok_or(Error::StorageNotConfigured(scope))
    }

    /// Check that every tier the scope fans out to is bound
    ///
    /// # Errors
    ///
    /// `StorageNotConfigured` naming the first unbound tier.
    pub fn require(&self, scope: StorageScope) -> Result<()> {
        for tier in scope.tiers() {
            self.collection(*tier)?;
        }
        Ok(())
    }
}

// ============================================================================
// EngineConfig
// ============================================================================

/// Collection names for the two tiers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionsConfig {
    /// Collection holding one record per annotation
    #[serde(default = "default_record_collection")]
    pub record: String,
    /// Collection holding batch metadata records
    #[serde(default = "default_batch_collection")]
    pub batch: String,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            record: default_record_collection(),
            batch: default_batch_collection(),
        }
    }
}

fn default_record_collection() -> String {
    "human_annotations".to_string()
}

fn default_batch_collection() -> String {
    "batch_annotations".to_string()
}

/// Where batch payloads live
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlobConfig {
    /// Root directory for filesystem blob stores
    #[serde(default = "default_blob_root")]
    pub root: PathBuf,
    /// Namespace (subdirectory) under the root
    #[serde(default = "default_blob_namespace")]
    pub namespace: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            root: default_blob_root(),
            namespace: default_blob_namespace(),
        }
    }
}

fn default_blob_root() -> PathBuf {
    PathBuf::from("blobs")
}

fn default_blob_namespace() -> String {
    "annotations".to_string()
}

/// Engine configuration loaded from `annostore.toml`.
///
/// # Example
///
/// ```toml
/// [collections]
/// record = "human_annotations"
/// batch = "batch_annotations"
///
/// [blob]
/// root = "blobs"
/// namespace = "annotations"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Collection bindings
    #[serde(default)]
    pub collections: CollectionsConfig,
    /// Blob store location
    #[serde(default)]
    pub blob: BlobConfig,
}

impl EngineConfig {
    /// Check names for emptiness and the two tiers for collisions.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.collections.record.trim().is_empty() {
            return Err(Error::InvalidConfig("collections.record must not be empty".into()));
        }
        if self.collections.batch.trim().is_empty() {
            return Err(Error::InvalidConfig("collections.batch must not be empty".into()));
        }
        if self.collections.record == self.collections.batch {
            return Err(Error::InvalidConfig(format!(
                "record and batch tiers must use different collections, both are '{}'",
                self.collections.record
            )));
        }
        if self.blob.namespace.trim().is_empty() {
            return Err(Error::InvalidConfig("blob.namespace must not be empty".into()));
        }
        Ok(())
    }

    /// Collection bindings for `AnnotationEngine::new`
    pub fn storage_collections(&self) -> StorageCollections {
        StorageCollections::new()
            .with_record(self.collections.record.clone())
            .with_batch(self.collections.batch.clone())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Annotation store configuration

[collections]
# One record per annotation (small, frequently mutated sets)
record = "human_annotations"
# One metadata record per batch (large, write-once sets)
batch = "batch_annotations"

[blob]
# Batch payloads are written under <root>/<namespace>/
root = "blobs"
namespace = "annotations"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::InvalidConfig(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

//! Annotation-level types: storage scopes, batch formats and batch shapes
//!
//! Scopes and formats are closed enums. Values arriving from outside
//! (legacy numeric codes or names) are converted with `TryFrom<i64>` or
//! `FromStr`, which reject anything outside the set.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::types::Document;

// =============================================================================
// StorageScope
// =============================================================================

/// Which tier(s) an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageScope {
    /// Both tiers; valid for reads and deletes only
    All,
    /// One stored record per annotation
    Record,
    /// Annotations grouped into a blob plus a metadata record
    Batch,
}

impl StorageScope {
    /// The concrete tiers this scope fans out to
    pub fn tiers(self) -> &'static [StorageScope] {
        match self {
            StorageScope::All => &[StorageScope::Record, StorageScope::Batch],
            StorageScope::Record => &[StorageScope::Record],
            StorageScope::Batch => &[StorageScope::Batch],
        }
    }

    /// True if this scope includes the record tier
    pub fn includes_record(self) -> bool {
        matches!(self, StorageScope::All | StorageScope::Record)
    }

    /// True if this scope includes the batch tier
    pub fn includes_batch(self) -> bool {
        matches!(self, StorageScope::All | StorageScope::Batch)
    }
}

impl fmt::Display for StorageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageScope::All => write!(f, "all"),
            StorageScope::Record => write!(f, "record"),
            StorageScope::Batch => write!(f, "batch"),
        }
    }
}

impl TryFrom<i64> for StorageScope {
    type Error = Error;

    fn try_from(code: i64) -> Result<Self, Error> {
        match code {
            0 => Ok(StorageScope::All),
            1 => Ok(StorageScope::Record),
            2 => Ok(StorageScope::Batch),
            other => Err(Error::UnsupportedStorageScope(other.to_string())),
        }
    }
}

impl FromStr for StorageScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(StorageScope::All),
            "record" | "human" => Ok(StorageScope::Record),
            "batch" => Ok(StorageScope::Batch),
            _ => Err(Error::UnsupportedStorageScope(s.to_string())),
        }
    }
}

// =============================================================================
// BatchFormat
// =============================================================================

/// Wire shape of a submitted or returned set of annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchFormat {
    /// `{data: [...]}`
    #[default]
    Basic,
    /// `{common: {...}, data: [...]}`; `common` applies to every element
    Compact,
}

impl fmt::Display for BatchFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchFormat::Basic => write!(f, "basic"),
            BatchFormat::Compact => write!(f, "compact"),
        }
    }
}

impl TryFrom<i64> for BatchFormat {
    type Error = Error;

    fn try_from(code: i64) -> Result<Self, Error> {
        match code {
            0 => Ok(BatchFormat::Basic),
            1 => Ok(BatchFormat::Compact),
            other => Err(Error::UnsupportedBatchFormat(other.to_string())),
        }
    }
}

impl FromStr for BatchFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(BatchFormat::Basic),
            "compact" => Ok(BatchFormat::Compact),
            _ => Err(Error::UnsupportedBatchFormat(s.to_string())),
        }
    }
}

// =============================================================================
// Batch shapes
// =============================================================================

/// A submitted set of annotations
///
/// `data` is absent when the caller sent no element sequence at all; the
/// engine treats that as a no-op rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchInput {
    /// Fields copied onto every element (compact format only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common: Option<Document>,
    /// The annotations themselves
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
}

impl BatchInput {
    /// Basic-format batch from a list of elements
    pub fn basic(data: Vec<Value>) -> Self {
        Self {
            common: None,
            data: Some(data),
        }
    }

    /// Compact-format batch from common fields and elements
    pub fn compact(common: Document, data: Vec<Value>) -> Self {
        Self {
            common: Some(common),
            data: Some(data),
        }
    }

    /// Parse a batch from its JSON wire form
    pub fn from_json(value: Value) -> crate::error::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Result of a read: `{data: [...]}`, plus `common` in compact format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSet {
    /// Fields shared by every element (compact format only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common: Option<Document>,
    /// The annotations
    pub data: Vec<Value>,
}

impl AnnotationSet {
    /// An empty result
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of annotations in the set
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the set holds no annotations
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

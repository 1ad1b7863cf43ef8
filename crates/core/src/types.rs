//! Core types for the annotation store
//!
//! This module defines the foundational types:
//! - ObjectId: the document store's 12-byte unique identifier
//! - BlobHandle: opaque reference to a payload in the blob store
//! - Document: a JSON object as stored in a collection
//! - Reserved field names shared by the engine and the stores

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A JSON object as stored in, or returned from, a collection
pub type Document = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Reserved field names
// =============================================================================

/// Back-reference from an annotation (or batch metadata record) to its document
pub const DOC_ID_FIELD: &str = "doc_id";
/// Blob handle field on a batch metadata record
pub const BLOB_HANDLE_FIELD: &str = "file_fs_id_batch";
/// Identifier field assigned by the document store
pub const STORE_ID_FIELD: &str = "_id";
/// Identifier field exposed to callers
pub const PUBLIC_ID_FIELD: &str = "id";
/// Field every annotation must carry
pub const CONTEXT_FIELD: &str = "@context";

/// Fields a caller-supplied selector may not constrain directly
pub const RESERVED_SELECTOR_FIELDS: [&str; 2] = [DOC_ID_FIELD, BLOB_HANDLE_FIELD];

// =============================================================================
// ObjectId
// =============================================================================

/// Per-process random component, fixed for the lifetime of the process
static PROCESS_UNIQUE: Lazy<[u8; 5]> = Lazy::new(rand::random);

/// Rolling counter, seeded randomly so restarts do not replay ids
static COUNTER: Lazy<AtomicU32> = Lazy::new(|| AtomicU32::new(rand::random::<u32>() & 0x00FF_FFFF));

/// Unique identifier in the document store's format
///
/// Twelve bytes: a 4-byte big-endian timestamp (seconds), a 5-byte
/// per-process random value and a 3-byte big-endian counter. Rendered as
/// 24 lowercase hex characters.
///
/// Ids generated by one process sort in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generate a fresh id
    pub fn new() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let count = COUNTER.fetch_add(1, Ordering::SeqCst) & 0x00FF_FFFF;

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..4]);
        Self(bytes)
    }

    /// Create an ObjectId from raw bytes
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes of this ObjectId
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Parse an id from its 24-character hex form
    ///
    /// Returns None if the string is not exactly 24 hex digits.
    pub fn parse(s: &str) -> Option<Self> {
        let raw = s.as_bytes();
        if raw.len() != 24 {
            return None;
        }
        let mut bytes = [0u8; 12];
        for (i, pair) in raw.chunks_exact(2).enumerate() {
            let hi = hex_value(pair[0])?;
            let lo = hex_value(pair[1])?;
            bytes[i] = (hi << 4) | lo;
        }
        Some(Self(bytes))
    }

    /// Hex form of the id
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidIdentifier(s.to_string()))
    }
}

impl Serialize for ObjectId {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid object id: {s}")))
    }
}

// =============================================================================
// BlobHandle
// =============================================================================

/// Opaque reference to a payload in the blob store
///
/// Handles are UUID v4 values; the blob store assigns them on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobHandle(Uuid);

impl BlobHandle {
    /// Create a new random handle
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a handle from its string form
    ///
    /// Returns None if the string is not a valid UUID.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for BlobHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BlobHandle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidIdentifier(s.to_string()))
    }
}

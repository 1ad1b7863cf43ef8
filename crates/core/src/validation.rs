//! Identifier validation
//!
//! Checks shape only: a well-formed id is not necessarily one that exists.

use crate::error::{Error, Result};
use crate::types::ObjectId;

/// True iff `s` is in the document store's unique-identifier format
pub fn is_valid_id(s: &str) -> bool {
    ObjectId::parse(s).is_some()
}

/// Validate a list of document ids
///
/// Fails with `InvalidIdentifier` if the list is empty or on the first
/// id that is not well-formed.
pub fn validate_document_id_list<S: AsRef<str>>(ids: &[S]) -> Result<()> {
    if ids.is_empty() {
        return Err(Error::InvalidIdentifier("empty document id list".to_string()));
    }
    match ids.iter().find(|id| !is_valid_id(id.as_ref())) {
        Some(bad) => Err(Error::InvalidIdentifier(bad.as_ref().to_string())),
        None => Ok(()),
    }
}

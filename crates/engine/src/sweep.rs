//! Orphaned-blob reconciliation
//!
//! A crash between the blob write and the metadata write of a batch create
//! leaves a blob that no metadata record references. Nothing in the normal
//! write or delete paths finds these. The sweep here compares the blob
//! store's contents against the handles referenced by batch metadata.
//!
//! The sweep is never run automatically. Run it out of band, while no batch
//! creates are in flight: a blob staged by a create that has not yet
//! committed its metadata looks exactly like an orphan.

use std::collections::HashSet;

use tracing::{info, warn};

use annostore_core::{BlobHandle, Result, Selector};

use crate::batch_tier::blob_handle_of;
use crate::engine::AnnotationEngine;

impl AnnotationEngine {
    /// Blobs that no batch metadata record references
    ///
    /// # Errors
    ///
    /// `StorageNotConfigured` if the batch tier is unbound, or any store error.
    pub fn find_orphaned_blobs(&self) -> Result<Vec<BlobHandle>> {
        let tier = self.batch_tier()?;
        let referenced: HashSet<BlobHandle> = tier
            .find_many(&Selector::new())?
            .iter()
            .filter_map(blob_handle_of)
            .collect();
        let orphans: Vec<BlobHandle> = tier
            .blob_handles()?
            .into_iter()
            .filter(|handle| !referenced.contains(handle))
            .collect();
        info!(target: "annostore::batch", referenced = referenced.len(), orphans = orphans.len(), "Scanned for orphaned blobs");
        Ok(orphans)
    }

    /// Delete every orphaned blob; returns how many were removed
    ///
    /// Individual delete failures are logged and skipped.
    pub fn sweep_orphaned_blobs(&self) -> Result<usize> {
        let tier = self.batch_tier()?;
        let mut removed = 0;
        for handle in self.find_orphaned_blobs()? {
            match tier.delete_blob(&handle) {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(target: "annostore::batch", %handle, error = %e, "Failed to delete orphaned blob")
                }
            }
        }
        info!(target: "annostore::batch", removed, "Swept orphaned blobs");
        Ok(removed)
    }
}

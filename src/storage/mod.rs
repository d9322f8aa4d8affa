//!
//! pantry storage module
//! ---------------------
//! The shared list lives as one JSON document (an array of entries) in an
//! external object store. This module defines the document model, the
//! `DocumentStore` contract, and its implementations: S3 for production and
//! an in-memory store for the test suites.
//!
//! The contract's one non-negotiable property is the conditional write: a
//! writer submits the version it read, and the store applies the write only
//! if that is still the current version. That store-side check is the sole
//! synchronization point for concurrent appends. Nothing in-process locks
//! the document, because other service instances may be writing too, and an
//! unconditional overwrite is not exposed on any mutation path.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::Principal;

pub mod memory;
pub mod s3;

pub use memory::InMemoryDocumentStore;
pub use s3::S3DocumentStore;

/// Opaque concurrency token: an ETag in S3, a counter in memory. Callers
/// pass it back unchanged and never inspect it; it changes on every
/// successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocVersion(String);

impl DocVersion {
    pub fn new<S: Into<String>>(v: S) -> Self {
        DocVersion(v.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One appended entry. The serde names are the wire and storage format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListItem {
    pub item: String,
    pub by: Principal,
    pub at: DateTime<Utc>,
}

/// The document as observed by a read: ordered items plus the version that
/// read saw. `version` is `None` when the document does not exist yet.
#[derive(Debug, Clone, Default)]
pub struct ListDocument {
    pub items: Vec<ListItem>,
    pub version: Option<DocVersion>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored version moved between a read and the conditional write.
    /// Always consumed by the append retry loop; service callers never see
    /// this variant.
    #[error("version conflict on '{key}'")]
    VersionConflict { key: String },
    #[error("malformed stored document: {0}")]
    Malformed(String),
    #[error("object store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the document at `key`. An absent key is not an error: it yields
    /// an empty document with no version and `exists = false`.
    async fn read(&self, key: &str) -> StoreResult<(ListDocument, bool)>;

    /// Write `items` as the complete document body, but only if the stored
    /// version still equals `expected`; `None` means the key must not exist
    /// yet. Returns the new version on success, `VersionConflict` otherwise,
    /// without applying anything.
    async fn write_if_version_matches(
        &self,
        key: &str,
        items: &[ListItem],
        expected: Option<&DocVersion>,
    ) -> StoreResult<DocVersion>;
}

pub(crate) fn encode_items(items: &[ListItem]) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(items).map_err(|e| StoreError::Malformed(e.to_string()))
}

pub(crate) fn decode_items(bytes: &[u8]) -> StoreResult<Vec<ListItem>> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Malformed(e.to_string()))
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod storage_tests;

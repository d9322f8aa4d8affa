//! In-memory `DocumentStore` with the same conditional-write semantics as
//! the S3 client. Versions are a monotonic counter per key. Used by the
//! test suites; also handy for running the server without any cloud at all.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    decode_items, encode_items, DocVersion, DocumentStore, ListDocument, ListItem, StoreError,
    StoreResult,
};

struct Slot {
    bytes: Vec<u8>,
    version: u64,
}

#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    map: Arc<Mutex<HashMap<String, Slot>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored bytes and version counter for `key`, for tests asserting a
    /// failed operation left the document untouched.
    pub fn raw(&self, key: &str) -> Option<(Vec<u8>, u64)> {
        self.map.lock().get(key).map(|s| (s.bytes.clone(), s.version))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn read(&self, key: &str) -> StoreResult<(ListDocument, bool)> {
        let map = self.map.lock();
        match map.get(key) {
            Some(slot) => {
                let items = decode_items(&slot.bytes)?;
                let version = Some(DocVersion::new(slot.version.to_string()));
                Ok((ListDocument { items, version }, true))
            }
            None => Ok((ListDocument::default(), false)),
        }
    }

    async fn write_if_version_matches(
        &self,
        key: &str,
        items: &[ListItem],
        expected: Option<&DocVersion>,
    ) -> StoreResult<DocVersion> {
        let bytes = encode_items(items)?;
        let mut map = self.map.lock();
        // Check-and-swap under one lock: this models the store-side
        // atomicity of a conditional PUT.
        let matches = match (map.get(key), expected) {
            (Some(slot), Some(v)) => slot.version.to_string() == v.as_str(),
            (None, None) => true,
            _ => false,
        };
        if !matches {
            return Err(StoreError::VersionConflict { key: key.to_string() });
        }
        let slot = map.entry(key.to_string()).or_insert(Slot { bytes: Vec::new(), version: 0 });
        slot.version += 1;
        slot.bytes = bytes;
        Ok(DocVersion::new(slot.version.to_string()))
    }
}

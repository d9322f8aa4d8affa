//! The list service: composes per-request authorization state with the
//! read-modify-write protocol over the shared document. This is the only
//! component that mutates the list, and it only ever does so through the
//! store's conditional write.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::authz::GroupMembership;
use crate::error::{AppError, AppResult};
use crate::identity::Principal;
use crate::storage::{DocumentStore, ListItem, StoreError};

/// Bounds for the append retry loop. Attempts are capped so sustained
/// contention surfaces to the caller instead of spinning forever.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 4, base_backoff: Duration::from_millis(25) }
    }
}

impl RetryConfig {
    /// Exponential backoff with random jitter so retrying writers fall out
    /// of lockstep.
    fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_backoff.as_millis() as u64 * (1u64 << attempt.min(6));
        let mut buf = [0u8; 1];
        let _ = getrandom::getrandom(&mut buf);
        let jitter = u64::from(buf[0]) % (base / 2 + 1);
        Duration::from_millis(base + jitter)
    }
}

pub struct ListService {
    store: Arc<dyn DocumentStore>,
    key: String,
    write_role: String,
    retry: RetryConfig,
}

impl ListService {
    pub fn new<K, R>(store: Arc<dyn DocumentStore>, key: K, write_role: R) -> Self
    where
        K: Into<String>,
        R: Into<String>,
    {
        Self { store, key: key.into(), write_role: write_role.into(), retry: RetryConfig::default() }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Current items in append order. An absent document reads as empty.
    pub async fn get_list(&self) -> AppResult<Vec<ListItem>> {
        let (doc, _exists) = self.store.read(&self.key).await.map_err(map_store_err)?;
        Ok(doc.items)
    }

    /// Append one item on behalf of `principal`. Requires the write role in
    /// the caller's freshly resolved membership.
    ///
    /// Protocol: read the document with its version, append, then write
    /// conditionally on that version. When another writer got there first
    /// the store rejects the write and the whole cycle restarts from a fresh
    /// read, so the item lands on top of whatever the current state is and
    /// neither writer's entry is lost. Attempts are bounded; exhaustion is
    /// reported as `Conflict`.
    pub async fn append_item<S: Into<String>>(
        &self,
        principal: &Principal,
        groups: &GroupMembership,
        item_text: S,
    ) -> AppResult<Vec<ListItem>> {
        if !groups.allows(&self.write_role) {
            return Err(AppError::forbidden(format!("requires role '{}'", self.write_role)));
        }
        let item_text = item_text.into();

        for attempt in 0..self.retry.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry.backoff_for_attempt(attempt - 1)).await;
            }

            let (doc, exists) = self.store.read(&self.key).await.map_err(map_store_err)?;
            let mut items = doc.items;
            items.push(ListItem {
                item: item_text.clone(),
                by: principal.clone(),
                at: Utc::now(),
            });
            let expected = if exists { doc.version } else { None };

            match self.store.write_if_version_matches(&self.key, &items, expected.as_ref()).await {
                Ok(_new_version) => {
                    debug!("append by {} landed on attempt {}", principal, attempt + 1);
                    return Ok(items);
                }
                Err(StoreError::VersionConflict { .. }) => {
                    debug!(
                        "append attempt {}/{} lost the version race, retrying",
                        attempt + 1,
                        self.retry.max_attempts
                    );
                    continue;
                }
                Err(e) => return Err(map_store_err(e)),
            }
        }

        warn!(
            "append by {} gave up after {} contended attempts on '{}'",
            principal, self.retry.max_attempts, self.key
        );
        Err(AppError::conflict("list is contended, try again"))
    }
}

fn map_store_err(e: StoreError) -> AppError {
    match e {
        // A conflict reaching this mapper escaped the retry loop; report it
        // as contention, not an internal failure.
        StoreError::VersionConflict { .. } => AppError::conflict("list is contended, try again"),
        StoreError::Malformed(m) => AppError::storage_unavailable(m),
        StoreError::Unavailable(m) => AppError::storage_unavailable(m),
    }
}

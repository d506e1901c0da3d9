//! `ExternalStorage` — decides when a payload is large enough to offload
//! and materializes it back on demand.

use crate::store::{Payload, PayloadRef, PayloadStore, StoreError};
use bytes::Bytes;
use std::sync::Arc;

/// Wraps an optional [`PayloadStore`] and a size threshold, turning large
/// in-memory bodies into [`Payload::Stored`] references and back.
///
/// Grounded on spec.md §4.5. The "best-effort, never fatal" cleanup
/// policy mirrors `EventListeners::emit`'s treatment of secondary
/// failures elsewhere in this workspace (a panicking listener is caught
/// and logged, never allowed to fail the emitting call).
pub struct ExternalStorage {
    store: Option<Arc<dyn PayloadStore>>,
    threshold: u64,
}

impl ExternalStorage {
    /// No store configured: every payload stays inline regardless of
    /// size, and `materialize`/`cleanup` are no-ops for `Inline` values.
    pub fn disabled() -> Self {
        Self {
            store: None,
            threshold: u64::MAX,
        }
    }

    pub fn new(store: Arc<dyn PayloadStore>, threshold: u64) -> Self {
        Self {
            store: Some(store),
            threshold,
        }
    }

    /// If `bytes` exceeds the threshold and a store is configured, puts
    /// it under a freshly generated key and returns a `Stored` payload;
    /// otherwise returns it unchanged as `Inline`.
    pub async fn maybe_offload(
        &self,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> Result<Payload, StoreError> {
        let Some(store) = &self.store else {
            return Ok(Payload::Inline(bytes));
        };
        if (bytes.len() as u64) <= self.threshold {
            return Ok(Payload::Inline(bytes));
        }

        let key = uuid::Uuid::new_v4().to_string();
        let size = bytes.len() as u64;
        store.put(&key, bytes, content_type).await?;
        Ok(Payload::Stored(PayloadRef {
            store_id: store.store_id().to_string(),
            key,
            size,
            content_type: content_type.map(str::to_string),
        }))
    }

    /// Resolves a payload to bytes. Idempotent: calling it twice on the
    /// same `Stored` payload issues two `get`s but returns the same
    /// bytes each time, since `delete` is a separate, explicit step.
    pub async fn materialize(&self, payload: &Payload) -> Result<Bytes, StoreError> {
        match payload {
            Payload::Inline(bytes) => Ok(bytes.clone()),
            Payload::Stored(reference) => {
                let store = self
                    .store
                    .as_ref()
                    .ok_or_else(|| StoreError::Backend("no payload store configured".to_string()))?;
                store.get(&reference.key).await
            }
        }
    }

    /// Deletes an offloaded payload's backing bytes. A no-op for
    /// `Inline` payloads. Failures are logged, never propagated: per
    /// spec.md §4.5, delete is best-effort.
    pub async fn cleanup(&self, payload: &Payload) {
        if let Payload::Stored(reference) = payload {
            if let Some(store) = &self.store {
                if let Err(_err) = store.delete(&reference.key).await {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(key = %reference.key, "payload cleanup failed, leaving orphaned blob");
                }
            }
        }
    }
}

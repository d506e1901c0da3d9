//! `PayloadStore` capability set.
//!
//! `Payload`/`PayloadRef` themselves live in `offload-core` (so
//! `Request`'s body field can hold one without a circular crate
//! dependency) and are re-exported here for backward-compatible import
//! paths.

use async_trait::async_trait;
use bytes::Bytes;

pub use offload_core::{Payload, PayloadRef};

/// Errors a [`PayloadStore`] adapter raises. Offload/materialize failures
/// surface to the caller; delete failures are handled separately as
/// best-effort by `ExternalStorage`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("payload store has no entry for key {0}")]
    NotFound(String),
    #[error("payload store adapter error: {0}")]
    Backend(String),
}

/// The capability set every storage adapter (file, key-value, object
/// store, relational) implements. Concrete backends are out of scope
/// here — this crate ships only the contract and an in-memory adapter
/// used by tests.
#[async_trait]
pub trait PayloadStore: Send + Sync {
    /// A stable identifier for this store instance, recorded in every
    /// [`PayloadRef`] it produces so a multi-store deployment can route
    /// `get`/`delete` back to the right adapter.
    fn store_id(&self) -> &str;

    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Bytes, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
}

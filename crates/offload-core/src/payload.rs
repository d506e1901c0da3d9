//! Request and response bodies may be held inline or referenced in an
//! external store.
//!
//! Lives here rather than in `offload-storage` so `Request`'s body field
//! can represent a `Stored` reference without `offload-core` depending
//! on `offload-storage` — that dependency runs the other way.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A reference to bytes held by a configured store, sufficient to fetch
/// or delete them later without re-reading the blob itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadRef {
    pub store_id: String,
    pub key: String,
    pub size: u64,
    pub content_type: Option<String>,
}

/// Either the bytes are held in memory, or they live behind a
/// [`PayloadRef`] and must be fetched through a `PayloadStore`
/// (`offload-storage::ExternalStorage::materialize`) before use.
///
/// Grounded on spec.md §3's `Payload` algebraic type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Inline(Bytes),
    Stored(PayloadRef),
}

impl Payload {
    pub fn size(&self) -> u64 {
        match self {
            Payload::Inline(bytes) => bytes.len() as u64,
            Payload::Stored(reference) => reference.size,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, Payload::Stored(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_payload_size_matches_byte_length() {
        let payload = Payload::Inline(Bytes::from_static(b"hello"));
        assert_eq!(payload.size(), 5);
        assert!(!payload.is_stored());
    }

    #[test]
    fn stored_payload_reports_its_recorded_size() {
        let payload = Payload::Stored(PayloadRef {
            store_id: "s3".to_string(),
            key: "abc".to_string(),
            size: 4096,
            content_type: Some("application/octet-stream".to_string()),
        });
        assert_eq!(payload.size(), 4096);
        assert!(payload.is_stored());
    }
}

//! The payload offload contract: `PayloadStore` (what an adapter must
//! implement), `Payload` (the inline-or-stored value), and
//! `ExternalStorage` (the threshold policy that decides when to offload
//! and how to clean up afterward).

mod external;
mod memory;
mod store;

pub use external::ExternalStorage;
pub use memory::InMemoryStore;
pub use store::{Payload, PayloadRef, PayloadStore, StoreError};

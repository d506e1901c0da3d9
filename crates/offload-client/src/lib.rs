//! Per-origin pooled HTTP clients (`ClientPool`) and the transport-level
//! send primitive (`Client`) the processor's redirect loop drives.

mod client;
mod pool;

pub use client::Client;
pub use pool::{ClientPool, Origin, PoolError};

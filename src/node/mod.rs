//! Storage Node Module
//!
//! Durable row storage for exactly one replica.
//!
//! - **`store`**: the `RecordStore` engine (append, scan, temp-then-rename rewrite)
//!   guarded by one reader/writer lock per store.
//! - **`row`**: the line format shared by SQL rows, NoSQL pair rows and the header.
//! - **`service`**: `StorageNode`, which exposes a store through the `RemoteNode` contract.

pub mod row;
pub mod service;
pub mod store;

//! Replicated Partitioned Table Store
//!
//! This library crate holds every component of the store. The binary (`main.rs`)
//! only wires them together and serves the coordinator over HTTP.
//!
//! ## Architecture Modules
//! Leaf to root:
//!
//! - **`node`**: The storage engine. One `RecordStore` file per replica with
//!   reader/writer locking and temp-then-rename rewrites, wrapped by `StorageNode`.
//! - **`transport`**: The remote-call contract (`RemoteNode`), the injected
//!   `ServiceDiscovery` interface, and its in-process and HTTP implementations.
//! - **`partition`**: `PartitionSpec` validation and the `PartitionRouter`
//!   (none / horizontal / vertical).
//! - **`replication`**: `ReplicaSetManager`, which owns a table's replicas, runs its
//!   heartbeat loop, gates writes on liveness and fans operations out.
//! - **`coordinator`**: The client-facing table registry, result cache and HTTP API.
//!
//! Shared pieces live in **`types`** (tables, operations, predicates), **`error`**
//! and **`config`**.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod node;
pub mod partition;
pub mod replication;
pub mod transport;
pub mod types;

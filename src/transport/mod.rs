//! Remote-Call Transport Module
//!
//! Everything between a replica set manager and the storage nodes it drives.
//!
//! ## Core Concepts
//! - **Contract**: `RemoteNode` is the set of calls a node answers (select, insert,
//!   update, delete, their positional variants, heartbeat). Each call fails with a
//!   typed `RemoteCallError`.
//! - **Discovery**: `ServiceDiscovery` is injected into each manager and resolves a
//!   replica id to a handle. `InProcessDiscovery` hands out the nodes themselves;
//!   `HttpDiscovery` binds nodes on a `NodeHost` and hands out `HttpNodeClient`s.
//! - **Failure model**: an unregistered replica and an unreachable one look the same
//!   to the caller, which is what stop/start failure injection relies on.

pub mod client;
pub mod discovery;
pub mod host;
pub mod http_discovery;
pub mod protocol;
pub mod remote;

//! Replication Module
//!
//! Keeps the replicas of every partition of a table in sync and decides when
//! a table must stop accepting writes.
//!
//! ## Core Concepts
//! - **Replica Set**: each partition owns a fixed list of replicas created with the
//!   table. Every replica has its own store; nothing is shared between them.
//! - **Failure Detection**: one heartbeat task per table flips replicas between
//!   `ALIVE` and `DOWN`. Nothing else writes that flag.
//! - **Read-only Degradation**: a write is refused with `CannotWrite` while any
//!   replica of a partition it touches is down. Reads keep working from any alive
//!   replica.

pub mod heartbeat;
pub mod manager;
pub mod types;

#[cfg(test)]
mod tests;

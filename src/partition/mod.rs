//! Partitioning Module
//!
//! Maps a table's rows or columns onto a fixed set of partitions.
//!
//! ## Core Concepts
//! - **Spec**: `PartitionSpec` is chosen at table creation (`none`, `horizontal`,
//!   `vertical`) and validated once; an invalid layout never reaches a router.
//! - **Horizontal**: a row lives in `int(key) mod partition_count`, where the key is
//!   the first inserted value or the predicate value.
//! - **Vertical**: each column belongs to exactly one group. An insert becomes one
//!   sub-insert per group; a predicate is evaluated by the group owning its column
//!   (the driver partition).

pub mod router;
pub mod types;

#[cfg(test)]
mod tests;

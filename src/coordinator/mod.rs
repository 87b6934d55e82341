//! Coordinator Module
//!
//! The client-facing side of the store.
//!
//! - **`service`**: `Coordinator`, the `name-KIND` table registry. Validates operations,
//!   dispatches them to the table's `ReplicaSetManager` and maintains the result cache.
//! - **`cache`**: `ResultCache`, last select payload per table, dropped on every write.
//! - **`handlers`** / **`protocol`**: the axum routes and their JSON bodies.

pub mod cache;
pub mod handlers;
pub mod protocol;
pub mod service;

use crate::node::store::StoreError;
use thiserror::Error;

/// Failures surfaced to callers of the coordinator and the replica set manager.
///
/// Per-replica remote-call failures never show up here: they are logged and
/// counted in a `FanOutSummary` instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid table configuration: {0}")]
    Config(String),

    #[error("Table not found: {0}")]
    NotFound(String),

    #[error("Table already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Partition {partition} is read-only: replica {replica} is down")]
    CannotWrite { partition: usize, replica: String },

    #[error("No live replica could serve partition {0}")]
    NoLiveReplica(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Io(e) => Error::Io(e),
            corrupt @ StoreError::Corrupt { .. } => Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                corrupt.to_string(),
            )),
        }
    }
}

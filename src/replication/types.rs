use crate::node::service::StorageNode;
use crate::transport::remote::RemoteCallError;
use crate::types::ReplicaId;

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ReplicaState {
    #[serde(rename = "ALIVE")]
    Alive,
    #[serde(rename = "DOWN")]
    Down,
}

impl fmt::Display for ReplicaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicaState::Alive => write!(f, "ALIVE"),
            ReplicaState::Down => write!(f, "DOWN"),
        }
    }
}

/// One copy of a partition: its identity, the node holding its rows and the
/// liveness flag last observed by the heartbeat loop.
pub struct Replica {
    id: ReplicaId,
    node: Arc<StorageNode>,
    alive: AtomicBool,
}

impl Replica {
    pub fn new(node: Arc<StorageNode>) -> Self {
        Self {
            id: node.id().clone(),
            node,
            alive: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> &ReplicaId {
        &self.id
    }

    pub fn node(&self) -> &Arc<StorageNode> {
        &self.node
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ReplicaState {
        if self.is_alive() {
            ReplicaState::Alive
        } else {
            ReplicaState::Down
        }
    }

    /// Records a heartbeat outcome and returns the previous value.
    pub(crate) fn mark(&self, alive: bool) -> bool {
        self.alive.swap(alive, Ordering::SeqCst)
    }
}

/// Point-in-time view of one replica, as reported by table status.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReplicaStatus {
    pub id: String,
    pub partition: usize,
    pub replica: usize,
    pub state: ReplicaState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaFailure {
    pub replica: String,
    pub error: RemoteCallError,
}

/// Outcome of a write fanned out to one or more replica sets.
///
/// Individual failures never abort the write; they are collected here so
/// callers and tests can see partial replication.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FanOutSummary {
    pub succeeded: usize,
    pub total: usize,
    pub failures: Vec<ReplicaFailure>,
}

impl FanOutSummary {
    pub fn record_success(&mut self) {
        self.succeeded += 1;
        self.total += 1;
    }

    pub fn record_failure(&mut self, replica: &ReplicaId, error: RemoteCallError) {
        self.total += 1;
        self.failures.push(ReplicaFailure {
            replica: replica.to_string(),
            error,
        });
    }

    pub fn merge(&mut self, other: FanOutSummary) {
        self.succeeded += other.succeeded;
        self.total += other.total;
        self.failures.extend(other.failures);
    }

    pub fn is_complete(&self) -> bool {
        self.succeeded == self.total
    }
}

impl fmt::Display for FanOutSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} replicas", self.succeeded, self.total)
    }
}

//! Heartbeat Loop
//!
//! One background task per table probes every replica on a fixed period and
//! is the only writer of the replicas' liveness flags. Each tick probes all
//! replicas concurrently and waits for every probe before the next tick.

use super::types::Replica;
use crate::transport::discovery::ServiceDiscovery;
use crate::transport::remote::RemoteNode;

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawns the loop. It runs until the returned handle is aborted.
pub fn spawn(
    table: String,
    replicas: Vec<Arc<Replica>>,
    discovery: Arc<dyn ServiceDiscovery>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(
            "Heartbeat started for table {} ({} replicas, every {:?})",
            table,
            replicas.len(),
            period
        );

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            join_all(
                replicas
                    .iter()
                    .map(|replica| probe(replica, discovery.as_ref())),
            )
            .await;
        }
    })
}

/// Probes one replica and logs a state transition, never a steady state.
async fn probe(replica: &Replica, discovery: &dyn ServiceDiscovery) {
    let outcome = match discovery.resolve(replica.id()) {
        Ok(node) => node.heartbeat().await,
        Err(e) => Err(e),
    };

    let alive = outcome.is_ok();
    let was_alive = replica.mark(alive);

    match (was_alive, outcome) {
        (true, Err(e)) => {
            tracing::warn!("Replica {} ALIVE -> DOWN: {}", replica.id(), e);
        }
        (false, Ok(())) => {
            tracing::info!("Replica {} DOWN -> ALIVE", replica.id());
        }
        (_, Err(e)) => {
            tracing::trace!("Replica {} still down: {}", replica.id(), e);
        }
        _ => {}
    }
}

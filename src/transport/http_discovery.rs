use super::client::HttpNodeClient;
use super::discovery::ServiceDiscovery;
use super::host::NodeHost;
use super::remote::{RemoteCallError, RemoteNode};
use crate::node::service::StorageNode;
use crate::types::ReplicaId;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Discovery over HTTP: nodes are bound on a `NodeHost` served at `host_addr`
/// and every resolution yields an `HttpNodeClient` pointed at it. Whether the
/// replica is actually bound is only learned by the remote call itself.
pub struct HttpDiscovery {
    host: Arc<NodeHost>,
    base_url: String,
    http_client: reqwest::Client,
    timeout: Duration,
    attempts: usize,
}

impl HttpDiscovery {
    pub fn new(
        host: Arc<NodeHost>,
        host_addr: SocketAddr,
        timeout: Duration,
        attempts: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            host,
            base_url: format!("http://{}", host_addr),
            http_client: reqwest::Client::new(),
            timeout,
            attempts,
        })
    }
}

impl ServiceDiscovery for HttpDiscovery {
    fn register(&self, node: Arc<StorageNode>) {
        self.host.bind(node);
    }

    fn unregister(&self, id: &ReplicaId) -> bool {
        self.host.unbind(&id.to_string())
    }

    fn resolve(&self, id: &ReplicaId) -> Result<Arc<dyn RemoteNode>, RemoteCallError> {
        let client: Arc<dyn RemoteNode> = Arc::new(HttpNodeClient::new(
            self.http_client.clone(),
            &self.base_url,
            &id.to_string(),
            self.timeout,
            self.attempts,
        ));
        Ok(client)
    }
}

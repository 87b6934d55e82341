//! HTTP client side of the storage node contract.

use super::protocol::*;
use super::remote::{RemoteCallError, RemoteNode};
use crate::types::Predicate;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub struct HttpNodeClient {
    http_client: reqwest::Client,
    base_url: String,
    replica_id: String,
    timeout: Duration,
    attempts: usize,
}

impl HttpNodeClient {
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        replica_id: &str,
        timeout: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            replica_id: replica_id.to_string(),
            timeout,
            attempts: attempts.max(1),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        node_url(&self.base_url, &self.replica_id, endpoint)
    }

    async fn post_with_retry<T: Serialize>(
        &self,
        url: String,
        payload: &T,
        attempts: usize,
    ) -> Result<reqwest::Response, RemoteCallError> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .post(url.clone())
                .json(payload)
                .timeout(self.timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(RemoteCallError::Transport(e.to_string()));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(RemoteCallError::Transport(
            "Retry attempts exhausted".to_string(),
        ))
    }

    async fn get_with_retry(
        &self,
        url: String,
        attempts: usize,
    ) -> Result<reqwest::Response, RemoteCallError> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .get(url.clone())
                .timeout(self.timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(RemoteCallError::Transport(e.to_string()));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(RemoteCallError::Transport(
            "Retry attempts exhausted".to_string(),
        ))
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, RemoteCallError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RemoteCallError::NotRegistered(self.replica_id.clone()));
        }
        if !status.is_success() {
            if let Ok(ack) = response.json::<AckResponse>().await
                && let Some(error) = ack.error
            {
                return Err(RemoteCallError::Store(error));
            }
            return Err(RemoteCallError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RemoteCallError::Decode(e.to_string()))
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        endpoint: &str,
        payload: &Req,
    ) -> Result<Resp, RemoteCallError> {
        let response = self
            .post_with_retry(self.url(endpoint), payload, self.attempts)
            .await?;
        self.decode(response).await
    }
}

#[async_trait]
impl RemoteNode for HttpNodeClient {
    async fn select(&self) -> Result<Vec<String>, RemoteCallError> {
        let response = self
            .get_with_retry(self.url(ENDPOINT_SELECT), self.attempts)
            .await?;
        let body: SelectResponse = self.decode(response).await?;
        Ok(body.rows)
    }

    async fn insert(&self, columns: &[String], values: &[String]) -> Result<(), RemoteCallError> {
        let payload = InsertRequest {
            columns: columns.to_vec(),
            values: values.to_vec(),
        };
        let _: AckResponse = self.post(ENDPOINT_INSERT, &payload).await?;
        Ok(())
    }

    async fn update(
        &self,
        columns: &[String],
        values: &[String],
        predicate: &Predicate,
    ) -> Result<Vec<usize>, RemoteCallError> {
        let payload = UpdateRequest {
            columns: columns.to_vec(),
            values: values.to_vec(),
            predicate: predicate.clone(),
        };
        let body: PositionsResponse = self.post(ENDPOINT_UPDATE, &payload).await?;
        Ok(body.positions)
    }

    async fn update_by_positions(
        &self,
        positions: &[usize],
        columns: &[String],
        values: &[String],
    ) -> Result<usize, RemoteCallError> {
        let payload = UpdatePositionsRequest {
            positions: positions.to_vec(),
            columns: columns.to_vec(),
            values: values.to_vec(),
        };
        let body: CountResponse = self.post(ENDPOINT_UPDATE_POSITIONS, &payload).await?;
        Ok(body.count)
    }

    async fn delete(&self, predicate: &Predicate) -> Result<Vec<usize>, RemoteCallError> {
        let payload = DeleteRequest {
            predicate: predicate.clone(),
        };
        let body: PositionsResponse = self.post(ENDPOINT_DELETE, &payload).await?;
        Ok(body.positions)
    }

    async fn delete_by_positions(&self, positions: &[usize]) -> Result<usize, RemoteCallError> {
        let payload = DeletePositionsRequest {
            positions: positions.to_vec(),
        };
        let body: CountResponse = self.post(ENDPOINT_DELETE_POSITIONS, &payload).await?;
        Ok(body.count)
    }

    async fn heartbeat(&self) -> Result<(), RemoteCallError> {
        // A missed beat is reported on the next tick; never retried.
        let response = self.get_with_retry(self.url(ENDPOINT_HEARTBEAT), 1).await?;
        let _: AckResponse = self.decode(response).await?;
        Ok(())
    }
}

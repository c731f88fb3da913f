#![forbid(unsafe_code)]

use std::time::Duration;

use gstate_contracts::wire::{
    BatchGetRequest, BatchGetResponse, DeleteRequest, DeleteResponse, ErrorResponse, GetRequest,
    GetResponse, PutRequest, PutResponse, SeekRequest, SeekResponse, ROUTE_BATCH_GET,
    ROUTE_DELETE, ROUTE_GET, ROUTE_PUT, ROUTE_SEEK, SHARED_SECRET_PARAM,
};
use gstate_storage::{GlobalStateRepo, SeekResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::RemoteOwnerConfig;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request encode failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("remote owner unavailable: {0}")]
    Unavailable(#[source] Box<ureq::Transport>),
    #[error("remote owner answered http {status}: {message}")]
    Status { status: u16, message: String },
    #[error("response decode failed: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Forwards the primitives to the owning instance's handlers. One blocking POST per call;
/// retries are left to the caller.
pub struct RemoteClient {
    agent: ureq::Agent,
    base_url: String,
    shared_secret: String,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RemoteClient {
    pub fn new(config: &RemoteOwnerConfig) -> Self {
        let request_timeout = Duration::from_millis(config.request_timeout_ms);
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_millis(config.connect_timeout_ms))
            .timeout_read(request_timeout)
            .timeout_write(request_timeout)
            .try_proxy_from_env(false)
            .build();
        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            shared_secret: config.shared_secret.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn call<Req, Resp>(&self, route: &'static str, request: &Req) -> Result<Resp, RemoteError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_string(request).map_err(RemoteError::Encode)?;
        let url = format!("{}{}", self.base_url, route);
        debug!(%url, bytes = payload.len(), "forwarding global state call");
        let response = self
            .agent
            .post(&url)
            .query(SHARED_SECRET_PARAM, &self.shared_secret)
            .set("content-type", "application/json")
            .send_string(&payload);
        match response {
            Ok(resp) => serde_json::from_reader(resp.into_reader()).map_err(RemoteError::Decode),
            Err(ureq::Error::Status(status, resp)) => Err(RemoteError::Status {
                status,
                message: error_message_from_body(resp),
            }),
            Err(ureq::Error::Transport(transport)) => {
                Err(RemoteError::Unavailable(Box::new(transport)))
            }
        }
    }
}

fn error_message_from_body(resp: ureq::Response) -> String {
    let body = resp.into_string().unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => err.error,
        Err(_) => body.trim().to_string(),
    }
}

impl GlobalStateRepo for RemoteClient {
    type Error = RemoteError;

    fn get(&self, key: &[u8]) -> Result<Vec<u8>, RemoteError> {
        let resp: GetResponse = self.call(ROUTE_GET, &GetRequest { key: key.to_vec() })?;
        Ok(resp.value)
    }

    fn batch_get(&self, keys: &[Vec<u8>]) -> Result<Vec<Vec<u8>>, RemoteError> {
        let resp: BatchGetResponse = self.call(
            ROUTE_BATCH_GET,
            &BatchGetRequest {
                key_list: keys.to_vec(),
            },
        )?;
        Ok(resp.value_list)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), RemoteError> {
        let _: PutResponse = self.call(
            ROUTE_PUT,
            &PutRequest {
                key: key.to_vec(),
                value: value.to_vec(),
            },
        )?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), RemoteError> {
        let _: DeleteResponse = self.call(ROUTE_DELETE, &DeleteRequest { key: key.to_vec() })?;
        Ok(())
    }

    fn seek(&self, request: &SeekRequest) -> Result<SeekResult, RemoteError> {
        let resp: SeekResponse = self.call(ROUTE_SEEK, request)?;
        Ok(SeekResult {
            keys: resp.keys_found,
            values: resp.vals_found,
        })
    }
}

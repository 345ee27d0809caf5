use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::{BridgeError, WalletBridge};

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    // A null result is a real answer (a not-yet-mined receipt), so this must
    // not collapse into Option.
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC 2.0 over HTTP against the bridge endpoint. This is the desktop
/// analog of the in-page provider object: same method surface, same error
/// codes, reached over a socket instead of an injected global.
pub struct HttpBridge {
    http: Client,
    endpoint: Url,
    next_id: AtomicU64,
}

impl HttpBridge {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: Client::new(),
            endpoint,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl WalletBridge for HttpBridge {
    async fn request(&self, method: &str, params: Value) -> Result<Value, BridgeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "bridge request");
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params: &params,
            })
            .send()
            .await?
            .error_for_status()?;
        let body: RpcResponse = response.json().await?;
        if let Some(error) = body.error {
            warn!(
                method,
                code = error.code,
                message = %error.message,
                "bridge rejected request"
            );
            return Err(BridgeError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }
        Ok(body.result)
    }
}

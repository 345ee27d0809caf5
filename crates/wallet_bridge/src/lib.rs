use alloy_primitives::{Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

mod http;
pub use http::HttpBridge;

/// JSON-RPC method names the bridge ecosystem defines; we never invent our
/// own methods, only relay these.
pub mod methods {
    pub const ACCOUNTS: &str = "eth_accounts";
    pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const CALL: &str = "eth_call";
    pub const SEND_TRANSACTION: &str = "eth_sendTransaction";
    pub const TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";
}

/// EIP-1193: the user declined the request in the wallet UI.
pub const USER_REJECTED_REQUEST: i64 = 4001;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no wallet bridge is available")]
    Unavailable,
    #[error("bridge transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("bridge rejected {method}: {message} (code {code})")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
    #[error("unexpected bridge response for {method}: {reason}")]
    InvalidResponse { method: String, reason: String },
}

impl BridgeError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(
            self,
            BridgeError::Rpc {
                code: USER_REJECTED_REQUEST,
                ..
            }
        )
    }
}

/// Read-only call parameters for `eth_call`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
}

/// Parameters for `eth_sendTransaction`. The bridge fills in gas, nonce and
/// signature; we only name the caller, target, calldata and optional native
/// value.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    pub data: Bytes,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub status: Option<String>,
}

impl TransactionReceipt {
    /// Pre-Byzantium receipts carry no status field; absence counts as
    /// success, an explicit non-1 value as a revert.
    pub fn succeeded(&self) -> bool {
        matches!(self.status.as_deref(), Some("0x1") | None)
    }
}

/// The wallet-provided signer process, reached over its single
/// `request({method, params})` surface. Everything the client knows about
/// accounts and the chain flows through here; there is no other path to the
/// network.
#[async_trait]
pub trait WalletBridge: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, BridgeError>;

    /// Accounts already authorized for this client, without prompting.
    async fn accounts(&self) -> Result<Vec<Address>, BridgeError> {
        let raw = self.request(methods::ACCOUNTS, json!([])).await?;
        decode_reply(methods::ACCOUNTS, raw)
    }

    /// Interactive authorization prompt; an empty list means the user
    /// granted nothing.
    async fn request_accounts(&self) -> Result<Vec<Address>, BridgeError> {
        let raw = self.request(methods::REQUEST_ACCOUNTS, json!([])).await?;
        decode_reply(methods::REQUEST_ACCOUNTS, raw)
    }

    async fn call(&self, request: CallRequest) -> Result<Bytes, BridgeError> {
        let raw = self
            .request(methods::CALL, json!([request, "latest"]))
            .await?;
        decode_reply(methods::CALL, raw)
    }

    /// The bridge signs and broadcasts; the hash comes back immediately,
    /// confirmation is a separate poll.
    async fn send_transaction(&self, request: TransactionRequest) -> Result<B256, BridgeError> {
        let raw = self
            .request(methods::SEND_TRANSACTION, json!([request]))
            .await?;
        decode_reply(methods::SEND_TRANSACTION, raw)
    }

    /// `None` until the transaction is mined.
    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, BridgeError> {
        let raw = self
            .request(methods::TRANSACTION_RECEIPT, json!([hash]))
            .await?;
        if raw.is_null() {
            return Ok(None);
        }
        decode_reply(methods::TRANSACTION_RECEIPT, raw).map(Some)
    }
}

/// Stand-in used before detection succeeds; every request fails without
/// touching the network.
pub struct MissingBridge;

#[async_trait]
impl WalletBridge for MissingBridge {
    async fn request(&self, _method: &str, _params: Value) -> Result<Value, BridgeError> {
        Err(BridgeError::Unavailable)
    }
}

fn decode_reply<T: DeserializeOwned>(method: &str, raw: Value) -> Result<T, BridgeError> {
    serde_json::from_value(raw).map_err(|err| BridgeError::InvalidResponse {
        method: method.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

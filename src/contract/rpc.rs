use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::error::{AppResult, ContractError};

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Transaction receipt fields the dashboard cares about
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub block_number: Option<String>,
    /// `0x1` success, `0x0` reverted
    #[serde(default)]
    pub status: Option<String>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        !matches!(self.status.as_deref(), Some("0x0"))
    }
}

/// Outgoing transaction, signed by the node-side wallet for `from`
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// JSON-RPC 2.0 client for an Ethereum node
pub struct RpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn request(&self, method: &str, params: Value) -> AppResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("➡️ RPC {} #{}", method, id);

        let response = self
            .client
            .post(&self.url)
            .json(&RpcRequest {
                jsonrpc: "2.0",
                id,
                method,
                params,
            })
            .send()
            .await
            .map_err(|e| ContractError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ContractError::Transport(format!("HTTP {}: {}", status, body)).into());
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| ContractError::Transport(format!("Invalid JSON-RPC body: {}", e)))?;

        if let Some(error) = body.error {
            return Err(ContractError::Rpc {
                code: error.code,
                message: error.message,
            }
            .into());
        }

        Ok(body.result.unwrap_or(Value::Null))
    }

    /// `eth_call` against the latest block, returning the raw hex result
    pub async fn eth_call(&self, to: &str, data: &str) -> AppResult<String> {
        let result = self
            .request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        as_string(result, "eth_call")
    }

    pub async fn eth_accounts(&self) -> AppResult<Vec<String>> {
        let result = self.request("eth_accounts", json!([])).await?;
        serde_json::from_value(result).map_err(|e| {
            ContractError::Decode {
                method: "eth_accounts",
                reason: e.to_string(),
            }
            .into()
        })
    }

    pub async fn eth_send_transaction(&self, tx: &TransactionRequest) -> AppResult<String> {
        let result = self.request("eth_sendTransaction", json!([tx])).await?;
        as_string(result, "eth_sendTransaction")
    }

    /// `None` while the transaction is still pending
    pub async fn eth_get_transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> AppResult<Option<TransactionReceipt>> {
        let result = self
            .request("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        serde_json::from_value(result).map(Some).map_err(|e| {
            ContractError::Decode {
                method: "eth_getTransactionReceipt",
                reason: e.to_string(),
            }
            .into()
        })
    }
}

fn as_string(value: Value, method: &'static str) -> AppResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(ContractError::Decode {
            method,
            reason: format!("expected hex string, got {}", other),
        }
        .into()),
    }
}

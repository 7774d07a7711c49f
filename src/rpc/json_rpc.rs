//! Sui JSON-RPC client over HTTP

use async_trait::async_trait;
use base64::Engine;
use move_core_types::account_address::AccountAddress;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{
    format_address, CoinObject, DevInspectResults, ExecutionStatus, LedgerRpc, NetworkError,
    SharedObjectRef, SignedTransaction,
};
use crate::deepbook::ptb::ObjectDigest;

/// Page size for `suix_getCoins`
const COINS_PAGE_LIMIT: u64 = 50;
/// Stop paginating after this many pages
const MAX_COIN_PAGES: usize = 20;

pub struct SuiJsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDevInspect {
    #[serde(default)]
    results: Option<Vec<RawExecutionResult>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExecutionResult {
    #[serde(default)]
    return_values: Vec<(Vec<u8>, Value)>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBalance {
    total_balance: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCoinPage {
    data: Vec<RawCoin>,
    next_cursor: Option<String>,
    has_next_page: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCoin {
    coin_type: String,
    coin_object_id: String,
    version: String,
    digest: String,
    balance: String,
}

#[derive(Deserialize)]
struct RawObjectResponse {
    data: Option<RawObjectData>,
    error: Option<Value>,
}

#[derive(Deserialize)]
struct RawObjectData {
    owner: Option<Value>,
}

#[derive(Deserialize)]
struct RawExecuteResponse {
    digest: String,
}

#[derive(Deserialize)]
struct RawTransactionResponse {
    effects: Option<RawEffects>,
}

#[derive(Deserialize)]
struct RawEffects {
    status: RawStatus,
}

#[derive(Deserialize)]
struct RawStatus {
    status: String,
    error: Option<String>,
}

impl SuiJsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, NetworkError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!(method, id, "JSON-RPC request");
        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Transport(format!("HTTP {} from {}", status, method)));
        }

        let envelope: RpcEnvelope<T> = response
            .json()
            .await
            .map_err(|e| NetworkError::InvalidResponse(format!("{}: {}", method, e)))?;

        if let Some(err) = envelope.error {
            return Err(NetworkError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        envelope
            .result
            .ok_or_else(|| NetworkError::InvalidResponse(format!("{}: missing result", method)))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout
    } else {
        NetworkError::Transport(err.to_string())
    }
}

fn parse_u64(value: &str, field: &str) -> Result<u64, NetworkError> {
    value
        .parse()
        .map_err(|_| NetworkError::InvalidResponse(format!("{} is not a u64: {}", field, value)))
}

fn parse_address(value: &str) -> Result<AccountAddress, NetworkError> {
    AccountAddress::from_hex_literal(value)
        .map_err(|e| NetworkError::InvalidResponse(format!("bad address {}: {}", value, e)))
}

fn shared_version(owner: &Value) -> Option<u64> {
    let version = owner.get("Shared")?.get("initial_shared_version")?;
    version
        .as_u64()
        .or_else(|| version.as_str().and_then(|s| s.parse().ok()))
}

#[async_trait]
impl LedgerRpc for SuiJsonRpcClient {
    async fn dev_inspect(
        &self,
        sender: AccountAddress,
        tx_kind: &[u8],
    ) -> Result<DevInspectResults, NetworkError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(tx_kind);
        let raw: RawDevInspect = self
            .call(
                "sui_devInspectTransactionBlock",
                json!([format_address(&sender), encoded]),
            )
            .await?;

        Ok(DevInspectResults {
            results: raw
                .results
                .unwrap_or_default()
                .into_iter()
                .map(|r| r.return_values.into_iter().map(|(bytes, _)| bytes).collect())
                .collect(),
            error: raw.error,
        })
    }

    async fn get_shared_object(&self, id: AccountAddress) -> Result<SharedObjectRef, NetworkError> {
        let raw: RawObjectResponse = self
            .call(
                "sui_getObject",
                json!([format_address(&id), { "showOwner": true }]),
            )
            .await?;

        if let Some(err) = raw.error {
            return Err(NetworkError::InvalidResponse(format!(
                "object {} unavailable: {}",
                format_address(&id),
                err
            )));
        }
        let owner = raw
            .data
            .and_then(|d| d.owner)
            .ok_or_else(|| NetworkError::InvalidResponse("object has no owner".to_string()))?;
        let initial_shared_version = shared_version(&owner).ok_or_else(|| {
            NetworkError::InvalidResponse(format!("object {} is not shared", format_address(&id)))
        })?;

        Ok(SharedObjectRef {
            id,
            initial_shared_version,
        })
    }

    async fn get_balance(&self, owner: AccountAddress, coin_type: &str) -> Result<u64, NetworkError> {
        let raw: RawBalance = self
            .call("suix_getBalance", json!([format_address(&owner), coin_type]))
            .await?;
        parse_u64(&raw.total_balance, "totalBalance")
    }

    async fn get_coins(
        &self,
        owner: AccountAddress,
        coin_type: &str,
    ) -> Result<Vec<CoinObject>, NetworkError> {
        let mut coins = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_COIN_PAGES {
            let page: RawCoinPage = self
                .call(
                    "suix_getCoins",
                    json!([format_address(&owner), coin_type, cursor, COINS_PAGE_LIMIT]),
                )
                .await?;

            for coin in page.data {
                coins.push(CoinObject {
                    object_id: parse_address(&coin.coin_object_id)?,
                    version: parse_u64(&coin.version, "version")?,
                    digest: ObjectDigest::from_base58(&coin.digest)
                        .map_err(|e| NetworkError::InvalidResponse(e.to_string()))?,
                    balance: parse_u64(&coin.balance, "balance")?,
                    coin_type: coin.coin_type,
                });
            }

            if !page.has_next_page || page.next_cursor.is_none() {
                return Ok(coins);
            }
            cursor = page.next_cursor;
        }

        tracing::warn!(
            owner = %format_address(&owner),
            coin_type,
            "Coin listing truncated after {} pages",
            MAX_COIN_PAGES
        );
        Ok(coins)
    }

    async fn execute_transaction(&self, signed: &SignedTransaction) -> Result<String, NetworkError> {
        let raw: RawExecuteResponse = self
            .call(
                "sui_executeTransactionBlock",
                json!([
                    signed.tx_bytes,
                    signed.signatures,
                    { "showEffects": true },
                    "WaitForEffectsCert"
                ]),
            )
            .await?;
        Ok(raw.digest)
    }

    async fn get_transaction_status(
        &self,
        digest: &str,
    ) -> Result<Option<ExecutionStatus>, NetworkError> {
        let result: Result<RawTransactionResponse, NetworkError> = self
            .call("sui_getTransactionBlock", json!([digest, { "showEffects": true }]))
            .await;

        let raw = match result {
            Ok(raw) => raw,
            // Not indexed yet
            Err(NetworkError::Rpc { message, .. }) if message.contains("Could not find") => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        };

        Ok(raw.effects.map(|effects| match effects.status.status.as_str() {
            "success" => ExecutionStatus::Success,
            _ => ExecutionStatus::Failure(
                effects
                    .status
                    .error
                    .unwrap_or_else(|| "execution failed".to_string()),
            ),
        }))
    }
}

//! Ledger RPC
//!
//! The subset of the Sui fullnode API the trading panel consumes, behind a
//! trait so the order book client and session flow can be driven by a mock.

mod json_rpc;

pub use json_rpc::SuiJsonRpcClient;

use async_trait::async_trait;
use move_core_types::account_address::AccountAddress;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::deepbook::ptb::ObjectDigest;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

/// Shared object coordinates needed to pass it into a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedObjectRef {
    pub id: AccountAddress,
    pub initial_shared_version: u64,
}

/// One owned coin object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinObject {
    pub coin_type: String,
    pub object_id: AccountAddress,
    pub version: u64,
    pub digest: ObjectDigest,
    pub balance: u64,
}

/// Return values of a read-only simulation, one entry per command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevInspectResults {
    pub results: Vec<Vec<Vec<u8>>>,
    /// Abort message when execution failed
    pub error: Option<String>,
}

impl DevInspectResults {
    pub fn command_returns(&self, command_idx: usize) -> Option<&[Vec<u8>]> {
        self.results.get(command_idx).map(Vec::as_slice)
    }
}

/// Final on-chain status of an executed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Failure(String),
}

/// Wallet-signed transaction as the browser submits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Base64 `TransactionData`
    pub tx_bytes: String,
    /// Base64 serialized signatures
    pub signatures: Vec<String>,
}

#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Simulate a `TransactionKind` without a signature or gas.
    async fn dev_inspect(
        &self,
        sender: AccountAddress,
        tx_kind: &[u8],
    ) -> Result<DevInspectResults, NetworkError>;

    async fn get_shared_object(&self, id: AccountAddress) -> Result<SharedObjectRef, NetworkError>;

    /// Total balance of `coin_type` held by `owner`, in base units.
    async fn get_balance(&self, owner: AccountAddress, coin_type: &str) -> Result<u64, NetworkError>;

    /// Every coin object of `coin_type` held by `owner`.
    async fn get_coins(
        &self,
        owner: AccountAddress,
        coin_type: &str,
    ) -> Result<Vec<CoinObject>, NetworkError>;

    /// Submit and return the transaction digest.
    async fn execute_transaction(&self, signed: &SignedTransaction) -> Result<String, NetworkError>;

    /// `Ok(None)` while the transaction is not yet known to the node.
    async fn get_transaction_status(
        &self,
        digest: &str,
    ) -> Result<Option<ExecutionStatus>, NetworkError>;
}

pub fn format_address(address: &AccountAddress) -> String {
    format!("0x{}", hex::encode(address.as_ref()))
}

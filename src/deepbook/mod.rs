//! DeepBook V3 integration
//!
//! Order book reads via read-only simulation, swap validation and quoting,
//! programmable transaction assembly and submission tracking.

pub mod fixed_point;
pub mod monitor;
pub mod orderbook_client;
pub mod orderbook_decoder;
pub mod pool;
pub mod ptb;
pub mod quote;
pub mod swap_builder;
pub mod swap_executor;
pub mod validator;

pub use monitor::{SubmissionHandle, TransactionMonitor, TransactionOutcome};
pub use orderbook_client::{OrderBookClient, OrderbookState, PollingTask};
pub use orderbook_decoder::{DecodeError, OrderBookSnapshot, PriceLevel};
pub use pool::{AssetScale, DeepBookConfig, PoolId};
pub use quote::SwapQuote;
pub use swap_builder::{SwapTransaction, SwapTransactionBuilder};
pub use swap_executor::{PreparedSwap, SessionManager, SwapError, SwapExecutor, SwapRecord, TradingSession};
pub use validator::{AccountBalances, SwapIntent, SwapSide, SwapValidator, ValidationError};

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

//! Order book client
//!
//! Reads level-2 depth by simulating `pool::get_level2_ticks_from_mid`
//! through `devInspect`, so no signature or gas is needed. Keeps the latest
//! snapshot behind a lock and falls back to a synthetic book when the chain
//! read fails before anything real has been seen.

use anyhow::Result;
use move_core_types::account_address::AccountAddress;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::orderbook_decoder::{self, DecodeError, OrderBookSnapshot, PriceLevel};
use super::pool::{DeepBookConfig, PoolId, CLOCK_INITIAL_SHARED_VERSION, CLOCK_OBJECT_ID};
use super::ptb::{ObjectArg, ProgrammableTransactionBuilder, TransactionKind};
use crate::rpc::{format_address, LedgerRpc, NetworkError, SharedObjectRef};

pub const DEFAULT_DEPTH: usize = 5;
/// `tokio::time::interval` panics on a zero period
const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Shape of the placeholder book shown before any chain read succeeds.
struct FallbackLadder {
    center: Decimal,
    step: Decimal,
    quantity: Decimal,
    levels: usize,
}

const FALLBACK_LADDER: FallbackLadder = FallbackLadder {
    center: dec!(4.25),
    step: dec!(0.005),
    quantity: dec!(1000),
    levels: 5,
};

/// Synthetic snapshot flagged `is_fallback`.
pub fn fallback_snapshot(pool: PoolId) -> OrderBookSnapshot {
    let ladder = &FALLBACK_LADDER;
    let level = |offset: Decimal| PriceLevel {
        price: ladder.center + offset,
        quantity: ladder.quantity,
    };
    let bids = (1..=ladder.levels)
        .map(|i| level(-ladder.step * Decimal::from(i)))
        .collect();
    let asks = (1..=ladder.levels)
        .map(|i| level(ladder.step * Decimal::from(i)))
        .collect();
    OrderBookSnapshot::from_ladders(pool, bids, asks, super::unix_millis(), true)
}

#[derive(Debug, Clone)]
pub enum OrderbookState {
    Idle,
    Fetching {
        previous: Option<Arc<OrderBookSnapshot>>,
    },
    Ready(Arc<OrderBookSnapshot>),
    Degraded {
        snapshot: Arc<OrderBookSnapshot>,
        reason: String,
    },
}

impl OrderbookState {
    pub fn snapshot(&self) -> Option<Arc<OrderBookSnapshot>> {
        match self {
            OrderbookState::Idle => None,
            OrderbookState::Fetching { previous } => previous.clone(),
            OrderbookState::Ready(snapshot) | OrderbookState::Degraded { snapshot, .. } => {
                Some(Arc::clone(snapshot))
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderbookState::Idle => "idle",
            OrderbookState::Fetching { .. } => "fetching",
            OrderbookState::Ready(_) => "ready",
            OrderbookState::Degraded { .. } => "degraded",
        }
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            OrderbookState::Degraded { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("simulation aborted: {0}")]
    Inspect(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("failed to build level-2 query: {0}")]
    Build(String),
}

pub struct OrderBookClient {
    rpc: Arc<dyn LedgerRpc>,
    config: DeepBookConfig,
    depth: usize,
    state: RwLock<OrderbookState>,
    /// Serialises timer ticks and explicit refreshes
    fetch_lock: Mutex<()>,
    pool_ref: OnceCell<SharedObjectRef>,
    /// Simulation sender; `0x0` until a wallet connects
    account: RwLock<AccountAddress>,
}

impl OrderBookClient {
    pub fn new(rpc: Arc<dyn LedgerRpc>, config: DeepBookConfig, depth: usize) -> Self {
        Self {
            rpc,
            config,
            depth: depth.max(1),
            state: RwLock::new(OrderbookState::Idle),
            fetch_lock: Mutex::new(()),
            pool_ref: OnceCell::new(),
            account: RwLock::new(AccountAddress::ZERO),
        }
    }

    pub fn config(&self) -> &DeepBookConfig {
        &self.config
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub async fn set_account(&self, account: AccountAddress) {
        *self.account.write().await = account;
    }

    pub async fn state(&self) -> OrderbookState {
        self.state.read().await.clone()
    }

    /// Latest snapshot, or the synthetic one if nothing has been read yet.
    pub async fn snapshot(&self) -> Arc<OrderBookSnapshot> {
        self.state
            .read()
            .await
            .snapshot()
            .unwrap_or_else(|| Arc::new(fallback_snapshot(self.config.pool_id)))
    }

    /// Fetch once and move to `Ready` or `Degraded`.
    pub async fn refresh(&self) -> OrderbookState {
        self.refresh_with(None).await
    }

    /// Like `refresh`, simulating as `account` for this fetch only. The
    /// shared sender set by `set_account` is left untouched.
    pub async fn refresh_as(&self, account: AccountAddress) -> OrderbookState {
        self.refresh_with(Some(account)).await
    }

    async fn refresh_with(&self, sender: Option<AccountAddress>) -> OrderbookState {
        let _guard = self.fetch_lock.lock().await;

        let previous = self.state.read().await.snapshot();
        *self.state.write().await = OrderbookState::Fetching {
            previous: previous.clone(),
        };

        let next = match self.fetch(sender).await {
            Ok(snapshot) => {
                tracing::debug!(
                    pool = self.config.pool_id.as_str(),
                    bids = snapshot.bids.len(),
                    asks = snapshot.asks.len(),
                    mid = %snapshot.mid_price,
                    "Order book refreshed"
                );
                OrderbookState::Ready(Arc::new(snapshot))
            }
            Err(e) => {
                tracing::warn!(
                    pool = self.config.pool_id.as_str(),
                    "Order book refresh failed: {}",
                    e
                );
                OrderbookState::Degraded {
                    snapshot: previous
                        .unwrap_or_else(|| Arc::new(fallback_snapshot(self.config.pool_id))),
                    reason: e.to_string(),
                }
            }
        };

        *self.state.write().await = next.clone();
        next
    }

    /// Refresh on a fixed interval until the returned handle is dropped.
    pub fn spawn_polling(self: &Arc<Self>, interval: Duration) -> PollingTask {
        let interval = interval.max(MIN_REFRESH_INTERVAL);
        let client = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                client.refresh().await;
            }
        });
        tracing::info!(
            pool = self.config.pool_id.as_str(),
            "Order book polling every {:?}",
            interval
        );
        PollingTask { handle }
    }

    /// The pool's shared-object coordinates, resolved once.
    pub async fn pool_ref(&self) -> Result<SharedObjectRef, RefreshError> {
        let pool_id = self
            .config
            .pool_address()
            .map_err(|e| RefreshError::Build(e.to_string()))?;
        let pool = self
            .pool_ref
            .get_or_try_init(|| self.rpc.get_shared_object(pool_id))
            .await?;
        Ok(*pool)
    }

    async fn fetch(&self, sender: Option<AccountAddress>) -> Result<OrderBookSnapshot, RefreshError> {
        let pool = self.pool_ref().await?;
        let kind = build_level2_query(&self.config, pool, self.depth as u64)
            .map_err(|e| RefreshError::Build(e.to_string()))?;
        let sender = match sender {
            Some(account) => account,
            None => *self.account.read().await,
        };

        let results = self.rpc.dev_inspect(sender, &kind).await?;
        if let Some(error) = results.error {
            return Err(RefreshError::Inspect(error));
        }

        let returns = results.command_returns(0).unwrap_or_default();
        if returns.len() != 4 {
            return Err(DecodeError::MalformedPayload(format!(
                "expected 4 return values, got {}",
                returns.len()
            ))
            .into());
        }
        Ok(orderbook_decoder::decode(&returns.concat(), self.depth, &self.config)?)
    }
}

/// `TransactionKind` bytes for a single `get_level2_ticks_from_mid` call.
pub fn build_level2_query(config: &DeepBookConfig, pool: SharedObjectRef, ticks: u64) -> Result<Vec<u8>> {
    let mut builder = ProgrammableTransactionBuilder::new();
    let pool_arg = builder.obj(ObjectArg::SharedObject {
        id: pool.id,
        initial_shared_version: pool.initial_shared_version,
        mutable: false,
    })?;
    let ticks_arg = builder.pure(&ticks)?;
    let clock_arg = builder.obj(clock_object())?;

    builder.move_call(
        config.package_address()?,
        "pool",
        "get_level2_ticks_from_mid",
        vec![config.base.type_tag()?, config.quote.type_tag()?],
        vec![pool_arg, ticks_arg, clock_arg],
    )?;

    tracing::trace!(pool = %format_address(&pool.id), ticks, "Built level-2 query");
    TransactionKind::ProgrammableTransaction(builder.finish()).to_bcs()
}

pub(crate) fn clock_object() -> ObjectArg {
    ObjectArg::SharedObject {
        id: AccountAddress::from_hex_literal(CLOCK_OBJECT_ID).unwrap_or(AccountAddress::ZERO),
        initial_shared_version: CLOCK_INITIAL_SHARED_VERSION,
        mutable: false,
    }
}

/// Owns the polling task; dropping it cancels the timer.
pub struct PollingTask {
    handle: JoinHandle<()>,
}

impl PollingTask {
    pub fn shutdown(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PollingTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deepbook::orderbook_decoder::tests::encode_level2;
    use crate::rpc::mock::MockLedger;
    use crate::rpc::DevInspectResults;

    fn level2_results() -> DevInspectResults {
        DevInspectResults {
            results: vec![encode_level2(
                &[679_000, 678_000],
                &[1_000_000_000, 2_000_000_000],
                &[681_000, 682_000],
                &[3_000_000_000, 4_000_000_000],
            )],
            error: None,
        }
    }

    fn client(ledger: Arc<MockLedger>) -> OrderBookClient {
        OrderBookClient::new(ledger, DeepBookConfig::sui_usdc(), DEFAULT_DEPTH)
    }

    #[test]
    fn test_fallback_ladder_shape() {
        let snapshot = fallback_snapshot(PoolId::SuiUsdc);
        assert!(snapshot.is_fallback);
        assert_eq!(snapshot.bids.len(), 5);
        assert_eq!(snapshot.bids[0].price, dec!(4.245));
        assert_eq!(snapshot.bids[4].price, dec!(4.225));
        assert_eq!(snapshot.asks[0].price, dec!(4.255));
        assert_eq!(snapshot.mid_price, dec!(4.25));
        assert_eq!(snapshot.spread, dec!(0.01));
    }

    #[test]
    fn test_level2_query_layout() {
        let config = DeepBookConfig::sui_usdc();
        let pool = SharedObjectRef {
            id: config.pool_address().unwrap(),
            initial_shared_version: 42,
        };
        let bytes = build_level2_query(&config, pool, 5).unwrap();
        // ProgrammableTransaction with pool, ticks and clock inputs
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1], 3);
        // first input is an immutable shared object
        assert_eq!(&bytes[2..4], &[1, 1]);
        assert_eq!(&bytes[36..44], &42u64.to_le_bytes());
        assert_eq!(bytes[44], 0);
        let function = b"get_level2_ticks_from_mid";
        assert!(bytes.windows(function.len()).any(|w| w == function));
    }

    #[tokio::test]
    async fn test_first_failure_yields_fallback() {
        let ledger = Arc::new(MockLedger::default());
        ledger.push_inspect(Err(NetworkError::Timeout));
        let client = client(ledger.clone());

        let state = client.refresh().await;
        assert_eq!(state.label(), "degraded");
        assert!(client.snapshot().await.is_fallback);
    }

    #[tokio::test]
    async fn test_refresh_reaches_ready() {
        let ledger = Arc::new(MockLedger::default());
        ledger.push_inspect(Ok(level2_results()));
        let client = client(ledger.clone());

        let state = client.refresh().await;
        assert_eq!(state.label(), "ready");
        let snapshot = client.snapshot().await;
        assert!(!snapshot.is_fallback);
        assert_eq!(snapshot.spread, dec!(0.002));
        assert_eq!(snapshot.mid_price, dec!(0.680));
    }

    #[tokio::test]
    async fn test_truncated_payload_keeps_last_snapshot() {
        let ledger = Arc::new(MockLedger::default());
        ledger.push_inspect(Ok(level2_results()));
        let mut truncated = level2_results();
        let last = truncated.results[0].last_mut().unwrap();
        last.truncate(last.len() - 4);
        ledger.push_inspect(Ok(truncated));
        let client = client(ledger.clone());

        client.refresh().await;
        let ready = client.snapshot().await;

        let state = client.refresh().await;
        assert_eq!(state.label(), "degraded");
        assert!(state.degraded_reason().unwrap().contains("malformed"));
        assert!(Arc::ptr_eq(&client.snapshot().await, &ready));
    }

    #[tokio::test]
    async fn test_inspect_abort_degrades() {
        let ledger = Arc::new(MockLedger::default());
        ledger.push_inspect(Ok(DevInspectResults {
            results: vec![],
            error: Some("MoveAbort(pool, 1)".to_string()),
        }));
        let client = client(ledger.clone());

        let state = client.refresh().await;
        assert!(state.degraded_reason().unwrap().contains("MoveAbort"));
    }

    #[tokio::test]
    async fn test_polling_stops_after_drop() {
        let ledger = Arc::new(MockLedger::default());
        for _ in 0..1000 {
            ledger.push_inspect(Ok(level2_results()));
        }
        let client = Arc::new(client(ledger.clone()));

        let task = client.spawn_polling(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(ledger.inspect_count() >= 2);

        drop(task);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let stopped_at = ledger.inspect_count();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(ledger.inspect_count(), stopped_at);
    }

    #[tokio::test]
    async fn test_zero_interval_keeps_polling() {
        let ledger = Arc::new(MockLedger::default());
        for _ in 0..10 {
            ledger.push_inspect(Ok(level2_results()));
        }
        let client = Arc::new(client(ledger.clone()));

        let task = client.spawn_polling(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!task.is_finished());
        assert!(ledger.inspect_count() >= 1);
        assert_eq!(client.state().await.label(), "ready");
    }

    #[tokio::test]
    async fn test_refresh_as_leaves_shared_sender() {
        let ledger = Arc::new(MockLedger::default());
        ledger.push_inspect(Ok(level2_results()));
        ledger.push_inspect(Ok(level2_results()));
        let client = client(ledger.clone());
        let wallet = AccountAddress::from_hex_literal("0xb0b").unwrap();

        client.refresh_as(wallet).await;
        client.refresh().await;

        let senders = ledger.inspect_senders.lock().unwrap().clone();
        assert_eq!(senders, vec![wallet, AccountAddress::ZERO]);
    }
}

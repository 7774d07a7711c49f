//! Swap sessions
//!
//! One session per connected account. A session allows a single swap in
//! flight: building and submitting both take the session's submission flag,
//! and a second attempt while it is held is rejected instead of queued.

use move_core_types::account_address::AccountAddress;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::monitor::{TransactionMonitor, TransactionOutcome};
use super::orderbook_client::{OrderBookClient, RefreshError};
use super::orderbook_decoder::OrderBookSnapshot;
use super::quote::{self, SwapQuote};
use super::swap_builder::{SwapTransaction, SwapTransactionBuilder};
use super::validator::{AccountBalances, SwapIntent, SwapSide, SwapValidator, ValidationError};
use crate::rpc::{format_address, LedgerRpc, NetworkError, SignedTransaction};

/// Most recent swaps kept per session
pub const MAX_SWAP_HISTORY: usize = 100;
/// Sessions untouched for this long are dropped
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("a swap is already in progress for this account")]
    SubmissionInProgress,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("order book unavailable: {0}")]
    OrderbookUnavailable(String),

    #[error("failed to build swap: {0}")]
    Build(String),
}

impl From<RefreshError> for SwapError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Network(e) => SwapError::Network(e),
            other => SwapError::OrderbookUnavailable(other.to_string()),
        }
    }
}

/// History entry for one prepared or submitted swap. Swaps submitted without
/// a matching prepare carry no intent details.
#[derive(Debug, Clone, Serialize)]
pub struct SwapRecord {
    pub swap_id: Uuid,
    pub side: Option<SwapSide>,
    pub input_amount: Option<Decimal>,
    pub estimated_output: Option<Decimal>,
    pub min_out_raw: Option<u64>,
    pub digest: Option<String>,
    /// `None` until the signed transaction is submitted
    pub outcome: Option<TransactionOutcome>,
    pub created_at: u64,
    pub completed_at: Option<u64>,
}

/// A trading session for one account
pub struct TradingSession {
    pub account: AccountAddress,
    pub created_at: u64,
    /// Unix millis of the last build or submit attempt
    last_active: AtomicU64,
    in_flight: AtomicBool,
    history: RwLock<VecDeque<SwapRecord>>,
}

/// Clears the session's in-flight flag when dropped.
pub struct SubmissionGuard {
    session: Arc<TradingSession>,
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        self.session.in_flight.store(false, Ordering::Release);
    }
}

impl TradingSession {
    pub fn new(account: AccountAddress) -> Self {
        let now = super::unix_millis();
        Self {
            account,
            created_at: now,
            last_active: AtomicU64::new(now),
            in_flight: AtomicBool::new(false),
            history: RwLock::new(VecDeque::new()),
        }
    }

    pub fn try_begin(self: &Arc<Self>) -> Result<SubmissionGuard, SwapError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SwapError::SubmissionInProgress)?;
        self.last_active.store(super::unix_millis(), Ordering::Release);
        Ok(SubmissionGuard {
            session: Arc::clone(self),
        })
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn last_active(&self) -> u64 {
        self.last_active.load(Ordering::Acquire)
    }

    pub async fn history(&self) -> Vec<SwapRecord> {
        self.history.read().await.iter().cloned().collect()
    }

    async fn record(&self, record: SwapRecord) {
        push_capped(&mut *self.history.write().await, record);
    }

    async fn complete(&self, swap_id: Uuid, digest: &str, outcome: TransactionOutcome) {
        let mut history = self.history.write().await;
        match history.iter_mut().find(|r| r.swap_id == swap_id) {
            Some(record) => {
                record.digest = Some(digest.to_string());
                record.outcome = Some(outcome);
                record.completed_at = Some(super::unix_millis());
            }
            None => push_capped(&mut history, SwapRecord {
                swap_id,
                side: None,
                input_amount: None,
                estimated_output: None,
                min_out_raw: None,
                digest: Some(digest.to_string()),
                outcome: Some(outcome),
                created_at: super::unix_millis(),
                completed_at: Some(super::unix_millis()),
            }),
        }
    }
}

fn push_capped(history: &mut VecDeque<SwapRecord>, record: SwapRecord) {
    if history.len() >= MAX_SWAP_HISTORY {
        history.pop_front();
    }
    history.push_back(record);
}

/// Session store keyed by account. Idle sessions are evicted whenever a new
/// one is created.
pub struct SessionManager {
    sessions: RwLock<HashMap<AccountAddress, Arc<TradingSession>>>,
    idle_ttl: Duration,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self::with_idle_ttl(DEFAULT_SESSION_TTL)
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    pub async fn get_or_create(&self, account: AccountAddress) -> Arc<TradingSession> {
        if let Some(session) = self.sessions.read().await.get(&account) {
            return Arc::clone(session);
        }
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&account) {
            let cutoff = super::unix_millis().saturating_sub(self.idle_ttl.as_millis() as u64);
            let before = sessions.len();
            sessions.retain(|_, s| s.is_submitting() || s.last_active() > cutoff);
            if sessions.len() < before {
                tracing::debug!(evicted = before - sessions.len(), "Dropped idle sessions");
            }
        }
        Arc::clone(
            sessions
                .entry(account)
                .or_insert_with(|| Arc::new(TradingSession::new(account))),
        )
    }

    pub async fn get(&self, account: &AccountAddress) -> Option<Arc<TradingSession>> {
        self.sessions.read().await.get(account).cloned()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// A built swap waiting for the wallet's signature
#[derive(Debug, Clone, Serialize)]
pub struct PreparedSwap {
    pub swap_id: Uuid,
    pub quote: SwapQuote,
    pub transaction: SwapTransaction,
}

/// Drives quote -> validate -> build and submit -> finality -> refresh.
pub struct SwapExecutor {
    rpc: Arc<dyn LedgerRpc>,
    orderbook: Arc<OrderBookClient>,
    validator: SwapValidator,
    builder: SwapTransactionBuilder,
    monitor: TransactionMonitor,
    sessions: SessionManager,
    finality_timeout: Duration,
}

impl SwapExecutor {
    pub fn new(
        rpc: Arc<dyn LedgerRpc>,
        orderbook: Arc<OrderBookClient>,
        validator: SwapValidator,
        builder: SwapTransactionBuilder,
        monitor: TransactionMonitor,
        finality_timeout: Duration,
    ) -> Self {
        Self {
            rpc,
            orderbook,
            validator,
            builder,
            monitor,
            sessions: SessionManager::new(),
            finality_timeout,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn orderbook(&self) -> &Arc<OrderBookClient> {
        &self.orderbook
    }

    /// Base and quote balances, fetched concurrently.
    pub async fn balances(&self, owner: AccountAddress) -> Result<AccountBalances, NetworkError> {
        let config = self.orderbook.config();
        let (base, quote) = tokio::try_join!(
            self.rpc.get_balance(owner, &config.base.asset_id),
            self.rpc.get_balance(owner, &config.quote.asset_id),
        )?;
        Ok(AccountBalances {
            base: config.base.to_decimal(base),
            quote: config.quote.to_decimal(quote),
        })
    }

    pub async fn quote(&self, side: SwapSide, amount: Decimal) -> (SwapQuote, Arc<OrderBookSnapshot>) {
        let snapshot = self.orderbook.snapshot().await;
        (quote::quote(side, amount, &snapshot), snapshot)
    }

    pub async fn prepare_swap(
        &self,
        account: AccountAddress,
        side: SwapSide,
        amount: Decimal,
    ) -> Result<PreparedSwap, SwapError> {
        let session = self.sessions.get_or_create(account).await;
        let _guard = session.try_begin()?;

        let (quote, snapshot) = self.quote(side, amount).await;
        if snapshot.is_fallback {
            return Err(SwapError::OrderbookUnavailable(
                "no live order book snapshot".to_string(),
            ));
        }

        let intent = SwapIntent {
            side,
            input_amount: amount,
            pool: snapshot.pool,
            estimated_output: quote.estimated_output,
        };
        let balances = self.balances(account).await?;
        self.validator.validate(&intent, &balances, &snapshot)?;

        let (spent, _) = self.builder.assets(side);
        let coins = if spent.is_gas_asset() {
            Vec::new()
        } else {
            self.rpc.get_coins(account, &spent.asset_id).await?
        };
        let pool = self.orderbook.pool_ref().await?;
        let transaction = self
            .builder
            .build(&intent, &coins, pool, account)
            .map_err(|e| SwapError::Build(e.to_string()))?;

        let swap_id = Uuid::new_v4();
        session
            .record(SwapRecord {
                swap_id,
                side: Some(side),
                input_amount: Some(amount),
                estimated_output: Some(quote.estimated_output),
                min_out_raw: Some(transaction.min_out_raw),
                digest: None,
                outcome: None,
                created_at: super::unix_millis(),
                completed_at: None,
            })
            .await;

        tracing::info!(
            account = %format_address(&account),
            %swap_id,
            side = ?side,
            %amount,
            estimated_output = %quote.estimated_output,
            "Prepared swap"
        );
        Ok(PreparedSwap {
            swap_id,
            quote,
            transaction,
        })
    }

    /// Submit a wallet-signed swap and wait for finality. A confirmed swap
    /// refreshes the order book exactly once.
    pub async fn submit_signed_swap(
        &self,
        account: AccountAddress,
        swap_id: Option<Uuid>,
        signed: &SignedTransaction,
    ) -> Result<TransactionOutcome, SwapError> {
        let session = self.sessions.get_or_create(account).await;
        let _guard = session.try_begin()?;

        let handle = self.monitor.submit(signed).await?;
        let outcome = self
            .monitor
            .await_outcome(&handle, self.finality_timeout)
            .await;

        if outcome.is_confirmed() {
            self.orderbook.refresh().await;
        }

        session
            .complete(
                swap_id.unwrap_or_else(Uuid::new_v4),
                &handle.digest,
                outcome.clone(),
            )
            .await;
        Ok(outcome)
    }
}

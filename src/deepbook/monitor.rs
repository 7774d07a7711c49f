//! Submission and finality tracking

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::rpc::{ExecutionStatus, LedgerRpc, NetworkError, SignedTransaction};

pub const DEFAULT_FINALITY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Consecutive status-query failures tolerated before giving up
const MAX_QUERY_ERRORS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum TransactionOutcome {
    Pending,
    Confirmed(String),
    Failed(String),
    /// Submitted, but finality was not observed in time; may still land
    IndeterminateSubmitted(String),
}

impl TransactionOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, TransactionOutcome::Confirmed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionHandle {
    pub digest: String,
}

pub struct TransactionMonitor {
    rpc: Arc<dyn LedgerRpc>,
    poll_interval: Duration,
}

impl TransactionMonitor {
    pub fn new(rpc: Arc<dyn LedgerRpc>, poll_interval: Duration) -> Self {
        Self { rpc, poll_interval }
    }

    pub async fn submit(&self, signed: &SignedTransaction) -> Result<SubmissionHandle, NetworkError> {
        let digest = self.rpc.execute_transaction(signed).await?;
        tracing::info!(%digest, "Transaction submitted");
        Ok(SubmissionHandle { digest })
    }

    /// Poll until effects appear or `timeout` elapses. Giving up does not
    /// cancel the transaction.
    pub async fn await_outcome(&self, handle: &SubmissionHandle, timeout: Duration) -> TransactionOutcome {
        match tokio::time::timeout(timeout, self.poll_until_final(&handle.digest)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(digest = %handle.digest, "No finality after {:?}", timeout);
                TransactionOutcome::IndeterminateSubmitted(handle.digest.clone())
            }
        }
    }

    async fn poll_until_final(&self, digest: &str) -> TransactionOutcome {
        let mut query_errors = 0;
        loop {
            match self.rpc.get_transaction_status(digest).await {
                Ok(Some(ExecutionStatus::Success)) => {
                    tracing::info!(digest, "Transaction confirmed");
                    return TransactionOutcome::Confirmed(digest.to_string());
                }
                Ok(Some(ExecutionStatus::Failure(reason))) => {
                    tracing::warn!(digest, %reason, "Transaction failed on chain");
                    return TransactionOutcome::Failed(reason);
                }
                Ok(None) => query_errors = 0,
                Err(e) => {
                    query_errors += 1;
                    tracing::debug!(digest, attempt = query_errors, "Status query failed: {}", e);
                    if query_errors >= MAX_QUERY_ERRORS {
                        return TransactionOutcome::IndeterminateSubmitted(digest.to_string());
                    }
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::MockLedger;
    use std::sync::atomic::Ordering;

    fn signed() -> SignedTransaction {
        SignedTransaction {
            tx_bytes: "AAA=".to_string(),
            signatures: vec!["sig".to_string()],
        }
    }

    fn monitor(ledger: Arc<MockLedger>) -> TransactionMonitor {
        TransactionMonitor::new(ledger, Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_confirmed_after_pending_polls() {
        let ledger = Arc::new(MockLedger::default());
        ledger.push_status(Ok(None));
        ledger.push_status(Ok(None));
        ledger.push_status(Ok(Some(ExecutionStatus::Success)));
        let monitor = monitor(ledger.clone());

        let handle = monitor.submit(&signed()).await.unwrap();
        let outcome = monitor.await_outcome(&handle, Duration::from_secs(2)).await;

        assert_eq!(outcome, TransactionOutcome::Confirmed("MockDigest111".to_string()));
        assert_eq!(ledger.status_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_on_chain_failure() {
        let ledger = Arc::new(MockLedger::default());
        ledger.push_status(Ok(Some(ExecutionStatus::Failure("MoveAbort 2".to_string()))));
        let monitor = monitor(ledger);

        let handle = SubmissionHandle { digest: "d".to_string() };
        assert_eq!(
            monitor.await_outcome(&handle, Duration::from_secs(2)).await,
            TransactionOutcome::Failed("MoveAbort 2".to_string())
        );
    }

    #[tokio::test]
    async fn test_timeout_is_indeterminate() {
        let ledger = Arc::new(MockLedger::default());
        let monitor = monitor(ledger);

        let handle = SubmissionHandle { digest: "slow".to_string() };
        assert_eq!(
            monitor.await_outcome(&handle, Duration::from_millis(40)).await,
            TransactionOutcome::IndeterminateSubmitted("slow".to_string())
        );
    }

    #[tokio::test]
    async fn test_persistent_query_errors_are_indeterminate() {
        let ledger = Arc::new(MockLedger::default());
        for _ in 0..MAX_QUERY_ERRORS {
            ledger.push_status(Err(NetworkError::Timeout));
        }
        let monitor = monitor(ledger.clone());

        let handle = SubmissionHandle { digest: "lost".to_string() };
        assert_eq!(
            monitor.await_outcome(&handle, Duration::from_secs(2)).await,
            TransactionOutcome::IndeterminateSubmitted("lost".to_string())
        );
        assert_eq!(ledger.status_calls.load(Ordering::SeqCst), MAX_QUERY_ERRORS as usize);
    }

    #[tokio::test]
    async fn test_submit_error_propagates() {
        let ledger = Arc::new(MockLedger::default());
        *ledger.execute_response.lock().unwrap() = Some(Err(NetworkError::Transport("down".into())));
        let monitor = monitor(ledger);

        assert!(monitor.submit(&signed()).await.is_err());
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(TransactionOutcome::Confirmed("abc".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "confirmed", "detail": "abc" }));
    }
}

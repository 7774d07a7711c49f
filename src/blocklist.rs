//! Coin blocklist
//!
//! Advisory scam/verified classification of coin types, backed by the
//! wallet blocklist JSON files. Lists are fetched on first use, shared by all
//! callers and kept until `invalidate` is called. A load that hits any fetch
//! error serves empty lists for that call and is not cached.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::rpc::NetworkError;

pub const DEFAULT_COIN_BLOCKLIST_URL: &str =
    "https://raw.githubusercontent.com/MystenLabs/wallet_blocklist/main/blocklists/coin-list.json";
pub const DEFAULT_COIN_ALLOWLIST_URL: &str =
    "https://raw.githubusercontent.com/MystenLabs/wallet_blocklist/main/allowlists/coin-list.json";
pub const DEFAULT_PACKAGE_BLOCKLIST_URL: &str =
    "https://raw.githubusercontent.com/MystenLabs/wallet_blocklist/main/blocklists/package-list.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlocklistUrls {
    pub coin_blocklist: String,
    pub coin_allowlist: String,
    pub package_blocklist: String,
}

impl Default for BlocklistUrls {
    fn default() -> Self {
        Self {
            coin_blocklist: DEFAULT_COIN_BLOCKLIST_URL.to_string(),
            coin_allowlist: DEFAULT_COIN_ALLOWLIST_URL.to_string(),
            package_blocklist: DEFAULT_PACKAGE_BLOCKLIST_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinStatus {
    Scam,
    Verified,
    Unknown,
}

#[derive(Debug, Default)]
struct Lists {
    coin_blocklist: HashSet<String>,
    coin_allowlist: HashSet<String>,
    package_blocklist: HashSet<String>,
}

impl Lists {
    fn status(&self, coin_type: &str) -> CoinStatus {
        let coin_type = coin_type.to_lowercase();
        let package = coin_type.split("::").next().unwrap_or_default();
        if self.coin_blocklist.contains(&coin_type) || self.package_blocklist.contains(package) {
            CoinStatus::Scam
        } else if self.coin_allowlist.contains(&coin_type) {
            CoinStatus::Verified
        } else {
            CoinStatus::Unknown
        }
    }
}

pub struct CoinBlocklist {
    http: reqwest::Client,
    urls: BlocklistUrls,
    cache: RwLock<Option<Arc<Lists>>>,
    /// Single-flight guard for loads
    load_lock: Mutex<()>,
}

impl CoinBlocklist {
    pub fn new(urls: BlocklistUrls, timeout: Duration) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            urls,
            cache: RwLock::new(None),
            load_lock: Mutex::new(()),
        })
    }

    pub async fn status(&self, coin_type: &str) -> CoinStatus {
        self.lists().await.status(coin_type)
    }

    pub async fn is_package_blocked(&self, package: &str) -> bool {
        self.lists()
            .await
            .package_blocklist
            .contains(&package.to_lowercase())
    }

    pub async fn is_loaded(&self) -> bool {
        self.cache.read().await.is_some()
    }

    /// Drop cached lists; the next lookup refetches.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
        tracing::info!("Coin blocklist cache invalidated");
    }

    async fn lists(&self) -> Arc<Lists> {
        if let Some(lists) = self.cache.read().await.as_ref() {
            return Arc::clone(lists);
        }

        let _loading = self.load_lock.lock().await;
        // Another caller may have finished loading while we waited
        if let Some(lists) = self.cache.read().await.as_ref() {
            return Arc::clone(lists);
        }

        let (blocked, allowed, packages) = tokio::join!(
            self.fetch_list(&self.urls.coin_blocklist, "blocklist"),
            self.fetch_list(&self.urls.coin_allowlist, "allowlist"),
            self.fetch_list(&self.urls.package_blocklist, "blocklist"),
        );
        let complete = blocked.is_ok() && allowed.is_ok() && packages.is_ok();

        let lists = Arc::new(Lists {
            coin_blocklist: blocked.unwrap_or_default(),
            coin_allowlist: allowed.unwrap_or_default(),
            package_blocklist: packages.unwrap_or_default(),
        });
        if complete {
            tracing::info!(
                blocked = lists.coin_blocklist.len(),
                allowed = lists.coin_allowlist.len(),
                packages = lists.package_blocklist.len(),
                "Coin blocklist loaded"
            );
            *self.cache.write().await = Some(Arc::clone(&lists));
        }
        lists
    }

    async fn fetch_list(&self, url: &str, key: &str) -> Result<HashSet<String>, NetworkError> {
        let result: Result<HashSet<String>, NetworkError> = async {
            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| NetworkError::Transport(e.to_string()))?;
            if !response.status().is_success() {
                return Err(NetworkError::Transport(format!(
                    "HTTP {} from {}",
                    response.status(),
                    url
                )));
            }
            let body: Value = response
                .json()
                .await
                .map_err(|e| NetworkError::InvalidResponse(e.to_string()))?;
            let entries = body
                .get(key)
                .and_then(Value::as_array)
                .ok_or_else(|| NetworkError::InvalidResponse(format!("missing `{}` array", key)))?;
            Ok(entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_lowercase)
                .collect())
        }
        .await;

        if let Err(e) = &result {
            tracing::warn!(url, "Blocklist fetch failed: {}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SCAM: &str = "0xBAD::scam::SCAM";
    const GOOD: &str = "0xabc::good::GOOD";

    fn urls(server: &MockServer) -> BlocklistUrls {
        BlocklistUrls {
            coin_blocklist: format!("{}/blocklists/coin-list.json", server.uri()),
            coin_allowlist: format!("{}/allowlists/coin-list.json", server.uri()),
            package_blocklist: format!("{}/blocklists/package-list.json", server.uri()),
        }
    }

    async fn mount_lists(server: &MockServer, expected_loads: u64) {
        Mock::given(method("GET"))
            .and(path("/blocklists/coin-list.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "blocklist": [SCAM] })))
            .expect(expected_loads)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/allowlists/coin-list.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "allowlist": [GOOD] })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/blocklists/package-list.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "blocklist": ["0xdead"] })))
            .mount(server)
            .await;
    }

    fn blocklist(server: &MockServer) -> CoinBlocklist {
        CoinBlocklist::new(urls(server), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_classification() {
        let server = MockServer::start().await;
        mount_lists(&server, 1).await;
        let blocklist = blocklist(&server);

        assert_eq!(blocklist.status("0xbad::scam::SCAM").await, CoinStatus::Scam);
        assert_eq!(blocklist.status(GOOD).await, CoinStatus::Verified);
        assert_eq!(blocklist.status("0x2::sui::SUI").await, CoinStatus::Unknown);
        assert_eq!(blocklist.status("0xdead::any::ANY").await, CoinStatus::Scam);
        assert!(blocklist.is_package_blocked("0xDEAD").await);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_load_once() {
        let server = MockServer::start().await;
        mount_lists(&server, 1).await;
        let blocklist = Arc::new(blocklist(&server));

        let lookups: Vec<_> = (0..8)
            .map(|_| {
                let blocklist = Arc::clone(&blocklist);
                tokio::spawn(async move { blocklist.status(SCAM).await })
            })
            .collect();
        for lookup in lookups {
            assert_eq!(lookup.await.unwrap(), CoinStatus::Scam);
        }
        assert!(blocklist.is_loaded().await);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let server = MockServer::start().await;
        mount_lists(&server, 2).await;
        let blocklist = blocklist(&server);

        blocklist.status(GOOD).await;
        blocklist.status(GOOD).await;
        blocklist.invalidate().await;
        assert!(!blocklist.is_loaded().await);
        blocklist.status(GOOD).await;
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let blocklist = blocklist(&server);

        assert_eq!(blocklist.status(SCAM).await, CoinStatus::Unknown);
        assert!(!blocklist.is_loaded().await);
    }
}

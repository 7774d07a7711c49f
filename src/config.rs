//! Environment-driven settings.

use move_core_types::account_address::AccountAddress;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::blocklist::BlocklistUrls;
use crate::deepbook::monitor::{DEFAULT_FINALITY_TIMEOUT, DEFAULT_POLL_INTERVAL};
use crate::deepbook::orderbook_client::{DEFAULT_DEPTH, DEFAULT_REFRESH_INTERVAL};
use crate::deepbook::pool::PoolId;
use crate::deepbook::swap_builder::DEFAULT_SLIPPAGE_BPS;

pub const DEFAULT_RPC_URL: &str = "https://fullnode.mainnet.sui.io:443";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
/// USDC kept back on buys to cover fees
pub const DEFAULT_FEE_BUFFER: Decimal = dec!(0.5);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Consolidated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Sui fullnode JSON-RPC endpoint
    pub rpc_url: String,
    pub bind_addr: SocketAddr,
    pub pool: PoolId,
    /// Levels per side requested from the pool
    pub orderbook_depth: usize,
    pub refresh_interval: Duration,
    /// devInspect sender before a wallet connects
    pub orderbook_sender: AccountAddress,
    pub finality_timeout: Duration,
    pub finality_poll: Duration,
    pub rpc_timeout: Duration,
    pub slippage_bps: u32,
    pub fee_buffer: Decimal,
    pub blocklist: BlocklistUrls,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            pool: PoolId::SuiUsdc,
            orderbook_depth: DEFAULT_DEPTH,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            orderbook_sender: AccountAddress::ZERO,
            finality_timeout: DEFAULT_FINALITY_TIMEOUT,
            finality_poll: DEFAULT_POLL_INTERVAL,
            rpc_timeout: Duration::from_secs(10),
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
            fee_buffer: DEFAULT_FEE_BUFFER,
            blocklist: BlocklistUrls::default(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment (after `.env`, if any).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let pool = match get("DEEPBOOK_POOL") {
            Some(raw) => PoolId::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "DEEPBOOK_POOL",
                value: raw.clone(),
                reason: "expected sui_usdc, wal_usdc or deep_usdc".to_string(),
            })?,
            None => defaults.pool,
        };
        let orderbook_sender = match get("ORDERBOOK_SENDER") {
            Some(raw) => AccountAddress::from_hex_literal(&raw).map_err(|e| ConfigError::Invalid {
                key: "ORDERBOOK_SENDER",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.orderbook_sender,
        };
        let depth = parse_nonzero(&get, "ORDERBOOK_DEPTH", defaults.orderbook_depth as u64)? as usize;
        let slippage_bps: u32 = parse(&get, "SLIPPAGE_BPS", defaults.slippage_bps)?;
        if slippage_bps > 10_000 {
            return Err(ConfigError::Invalid {
                key: "SLIPPAGE_BPS",
                value: slippage_bps.to_string(),
                reason: "must not exceed 10000".to_string(),
            });
        }

        Ok(Self {
            rpc_url: get("SUI_RPC_URL").unwrap_or(defaults.rpc_url),
            bind_addr: parse(&get, "BIND_ADDR", defaults.bind_addr)?,
            pool,
            orderbook_depth: depth,
            refresh_interval: Duration::from_secs(parse_nonzero(
                &get,
                "ORDERBOOK_REFRESH_SECS",
                defaults.refresh_interval.as_secs(),
            )?),
            orderbook_sender,
            finality_timeout: Duration::from_secs(parse_nonzero(
                &get,
                "FINALITY_TIMEOUT_SECS",
                defaults.finality_timeout.as_secs(),
            )?),
            finality_poll: Duration::from_millis(parse_nonzero(
                &get,
                "FINALITY_POLL_MS",
                defaults.finality_poll.as_millis() as u64,
            )?),
            rpc_timeout: Duration::from_secs(parse_nonzero(
                &get,
                "RPC_TIMEOUT_SECS",
                defaults.rpc_timeout.as_secs(),
            )?),
            slippage_bps,
            fee_buffer: parse(&get, "FEE_BUFFER", defaults.fee_buffer)?,
            blocklist: BlocklistUrls {
                coin_blocklist: get("COIN_BLOCKLIST_URL").unwrap_or(defaults.blocklist.coin_blocklist),
                coin_allowlist: get("COIN_ALLOWLIST_URL").unwrap_or(defaults.blocklist.coin_allowlist),
                package_blocklist: get("PACKAGE_BLOCKLIST_URL")
                    .unwrap_or(defaults.blocklist.package_blocklist),
            },
        })
    }
}

fn parse<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Counts and durations where zero would stall or panic a timer.
fn parse_nonzero(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    let value = parse(get, key, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.pool, PoolId::SuiUsdc);
        assert_eq!(config.orderbook_depth, 5);
        assert_eq!(config.refresh_interval, Duration::from_secs(10));
        assert_eq!(config.slippage_bps, 50);
        assert_eq!(config.fee_buffer, dec!(0.5));
        assert_eq!(config.orderbook_sender, AccountAddress::ZERO);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SUI_RPC_URL", "http://localhost:9000"),
            ("DEEPBOOK_POOL", "deep-usdc"),
            ("ORDERBOOK_DEPTH", "10"),
            ("SLIPPAGE_BPS", "100"),
            ("FEE_BUFFER", "1.25"),
            ("FINALITY_POLL_MS", "250"),
            ("ORDERBOOK_SENDER", "0x1"),
        ])
        .unwrap();
        assert_eq!(config.rpc_url, "http://localhost:9000");
        assert_eq!(config.pool, PoolId::DeepUsdc);
        assert_eq!(config.orderbook_depth, 10);
        assert_eq!(config.slippage_bps, 100);
        assert_eq!(config.fee_buffer, dec!(1.25));
        assert_eq!(config.finality_poll, Duration::from_millis(250));
        assert_eq!(config.orderbook_sender, AccountAddress::from_hex_literal("0x1").unwrap());
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = load(&[("ORDERBOOK_DEPTH", "  ")]).unwrap();
        assert_eq!(config.orderbook_depth, 5);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("ORDERBOOK_DEPTH", "five")]),
            Err(ConfigError::Invalid { key: "ORDERBOOK_DEPTH", .. })
        ));
        assert!(matches!(
            load(&[("ORDERBOOK_DEPTH", "0")]),
            Err(ConfigError::Invalid { key: "ORDERBOOK_DEPTH", .. })
        ));
        for key in [
            "ORDERBOOK_REFRESH_SECS",
            "FINALITY_POLL_MS",
            "FINALITY_TIMEOUT_SECS",
            "RPC_TIMEOUT_SECS",
        ] {
            assert_eq!(
                load(&[(key, "0")]).unwrap_err(),
                ConfigError::Invalid {
                    key,
                    value: "0".to_string(),
                    reason: "must be at least 1".to_string(),
                }
            );
        }
        assert!(matches!(
            load(&[("DEEPBOOK_POOL", "btc_usdc")]),
            Err(ConfigError::Invalid { key: "DEEPBOOK_POOL", .. })
        ));
        assert!(matches!(
            load(&[("SLIPPAGE_BPS", "20000")]),
            Err(ConfigError::Invalid { key: "SLIPPAGE_BPS", .. })
        ));
        assert!(matches!(
            load(&[("BIND_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { key: "BIND_ADDR", .. })
        ));
    }
}

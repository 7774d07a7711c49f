//! DeepBook V3 pool configuration
//!
//! Package and object IDs, coin types and per-asset decimal scales for the
//! pools the trading panel can quote against.

use anyhow::Result;
use move_core_types::account_address::AccountAddress;
use move_core_types::language_storage::TypeTag;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::fixed_point;

/// DeepBook's global fixed-point denominator for prices.
pub const FLOAT_SCALAR: u64 = 1_000_000_000;

// DeepBook V3 Package
pub const DEEPBOOK_PACKAGE: &str =
    "0x2c8d603bc51326b8c13cef9dd07031a408a48dddb541963357661df5d3204809";

// Sui Framework
pub const SUI_FRAMEWORK: &str = "0x2";

// Shared system clock
pub const CLOCK_OBJECT_ID: &str = "0x6";
pub const CLOCK_INITIAL_SHARED_VERSION: u64 = 1;

// Type tags for assets
pub const SUI_TYPE: &str = "0x2::sui::SUI";
pub const USDC_TYPE: &str =
    "0xdba34672e30cb065b1f93e3ab55318768fd6fef66c15942c9f7cb846e2f900e7::usdc::USDC";
pub const WAL_TYPE: &str =
    "0x356a26eb9e012a68958082340d4c4116e7f55615cf27affcff209cf0ae544f59::wal::WAL";
pub const DEEP_TYPE: &str =
    "0xdeeb7a4662eec9f2f3def03fb937a663dddaa2e215b8078a284d026b7946c270::deep::DEEP";

/// Pool identifier for the supported pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolId {
    SuiUsdc,
    WalUsdc,
    DeepUsdc,
}

impl PoolId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolId::SuiUsdc => "sui_usdc",
            PoolId::WalUsdc => "wal_usdc",
            PoolId::DeepUsdc => "deep_usdc",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PoolId::SuiUsdc => "SUI/USDC",
            PoolId::WalUsdc => "WAL/USDC",
            PoolId::DeepUsdc => "DEEP/USDC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sui_usdc" | "sui-usdc" | "suiusdc" => Some(PoolId::SuiUsdc),
            "wal_usdc" | "wal-usdc" | "walusdc" => Some(PoolId::WalUsdc),
            "deep_usdc" | "deep-usdc" | "deepusdc" => Some(PoolId::DeepUsdc),
            _ => None,
        }
    }

    pub fn all() -> &'static [PoolId] {
        &[PoolId::SuiUsdc, PoolId::WalUsdc, PoolId::DeepUsdc]
    }
}

/// Decimal scale of one tradable asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetScale {
    /// Full Move coin type, e.g. `0x2::sui::SUI`
    pub asset_id: String,
    pub symbol: String,
    pub decimal_exponent: u8,
}

impl AssetScale {
    pub fn new(asset_id: &str, symbol: &str, decimal_exponent: u8) -> Self {
        Self {
            asset_id: asset_id.to_string(),
            symbol: symbol.to_string(),
            decimal_exponent,
        }
    }

    /// `10^decimal_exponent`
    pub fn scalar(&self) -> u64 {
        10u64.pow(self.decimal_exponent as u32)
    }

    pub fn type_tag(&self) -> Result<TypeTag> {
        Ok(TypeTag::from_str(&self.asset_id)?)
    }

    /// Whether this asset is the one gas is paid in.
    pub fn is_gas_asset(&self) -> bool {
        self.asset_id == SUI_TYPE
    }

    pub fn to_decimal(&self, raw: u64) -> Decimal {
        fixed_point::quantity_to_decimal(raw, self.scalar())
    }

    pub fn to_raw(&self, amount: Decimal) -> Option<u64> {
        fixed_point::quantity_to_raw(amount, self.scalar())
    }
}

/// DeepBook V3 object IDs and trading parameters for a single pool
#[derive(Debug, Clone)]
pub struct DeepBookConfig {
    /// Pool identifier
    pub pool_id: PoolId,
    /// DeepBook package ID
    pub package: String,
    /// Shared `Pool<Base, Quote>` object ID
    pub pool_object: String,
    pub base: AssetScale,
    pub quote: AssetScale,
    /// Fee asset; the third leg of every swap call
    pub deep: AssetScale,
    /// Smallest order the pool accepts, in base units
    pub min_size: u64,
    /// Order quantities are multiples of this, in base units
    pub lot_size: u64,
}

impl DeepBookConfig {
    /// Create SUI/USDC pool configuration
    pub fn sui_usdc() -> Self {
        Self {
            pool_id: PoolId::SuiUsdc,
            package: DEEPBOOK_PACKAGE.to_string(),
            pool_object: "0xe05dafb5133bcffb8d59f4e12465dc0e9faeaa05e3e342a08fe135800e3e4407"
                .to_string(),
            base: AssetScale::new(SUI_TYPE, "SUI", 9),
            quote: AssetScale::new(USDC_TYPE, "USDC", 6),
            deep: AssetScale::new(DEEP_TYPE, "DEEP", 6),
            min_size: 1_000_000_000, // 1 SUI
            lot_size: 100_000_000,   // 0.1 SUI
        }
    }

    /// Create WAL/USDC pool configuration
    pub fn wal_usdc() -> Self {
        Self {
            pool_id: PoolId::WalUsdc,
            package: DEEPBOOK_PACKAGE.to_string(),
            pool_object: "0x56a1c985c1f1123181d6b881714793689321ba24301b3585eec427436eb1c76d"
                .to_string(),
            base: AssetScale::new(WAL_TYPE, "WAL", 9),
            quote: AssetScale::new(USDC_TYPE, "USDC", 6),
            deep: AssetScale::new(DEEP_TYPE, "DEEP", 6),
            min_size: 1_000_000_000, // 1 WAL
            lot_size: 100_000_000,   // 0.1 WAL
        }
    }

    /// Create DEEP/USDC pool configuration
    pub fn deep_usdc() -> Self {
        Self {
            pool_id: PoolId::DeepUsdc,
            package: DEEPBOOK_PACKAGE.to_string(),
            pool_object: "0xf948981b806057580f91622417534f491da5f61aeaf33d0ed8e69fd5691c95ce"
                .to_string(),
            base: AssetScale::new(DEEP_TYPE, "DEEP", 6),
            quote: AssetScale::new(USDC_TYPE, "USDC", 6),
            deep: AssetScale::new(DEEP_TYPE, "DEEP", 6),
            min_size: 10_000_000, // 10 DEEP
            lot_size: 1_000_000,  // 1 DEEP
        }
    }

    /// Get config for a specific pool
    pub fn for_pool(pool_id: PoolId) -> Self {
        match pool_id {
            PoolId::SuiUsdc => Self::sui_usdc(),
            PoolId::WalUsdc => Self::wal_usdc(),
            PoolId::DeepUsdc => Self::deep_usdc(),
        }
    }

    pub fn package_address(&self) -> Result<AccountAddress> {
        Ok(AccountAddress::from_hex_literal(&self.package)?)
    }

    pub fn pool_address(&self) -> Result<AccountAddress> {
        Ok(AccountAddress::from_hex_literal(&self.pool_object)?)
    }

    /// Minimum order size in base-asset decimal units
    pub fn min_size_decimal(&self) -> Decimal {
        self.base.to_decimal(self.min_size)
    }

    /// Convert a raw on-chain price to quote-per-base decimal units
    pub fn price_to_decimal(&self, raw: u64) -> Option<Decimal> {
        fixed_point::to_decimal(raw, self.base.scalar(), self.quote.scalar(), FLOAT_SCALAR)
    }
}

impl Default for DeepBookConfig {
    fn default() -> Self {
        Self::sui_usdc()
    }
}

//! Swap transaction assembly
//!
//! Builds the programmable transaction for one `pool::swap_exact_quantity`
//! call. Only the spent leg is funded; the other two legs get
//! `coin::zero` placeholders, and every coin the pool hands back is sent to
//! the initiator in a single transfer.

use anyhow::{anyhow, bail, Result};
use move_core_types::account_address::AccountAddress;
use serde::Serialize;

use super::orderbook_client::clock_object;
use super::pool::{AssetScale, DeepBookConfig, PoolId, SUI_FRAMEWORK};
use super::ptb::{
    Argument, CommandInfo, ObjectArg, ProgrammableTransaction, ProgrammableTransactionBuilder,
    TransactionKind,
};
use super::quote::min_output;
use super::validator::{SwapIntent, SwapSide};
use crate::rpc::{format_address, CoinObject, SharedObjectRef};

/// Default slippage tolerance applied to the min-out floor
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;

/// Coins one swap may consolidate; Sui caps a command at 512 arguments
pub const MAX_MERGE_COINS: usize = 500;

/// A fully assembled, unsigned swap.
#[derive(Debug, Clone, Serialize)]
pub struct SwapTransaction {
    pub pool: PoolId,
    pub side: SwapSide,
    /// Spent asset, base units
    pub input_raw: u64,
    /// Received asset, base units
    pub min_out_raw: u64,
    pub recipient: String,
    pub commands: Vec<CommandInfo>,
    #[serde(skip)]
    kind: TransactionKind,
}

impl SwapTransaction {
    pub fn programmable(&self) -> &ProgrammableTransaction {
        let TransactionKind::ProgrammableTransaction(ptb) = &self.kind;
        ptb
    }

    /// Base64 BCS `TransactionKind` for the wallet to wrap and sign.
    pub fn to_bcs_base64(&self) -> Result<String> {
        self.kind.to_bcs_base64()
    }
}

pub struct SwapTransactionBuilder {
    config: DeepBookConfig,
    slippage_bps: u32,
}

impl SwapTransactionBuilder {
    pub fn new(config: DeepBookConfig, slippage_bps: u32) -> Self {
        Self {
            config,
            slippage_bps,
        }
    }

    /// (spent, received)
    pub fn assets(&self, side: SwapSide) -> (&AssetScale, &AssetScale) {
        match side {
            SwapSide::Buy => (&self.config.quote, &self.config.base),
            SwapSide::Sell => (&self.config.base, &self.config.quote),
        }
    }

    pub fn build(
        &self,
        intent: &SwapIntent,
        owned_coins: &[CoinObject],
        pool: SharedObjectRef,
        recipient: AccountAddress,
    ) -> Result<SwapTransaction> {
        let (spent, received) = self.assets(intent.side);
        let input_raw = spent
            .to_raw(intent.input_amount)
            .filter(|raw| *raw > 0)
            .ok_or_else(|| anyhow!("Invalid input amount {}", intent.input_amount))?;
        let min_out_raw = received
            .to_raw(min_output(intent.estimated_output, self.slippage_bps))
            .unwrap_or(0);

        let mut ptb = ProgrammableTransactionBuilder::new();
        let framework = AccountAddress::from_hex_literal(SUI_FRAMEWORK)?;

        // 1. Source coin: the gas coin for SUI, else the largest owned coins merged
        let source = if spent.is_gas_asset() {
            Argument::GasCoin
        } else {
            self.merged_source(&mut ptb, spent, owned_coins, input_raw)?
        };

        // 2. Exact input amount
        let amount = ptb.pure(&input_raw)?;
        let split = ptb.split_coins(source, vec![amount])?;
        let funded = nested(split, 0)?;

        // 3. Zero coins for the unfunded legs
        let mut legs = Vec::with_capacity(3);
        for (idx, asset) in [&self.config.base, &self.config.quote, &self.config.deep]
            .into_iter()
            .enumerate()
        {
            let is_funded = matches!((intent.side, idx), (SwapSide::Sell, 0) | (SwapSide::Buy, 1));
            if is_funded {
                legs.push(funded);
            } else {
                legs.push(ptb.move_call(framework, "coin", "zero", vec![asset.type_tag()?], vec![])?);
            }
        }

        // 4. Swap
        let pool_arg = ptb.obj(ObjectArg::SharedObject {
            id: pool.id,
            initial_shared_version: pool.initial_shared_version,
            mutable: true,
        })?;
        let min_out = ptb.pure(&min_out_raw)?;
        let clock = ptb.obj(clock_object())?;
        let swap = ptb.move_call(
            self.config.package_address()?,
            "pool",
            "swap_exact_quantity",
            vec![self.config.base.type_tag()?, self.config.quote.type_tag()?],
            vec![pool_arg, legs[0], legs[1], legs[2], min_out, clock],
        )?;

        // 5. Base, quote and DEEP back to the initiator
        let recipient_arg = ptb.pure(&recipient)?;
        ptb.transfer_objects(
            vec![nested(swap, 0)?, nested(swap, 1)?, nested(swap, 2)?],
            recipient_arg,
        )?;

        let programmable = ptb.finish();
        let commands = programmable.command_summaries();
        tracing::info!(
            pool = self.config.pool_id.as_str(),
            side = ?intent.side,
            input_raw,
            min_out_raw,
            commands = commands.len(),
            "Built swap transaction"
        );

        Ok(SwapTransaction {
            pool: self.config.pool_id,
            side: intent.side,
            input_raw,
            min_out_raw,
            recipient: format_address(&recipient),
            commands,
            kind: TransactionKind::ProgrammableTransaction(programmable),
        })
    }

    fn merged_source(
        &self,
        ptb: &mut ProgrammableTransactionBuilder,
        spent: &AssetScale,
        owned_coins: &[CoinObject],
        input_raw: u64,
    ) -> Result<Argument> {
        let mut coins: Vec<&CoinObject> = owned_coins
            .iter()
            .filter(|c| c.coin_type == spent.asset_id)
            .collect();
        if coins.is_empty() {
            bail!("No {} coins available", spent.symbol);
        }

        // Largest first, stopping once the amount is covered
        coins.sort_by(|a, b| b.balance.cmp(&a.balance));
        let mut covered: u128 = 0;
        let mut needed = 0;
        for coin in &coins {
            if covered >= input_raw as u128 {
                break;
            }
            covered += coin.balance as u128;
            needed += 1;
        }
        if covered < input_raw as u128 {
            bail!(
                "Owned {} coins hold {} base units, need {}",
                spent.symbol,
                covered,
                input_raw
            );
        }
        if needed > MAX_MERGE_COINS {
            bail!(
                "Covering {} {} base units needs {} coins, more than {} can be merged at once",
                input_raw,
                spent.symbol,
                needed,
                MAX_MERGE_COINS
            );
        }
        let (first, rest) = coins[..needed.max(1)]
            .split_first()
            .ok_or_else(|| anyhow!("No {} coins available", spent.symbol))?;

        let primary = ptb.obj(object_ref(first))?;
        if !rest.is_empty() {
            let sources = rest
                .iter()
                .map(|c| ptb.obj(object_ref(c)))
                .collect::<Result<Vec<_>>>()?;
            ptb.merge_coins(primary, sources)?;
        }
        Ok(primary)
    }
}

fn object_ref(coin: &CoinObject) -> ObjectArg {
    ObjectArg::ImmOrOwnedObject((coin.object_id, coin.version, coin.digest))
}

fn nested(result: Argument, idx: u16) -> Result<Argument> {
    match result {
        Argument::Result(cmd) => Ok(Argument::NestedResult(cmd, idx)),
        other => Err(anyhow!("Expected a command result, got {:?}", other)),
    }
}

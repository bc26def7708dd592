use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;

use super::*;
use crate::Cluster;

/// Minimum exchange rate enforced by the swap program.
///
/// `rate` is expressed in raw units of the `to` token per one whole `from`
/// token, already reduced by fees and slippage. The swap fails on-chain when
/// the executed rate falls below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MinExchangeRate {
    pub rate: u64,
    pub from_decimals: u8,
    pub quote_decimals: u8,
    pub strict: bool,
}

/// Everything the external swap transaction builder needs to execute the trade.
#[derive(Clone, Debug, PartialEq)]
pub struct SwapParams {
    pub from_mint: AssetId,
    pub to_mint: AssetId,
    /// Intermediary currency, quote mint of the `from` market.
    pub quote_mint: AssetId,
    /// Raw amount of `from_mint` to sell.
    pub amount: u64,
    pub min_exchange_rate: MinExchangeRate,
    pub from_market: MarketAddress,
    pub to_market: Option<MarketAddress>,
    /// Close open orders accounts created by the swap in the same flow.
    pub close_new_accounts: bool,
    /// Token account of the referrer credited with part of the fees.
    pub referral: Option<Pubkey>,
}

/// Associated token account of the referral `owner` for the quote currency
/// of the `from` market. Referral fees are only paid in USDC and USDT.
pub fn referral_account(cluster: &Cluster, owner: &Pubkey, quote_mint: &AssetId) -> Option<Pubkey> {
    (*quote_mint == cluster.usdc() || *quote_mint == cluster.usdt())
        .then(|| get_associated_token_address(owner, quote_mint))
}


//! Swap SDK.
//!
//! # Overview
//!
//! Route resolution and pricing core of an order-book token swap.
//!
//! Use [`route::RouteResolver`] to find the market(s) connecting two tokens,
//! [`state::MarketCache`] to keep their order books fresh (see [`stream`] for
//! the refresh strategies) and [`pricing`] to derive the fair rate, price
//! impact and the minimum exchange rate of a trade.
//!
//! [`session::SwapSession`] ties all of it together into the swap form state
//! machine and hands the resulting [`types::SwapParams`] to a
//! [`client::SwapExecutor`].
//!
//! See `./tests` for examples.
//!
//! # Limitations/follow-ups
//!
//! * Price impact of a trade larger than the visible book is computed against
//!   the last visible level, so it is underestimated.
//!
//! * Order book decoding, route tables and transaction construction live in
//!   other SDKs and are plugged in via [`client`] traits.
//!
//! # Testing
//!
//! [`testing`] module provides in-memory implementations of all collaborators.

pub mod client;
pub mod config;
pub mod error;
pub mod num;
pub mod pricing;
pub mod route;
pub mod session;
pub mod state;
pub mod stream;
pub mod testing;
pub mod types;

use solana_sdk::pubkey::Pubkey;

use crate::types::{AssetId, MarketAddress};

#[derive(Clone, Debug)]
/// Cluster the exchange is operating on.
pub struct Cluster {
    dex_program: Pubkey,
    bridge_market_base: Pubkey,
    native_mint: AssetId,
    wrapped_native_mint: AssetId,
    usdc: AssetId,
    usdt: AssetId,
    sollet_usdc: AssetId,
    sollet_usdt: AssetId,
    wormhole_native_markets: Vec<(AssetId, AssetId, MarketAddress)>,
}

impl Cluster {
    pub fn mainnet() -> Self {
        let usdc = Pubkey::from_str_const("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
        let usdt = Pubkey::from_str_const("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB");
        Self {
            dex_program: Pubkey::from_str_const("9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin"),
            bridge_market_base: Pubkey::from_str_const(
                "6a9wpsZpZGxGhFVSQBpcTNjNjytdbSA1iUw1A5KNDxPw",
            ),
            // Not a real mint, distinguishes native SOL from wrapped SOL
            native_mint: Pubkey::from_str_const("Ejmc1UB4EsES5oAaRN63SpoxMJidt3ZGBrqrZk49vjTZ"),
            wrapped_native_mint: Pubkey::from_str_const(
                "So11111111111111111111111111111111111111112",
            ),
            usdc,
            usdt,
            sollet_usdc: Pubkey::from_str_const("BXXkv6z8ykpG1yuvUDPgh732wzVHB69RnB9YgSYh3itW"),
            sollet_usdt: Pubkey::from_str_const("BQcdHdAQW1hczDbBi9hiegXAR7A98Q9jx3X3iBBBDiq4"),
            wormhole_native_markets: vec![
                (
                    Pubkey::from_str_const("FVsXUnbhifqJ4LiXQEbpUtXVdB8T5ADLKqSs5t1oc54F"),
                    usdc,
                    Pubkey::from_str_const("6nGMps9VfDjkKEwYjdSNqN1ToXkLae4VsN49fzBiDFBd"),
                ),
                (
                    Pubkey::from_str_const("9w97GdWUYYaamGwdKMKZgGzPduZJkiFizq4rz5CPXRv2"),
                    usdt,
                    Pubkey::from_str_const("4v6e6vNXAaEunrvbqkYnKwbaWfck8a2KVR4uRAVXxVwC"),
                ),
            ],
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn custom(
        dex_program: Pubkey,
        bridge_market_base: Pubkey,
        native_mint: AssetId,
        wrapped_native_mint: AssetId,
        usdc: AssetId,
        usdt: AssetId,
        sollet_usdc: AssetId,
        sollet_usdt: AssetId,
        wormhole_native_markets: Vec<(AssetId, AssetId, MarketAddress)>,
    ) -> Self {
        Self {
            dex_program,
            bridge_market_base,
            native_mint,
            wrapped_native_mint,
            usdc,
            usdt,
            sollet_usdc,
            sollet_usdt,
            wormhole_native_markets,
        }
    }

    /// Order book exchange program.
    pub fn dex_program(&self) -> Pubkey {
        self.dex_program
    }

    /// Base authority of deterministic sollet/wormhole bridge market addresses.
    pub fn bridge_market_base(&self) -> Pubkey {
        self.bridge_market_base
    }

    pub fn native_mint(&self) -> AssetId {
        self.native_mint
    }

    pub fn wrapped_native_mint(&self) -> AssetId {
        self.wrapped_native_mint
    }

    pub fn usdc(&self) -> AssetId {
        self.usdc
    }

    pub fn usdt(&self) -> AssetId {
        self.usdt
    }

    pub fn sollet_usdc(&self) -> AssetId {
        self.sollet_usdc
    }

    pub fn sollet_usdt(&self) -> AssetId {
        self.sollet_usdt
    }

    /// `(wormhole mint, native mint, market)` triples of one-to-one markets.
    pub fn wormhole_native_markets(&self) -> &[(AssetId, AssetId, MarketAddress)] {
        &self.wormhole_native_markets
    }

    /// Maps the native mint to its wrapped counterpart, other mints as is.
    pub fn wrapped(&self, mint: AssetId) -> AssetId {
        if mint == self.native_mint {
            self.wrapped_native_mint
        } else {
            mint
        }
    }
}

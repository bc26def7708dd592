//! External collaborators.
//!
//! Order book parsing, the quote-currency route table, the sollet bridge
//! registry and transaction construction are owned by other SDKs. The
//! resolver only talks to them through these traits.

use std::future::Future;

use alloy::primitives::Address;
use futures::stream::BoxStream;

use crate::{
    error::SwapError,
    state::OrderBookSide,
    types::{self, BookSide, MarketHandle, SwapParams},
};

/// Loads markets and their order books from the exchange.
pub trait MarketLoader: Send + Sync {
    /// Fetches market metadata.
    fn load_market(
        &self,
        address: types::MarketAddress,
    ) -> impl Future<Output = Result<MarketHandle, SwapError>> + Send;

    /// Fetches one side of the market's order book.
    fn load_book_side(
        &self,
        market: &MarketHandle,
        side: BookSide,
    ) -> impl Future<Output = Result<OrderBookSide, SwapError>> + Send;

    /// Decodes raw book-side account data received from a subscription.
    fn decode_book_side(
        &self,
        market: &MarketHandle,
        side: BookSide,
        data: &[u8],
    ) -> Result<OrderBookSide, SwapError>;
}

/// Precomputed table of quote-currency markets connecting asset pairs.
pub trait RouteTable: Send + Sync {
    /// One market for a direct pair, two for a transitive one.
    fn route(&self, from: &types::AssetId, to: &types::AssetId)
    -> Option<Vec<types::MarketAddress>>;
}

/// Bridge metadata of a sollet-wrapped token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolletInfo {
    /// Token mint on the Solana side.
    pub mint: types::AssetId,
    /// ERC-20 contract the token is bridged from.
    pub erc20_contract: Address,
    pub name: String,
    pub ticker: String,
}

/// Registry of sollet bridge metadata and one-to-one swap markets.
pub trait BridgeRegistry: Send + Sync {
    /// Fetches bridge metadata of a sollet-wrapped mint.
    fn sollet_info(
        &self,
        mint: types::AssetId,
    ) -> impl Future<Output = Result<SolletInfo, SwapError>> + Send;

    /// Returns `true` once a market exists at `market`, requesting its
    /// creation first when `create` is set and the market is missing.
    fn ensure_swap_market(
        &self,
        base: types::AssetId,
        quote: types::AssetId,
        market: types::MarketAddress,
        info: &SolletInfo,
        create: bool,
    ) -> impl Future<Output = Result<bool, SwapError>> + Send;
}

/// Account change notifications.
pub trait AccountSubscriber: Send + Sync {
    /// Stream of raw account data, one item per change.
    fn subscribe(&self, account: types::MarketAddress) -> BoxStream<'static, Vec<u8>>;
}

/// Builds, signs and sends the swap transaction.
pub trait SwapExecutor: Send + Sync {
    fn execute(&self, params: SwapParams) -> impl Future<Output = Result<(), SwapError>> + Send;
}

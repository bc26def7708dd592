use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tracing::{debug, warn};

use super::{Bbo, OrderBook, OrderBookSide};
use crate::{
    client::MarketLoader,
    error::SwapError,
    types::{BookSide, MarketAddress, MarketHandle, Route},
};

/// State of a market metadata entry. A missing entry is "absent".
#[derive(Clone, Debug)]
pub enum MarketEntry {
    /// Load in progress, concurrent requests must not start another one.
    Pending,
    Ready(Arc<MarketHandle>),
    /// Last load failed, the next request retries.
    Failed(String),
}

/// Clears the `Pending` entry of a load dropped before completion, so the
/// next request starts over.
struct PendingGuard<'a> {
    markets: &'a DashMap<MarketAddress, MarketEntry>,
    address: MarketAddress,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.markets
                .remove_if(&self.address, |_, e| matches!(e, MarketEntry::Pending));
        }
    }
}

/// What happens to cached data when the active route changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Keep everything for the lifetime of the cache.
    #[default]
    Never,
    /// Drop book snapshots of markets outside the active route.
    /// Market metadata is kept.
    ActiveRoute,
}

/// Cache of market metadata and order book snapshots, keyed by market address.
///
/// Single writer per entry, readers get clones of whole values.
#[derive(derive_more::Debug)]
pub struct MarketCache<L> {
    #[debug(skip)]
    loader: L,
    markets: DashMap<MarketAddress, MarketEntry>,
    books: DashMap<MarketAddress, OrderBook>,
    eviction: EvictionPolicy,
}

impl<L: MarketLoader> MarketCache<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            markets: DashMap::new(),
            books: DashMap::new(),
            eviction: EvictionPolicy::default(),
        }
    }

    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn eviction(&self) -> EvictionPolicy {
        self.eviction
    }

    pub fn entry(&self, address: &MarketAddress) -> Option<MarketEntry> {
        self.markets.get(address).map(|e| e.value().clone())
    }

    /// Loaded market, without triggering a load.
    pub fn market(&self, address: &MarketAddress) -> Option<Arc<MarketHandle>> {
        match self.markets.get(address).as_deref() {
            Some(MarketEntry::Ready(market)) => Some(market.clone()),
            _ => None,
        }
    }

    /// Returns the market, loading it on first request.
    ///
    /// `Ok(None)` means another request is loading the market right now and
    /// the caller should try again later.
    pub async fn get_market(
        &self,
        address: MarketAddress,
    ) -> Result<Option<Arc<MarketHandle>>, SwapError> {
        match self.markets.entry(address) {
            Entry::Occupied(mut o) => match o.get() {
                MarketEntry::Ready(market) => return Ok(Some(market.clone())),
                MarketEntry::Pending => {
                    debug!(%address, "market fetch in progress");
                    return Ok(None);
                }
                MarketEntry::Failed(reason) => {
                    debug!(%address, %reason, "retrying failed market fetch");
                    o.insert(MarketEntry::Pending);
                }
            },
            Entry::Vacant(v) => {
                v.insert(MarketEntry::Pending);
            }
        }

        debug!(%address, "fetching market");
        let mut pending = PendingGuard {
            markets: &self.markets,
            address,
            armed: true,
        };
        let loaded = self.loader.load_market(address).await;
        pending.armed = false;
        match loaded {
            Ok(market) => {
                let market = Arc::new(market);
                self.markets
                    .insert(address, MarketEntry::Ready(market.clone()));
                Ok(Some(market))
            }
            Err(err) => {
                warn!(%address, %err, "failed to fetch market");
                self.markets
                    .insert(address, MarketEntry::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    /// Records precision metadata resolved after the market was loaded.
    pub fn set_decimals(&self, address: &MarketAddress, base_decimals: u8, quote_decimals: u8) {
        if let Some(mut entry) = self.markets.get_mut(address) {
            if let MarketEntry::Ready(market) = entry.value() {
                let updated = market
                    .as_ref()
                    .clone()
                    .with_decimals(base_decimals, quote_decimals);
                *entry.value_mut() = MarketEntry::Ready(Arc::new(updated));
            }
        }
    }

    pub fn snapshot(&self, address: &MarketAddress) -> Option<OrderBook> {
        self.books.get(address).map(|b| b.value().clone())
    }

    pub fn bbo(&self, address: &MarketAddress) -> Option<Bbo> {
        self.books.get(address).map(|b| b.bbo())
    }

    /// Replaces one side of the snapshot unconditionally.
    pub fn replace_side(&self, address: MarketAddress, side: OrderBookSide) {
        self.books
            .entry(address)
            .or_insert_with(OrderBook::empty)
            .replace_side(side);
    }

    /// Replaces one side of the snapshot only when its best price differs
    /// from the cached one. Returns `true` if the snapshot changed.
    pub fn replace_side_if_top_changed(&self, address: MarketAddress, side: OrderBookSide) -> bool {
        match self.books.entry(address) {
            Entry::Occupied(mut o) => {
                let cached = o.get().side(side.side()).best_price();
                if cached == side.best_price() {
                    return false;
                }
                o.get_mut().replace_side(side);
                true
            }
            Entry::Vacant(v) => {
                let mut book = OrderBook::empty();
                book.replace_side(side);
                v.insert(book);
                true
            }
        }
    }

    /// Fetches both sides of a loaded market in parallel and replaces the
    /// snapshot. Returns `false` if the market is not loaded yet.
    pub async fn refresh_book(&self, address: MarketAddress) -> Result<bool, SwapError> {
        let Some(market) = self.market(&address) else {
            return Ok(false);
        };
        let (bids, asks) = futures::try_join!(
            self.loader.load_book_side(&market, BookSide::Bids),
            self.loader.load_book_side(&market, BookSide::Asks),
        )?;
        self.books.insert(address, OrderBook::new(bids, asks)?);
        Ok(true)
    }

    /// Refreshes all given markets concurrently. Failures are logged and the
    /// previous snapshot is kept. Returns the number of refreshed markets.
    pub async fn refresh_books(&self, markets: &[MarketAddress]) -> usize {
        let results =
            futures::future::join_all(markets.iter().map(|m| self.refresh_book(*m))).await;
        results
            .into_iter()
            .zip(markets)
            .filter(|(result, market)| match result {
                Ok(refreshed) => *refreshed,
                Err(err) => {
                    warn!(%market, %err, "book refresh failed, keeping last snapshot");
                    false
                }
            })
            .count()
    }

    /// Applies the eviction policy for a newly activated route.
    pub fn on_route_change(&self, route: Option<&Route>) {
        if self.eviction == EvictionPolicy::ActiveRoute {
            self.books
                .retain(|market, _| route.is_some_and(|r| r.contains(market)));
        }
    }

    /// Drops everything cached for the market.
    pub fn evict(&self, address: &MarketAddress) {
        self.markets.remove(address);
        self.books.remove(address);
    }

    pub fn clear(&self) {
        self.markets.clear();
        self.books.clear();
    }
}

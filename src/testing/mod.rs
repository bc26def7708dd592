//! In-memory exchange and test utilities.
//!
//! [`MockDex`] implements every collaborator trait from [`crate::client`] on
//! top of in-memory markets, books and routes. It counts calls, can be made
//! to fail, and can hold individual lookups behind a gate (see
//! [`MockDex::gate`]) to reproduce out-of-order completions.
//!
//! Book-side account data is encoded as a JSON list of `[price, size]`
//! string pairs, see [`MockDex::encode_book_side`].
//!
//! [`DexFixture`] describes markets and routes in JSON, for the CLI and for
//! integration tests.

use std::{
    str::FromStr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use dashmap::{DashMap, DashSet};
use fastnum::{UD64, udec64};
use futures::{StreamExt, channel::mpsc, stream::BoxStream};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::Notify;

use crate::{
    Cluster,
    client::{
        AccountSubscriber, BridgeRegistry, MarketLoader, RouteTable, SolletInfo, SwapExecutor,
    },
    error::SwapError,
    num::parse_decimal,
    route::create_with_seed,
    state::{OrderBookSide, PriceLevel},
    types::{AssetId, BookSide, MarketAddress, MarketHandle, SwapParams},
};

const DEFAULT_MIN_ORDER_SIZE: UD64 = udec64!(0.1);

type Levels = Vec<(UD64, UD64)>;

#[derive(Default)]
struct Inner {
    markets: DashMap<MarketAddress, MarketHandle>,
    books: DashMap<MarketAddress, (Levels, Levels)>,
    routes: DashMap<(AssetId, AssetId), Vec<MarketAddress>>,
    sollet: DashMap<AssetId, SolletInfo>,
    bridge_markets: DashSet<MarketAddress>,
    gates: DashMap<Pubkey, Arc<Notify>>,
    subscribers: DashMap<Pubkey, Vec<mpsc::UnboundedSender<Vec<u8>>>>,
    executed: Mutex<Vec<SwapParams>>,

    market_loads: AtomicUsize,
    book_loads: AtomicUsize,
    sollet_lookups: AtomicUsize,
    market_creations: AtomicUsize,

    fail_market_loads: AtomicBool,
    fail_book_loads: AtomicBool,
    fail_sollet_lookups: AtomicBool,
    fail_submissions: AtomicBool,
}

/// In-memory exchange, cheap to clone, clones share state.
#[derive(Clone, Default, derive_more::Debug)]
#[debug("MockDex")]
pub struct MockDex {
    inner: Arc<Inner>,
}

impl MockDex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic test address.
    pub fn address(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    fn book_side_account(market: u8, side: BookSide) -> Pubkey {
        let mut bytes = [market; 32];
        bytes[31] = match side {
            BookSide::Bids => 0xb1,
            BookSide::Asks => 0xa5,
        };
        Pubkey::new_from_array(bytes)
    }

    /// Adds a market with default minimum order size and returns its address.
    pub fn add_market(&self, market: u8, base: u8, quote: u8) -> MarketAddress {
        self.insert_market(MarketHandle::new(
            Self::address(market),
            Self::address(base),
            Self::address(quote),
            DEFAULT_MIN_ORDER_SIZE,
            Self::book_side_account(market, BookSide::Bids),
            Self::book_side_account(market, BookSide::Asks),
        ))
    }

    pub fn insert_market(&self, market: MarketHandle) -> MarketAddress {
        let address = market.address();
        self.inner.markets.insert(address, market);
        address
    }

    pub fn set_book<P: Copy + Into<UD64>>(
        &self,
        market: &MarketAddress,
        bids: &[(P, P)],
        asks: &[(P, P)],
    ) {
        let levels = |levels: &[(P, P)]| {
            levels
                .iter()
                .map(|(p, s)| ((*p).into(), (*s).into()))
                .collect::<Levels>()
        };
        self.inner
            .books
            .insert(*market, (levels(bids), levels(asks)));
    }

    /// Route table entry, also used for the reversed pair.
    pub fn add_route(&self, from: AssetId, to: AssetId, markets: Vec<MarketAddress>) {
        self.inner.routes.insert((from, to), markets);
    }

    pub fn add_sollet(&self, info: SolletInfo) {
        self.inner.sollet.insert(info.mint, info);
    }

    pub fn add_bridge_market(&self, market: MarketAddress) {
        self.inner.bridge_markets.insert(market);
    }

    pub fn has_bridge_market(&self, market: &MarketAddress) -> bool {
        self.inner.bridge_markets.contains(market)
    }

    /// Holds market loads and sollet lookups of `key` until notified.
    pub fn gate(&self, key: Pubkey) -> Arc<Notify> {
        self.inner
            .gates
            .entry(key)
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    async fn pass_gate(&self, key: &Pubkey) {
        let gate = self.inner.gates.get(key).map(|g| g.value().clone());
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    pub fn encode_book_side<P: Copy + Into<UD64>>(levels: &[(P, P)]) -> Vec<u8> {
        let levels = levels
            .iter()
            .map(|(p, s)| {
                [
                    Into::<UD64>::into(*p).to_string(),
                    Into::<UD64>::into(*s).to_string(),
                ]
            })
            .collect::<Vec<_>>();
        serde_json::to_vec(&levels).unwrap_or_default()
    }

    /// Delivers new book-side data to subscribers of the side account.
    pub fn push_book_side<P: Copy + Into<UD64>>(
        &self,
        market: &MarketAddress,
        side: BookSide,
        levels: &[(P, P)],
    ) {
        let Some(account) = self
            .inner
            .markets
            .get(market)
            .map(|m| m.book_side_address(side))
        else {
            return;
        };
        self.push_account(&account, Self::encode_book_side(levels));
    }

    pub fn push_account(&self, account: &Pubkey, data: Vec<u8>) {
        if let Some(mut senders) = self.inner.subscribers.get_mut(account) {
            senders.retain(|tx| tx.unbounded_send(data.clone()).is_ok());
        }
    }

    pub fn subscriber_count(&self, account: &Pubkey) -> usize {
        self.inner
            .subscribers
            .get(account)
            .map(|s| s.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or_default()
    }

    pub fn fail_market_loads(&self, fail: bool) {
        self.inner.fail_market_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_book_loads(&self, fail: bool) {
        self.inner.fail_book_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sollet_lookups(&self, fail: bool) {
        self.inner.fail_sollet_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn fail_submissions(&self, fail: bool) {
        self.inner.fail_submissions.store(fail, Ordering::SeqCst);
    }

    pub fn market_loads(&self) -> usize {
        self.inner.market_loads.load(Ordering::SeqCst)
    }

    pub fn book_loads(&self) -> usize {
        self.inner.book_loads.load(Ordering::SeqCst)
    }

    pub fn sollet_lookups(&self) -> usize {
        self.inner.sollet_lookups.load(Ordering::SeqCst)
    }

    pub fn market_creations(&self) -> usize {
        self.inner.market_creations.load(Ordering::SeqCst)
    }

    /// Swaps passed to [`SwapExecutor::execute`].
    pub fn executed(&self) -> Vec<SwapParams> {
        self.inner
            .executed
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Builds the exchange described by the fixture.
    pub fn from_fixture(cluster: &Cluster, fixture: &DexFixture) -> Result<Self, SwapError> {
        let dex = Self::new();
        for market in &fixture.markets {
            let address = parse_pubkey(&market.address)?;
            let side_account = |account: &Option<String>, seed: &str| match account {
                Some(a) => parse_pubkey(a),
                None => create_with_seed(&address, seed, &cluster.dex_program()),
            };
            let mut handle = MarketHandle::new(
                address,
                parse_pubkey(&market.base_mint)?,
                parse_pubkey(&market.quote_mint)?,
                match &market.min_order_size {
                    Some(size) => parse_decimal(size)?,
                    None => DEFAULT_MIN_ORDER_SIZE,
                },
                side_account(&market.bids_address, "bids")?,
                side_account(&market.asks_address, "asks")?,
            );
            if let (Some(base), Some(quote)) = (market.base_decimals, market.quote_decimals) {
                handle = handle.with_decimals(base, quote);
            }
            dex.insert_market(handle);
            dex.set_book(
                &address,
                &parse_levels(&market.bids)?,
                &parse_levels(&market.asks)?,
            );
        }
        for route in &fixture.routes {
            dex.add_route(
                parse_pubkey(&route.from)?,
                parse_pubkey(&route.to)?,
                route
                    .markets
                    .iter()
                    .map(|m| parse_pubkey(m))
                    .collect::<Result<_, _>>()?,
            );
        }
        Ok(dex)
    }
}

fn parse_pubkey(value: &str) -> Result<Pubkey, SwapError> {
    Pubkey::from_str(value)
        .map_err(|_| SwapError::InvalidRequest(format!("invalid address: {value}")))
}

fn parse_levels(levels: &[[String; 2]]) -> Result<Levels, SwapError> {
    levels
        .iter()
        .map(|[price, size]| Ok::<_, SwapError>((parse_decimal(price)?, parse_decimal(size)?)))
        .collect()
}

fn book_side(side: BookSide, levels: &[(UD64, UD64)]) -> Result<OrderBookSide, SwapError> {
    Ok(OrderBookSide::new(
        side,
        levels
            .iter()
            .map(|(p, s)| PriceLevel::new(*p, *s))
            .collect(),
    )?)
}

impl MarketLoader for MockDex {
    async fn load_market(&self, address: MarketAddress) -> Result<MarketHandle, SwapError> {
        self.inner.market_loads.fetch_add(1, Ordering::SeqCst);
        self.pass_gate(&address).await;
        if self.inner.fail_market_loads.load(Ordering::SeqCst) {
            return Err(SwapError::Transport("market load failed".to_string()));
        }
        self.inner
            .markets
            .get(&address)
            .map(|m| m.value().clone())
            .ok_or_else(|| SwapError::ExternalLookupFailed(format!("market {address} not found")))
    }

    async fn load_book_side(
        &self,
        market: &MarketHandle,
        side: BookSide,
    ) -> Result<OrderBookSide, SwapError> {
        self.inner.book_loads.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_book_loads.load(Ordering::SeqCst) {
            return Err(SwapError::Transport("book load failed".to_string()));
        }
        let levels = self
            .inner
            .books
            .get(&market.address())
            .map(|b| match side {
                BookSide::Bids => b.0.clone(),
                BookSide::Asks => b.1.clone(),
            })
            .unwrap_or_default();
        book_side(side, &levels)
    }

    fn decode_book_side(
        &self,
        _market: &MarketHandle,
        side: BookSide,
        data: &[u8],
    ) -> Result<OrderBookSide, SwapError> {
        let levels: Vec<[String; 2]> = serde_json::from_slice(data)?;
        book_side(side, &parse_levels(&levels)?)
    }
}

impl RouteTable for MockDex {
    fn route(&self, from: &AssetId, to: &AssetId) -> Option<Vec<MarketAddress>> {
        if let Some(markets) = self.inner.routes.get(&(*from, *to)) {
            return Some(markets.clone());
        }
        self.inner
            .routes
            .get(&(*to, *from))
            .map(|m| m.iter().rev().copied().collect())
    }
}

impl BridgeRegistry for MockDex {
    async fn sollet_info(&self, mint: AssetId) -> Result<SolletInfo, SwapError> {
        self.inner.sollet_lookups.fetch_add(1, Ordering::SeqCst);
        self.pass_gate(&mint).await;
        if self.inner.fail_sollet_lookups.load(Ordering::SeqCst) {
            return Err(SwapError::ExternalLookupFailed(
                "bridge registry unavailable".to_string(),
            ));
        }
        self.inner
            .sollet
            .get(&mint)
            .map(|i| i.value().clone())
            .ok_or_else(|| SwapError::ExternalLookupFailed(format!("no sollet info for {mint}")))
    }

    async fn ensure_swap_market(
        &self,
        _base: AssetId,
        _quote: AssetId,
        market: MarketAddress,
        _info: &SolletInfo,
        create: bool,
    ) -> Result<bool, SwapError> {
        if self.inner.bridge_markets.contains(&market) {
            return Ok(true);
        }
        if create {
            self.inner.market_creations.fetch_add(1, Ordering::SeqCst);
            self.inner.bridge_markets.insert(market);
        }
        Ok(create)
    }
}

impl AccountSubscriber for MockDex {
    fn subscribe(&self, account: Pubkey) -> BoxStream<'static, Vec<u8>> {
        let (tx, rx) = mpsc::unbounded();
        self.inner.subscribers.entry(account).or_default().push(tx);
        rx.boxed()
    }
}

impl SwapExecutor for MockDex {
    async fn execute(&self, params: SwapParams) -> Result<(), SwapError> {
        if self.inner.fail_submissions.load(Ordering::SeqCst) {
            return Err(SwapError::Submission("transaction rejected".to_string()));
        }
        if let Ok(mut executed) = self.inner.executed.lock() {
            executed.push(params);
        }
        Ok(())
    }
}

/// Markets and routes of a [`MockDex`], in JSON.
///
/// ```json
/// {
///   "markets": [{
///     "address": "...", "baseMint": "...", "quoteMint": "...",
///     "minOrderSize": "0.1", "baseDecimals": 6, "quoteDecimals": 6,
///     "bids": [["10", "5"]], "asks": [["10.2", "5"]]
///   }],
///   "routes": [{ "from": "...", "to": "...", "markets": ["..."] }]
/// }
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DexFixture {
    #[serde(default)]
    pub markets: Vec<MarketFixture>,
    #[serde(default)]
    pub routes: Vec<RouteFixture>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketFixture {
    pub address: String,
    pub base_mint: String,
    pub quote_mint: String,
    pub min_order_size: Option<String>,
    pub base_decimals: Option<u8>,
    pub quote_decimals: Option<u8>,
    pub bids_address: Option<String>,
    pub asks_address: Option<String>,
    #[serde(default)]
    pub bids: Vec<[String; 2]>,
    #[serde(default)]
    pub asks: Vec<[String; 2]>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RouteFixture {
    pub from: String,
    pub to: String,
    pub markets: Vec<String>,
}

impl DexFixture {
    pub fn from_json(json: &str) -> Result<Self, SwapError> {
        Ok(serde_json::from_str(json)?)
    }
}

//! Swap form state machine.
//!
//! [`SwapSession`] owns the state of one swap form: the selected token pair,
//! its route, the entered amount and the user settings. Changing the pair
//! resolves the route, loads the route's markets into the shared
//! [`MarketCache`] and starts a background [`RefreshTask`] keeping their order
//! books fresh. Every read ([`SwapSession::quote`], [`SwapSession::fair`],
//! [`SwapSession::can_swap`]) is computed from the latest snapshots.
//!
//! Pair changes are numbered. A pair change that completes after a newer one
//! started is discarded with [`SwapError::Superseded`] and never overwrites
//! the newer route.

use std::{
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use fastnum::{UD64, udec64};
use futures::StreamExt;
use itertools::Itertools;
use solana_sdk::pubkey::Pubkey;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    client::{AccountSubscriber, BridgeRegistry, MarketLoader, RouteTable, SwapExecutor},
    config::{RefreshStrategy, SwapConfig},
    error::SwapError,
    num::Converter,
    pricing::{self, MinSwapAmount, RouteLeg},
    route::RouteResolver,
    state::{MarketCache, OrderBook},
    stream,
    types::{
        AssetId, AssetPair, MarketAddress, MarketHandle, MinExchangeRate, RequestId,
        Route, RouteKind, SwapParams, referral_account,
    },
};

/// How often a market being loaded by another request is checked.
const PENDING_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long to wait for a market being loaded by another request.
const PENDING_TIMEOUT: Duration = Duration::from_secs(5);

/// Observable state of the swap form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapPhase {
    NoRoute,
    RouteFound,
    PricesLoading,
    PricesReady,
    /// Amount entered, but no fair price to quote it with.
    AmountEntered,
    QuoteComputed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Stage {
    #[default]
    NoRoute,
    RouteFound,
    PricesLoading,
    PricesReady,
}

/// Amount the user typed, the other one is derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AmountInput {
    From(UD64),
    To(UD64),
}

/// Background refresh of the active route's order books. Aborted on drop.
#[derive(Debug)]
pub struct RefreshTask {
    handle: JoinHandle<()>,
}

impl RefreshTask {
    fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Quote of the current swap form state.
///
/// Amounts are zero while the fair price is unknown.
#[derive(Clone, Debug, PartialEq)]
pub struct Quote {
    pub fair: Option<UD64>,
    pub from_amount: UD64,
    pub to_amount: UD64,
    pub fee_multiplier: UD64,
    /// Price impact of the output amount on the market delivering the `to`
    /// token, in percent.
    pub price_impact: Option<UD64>,
    /// Raw units of the `to` token per one whole `from` token.
    pub min_exchange_rate: Option<u64>,
    /// Set when the amount is below the minimum order size of a route market.
    pub min_swap_amount: Option<MinSwapAmount>,
}

#[derive(Debug)]
struct SessionState {
    pair: Option<AssetPair>,
    request: RequestId,
    route: Option<Route>,
    stage: Stage,
    input: Option<AmountInput>,
    slippage: UD64,
    fair_override: Option<UD64>,
    strict: bool,
    close_new_accounts: bool,
    referral: Option<Pubkey>,
    refresh: Option<RefreshTask>,
}

/// Loaded market of a route leg with its latest snapshot.
struct Leg {
    market: Arc<MarketHandle>,
    book: OrderBook,
}

/// Swap form backed by a route resolver, a market cache and a transaction
/// executor.
#[derive(derive_more::Debug)]
pub struct SwapSession<L, T, B, E> {
    config: SwapConfig,
    resolver: RouteResolver<T, B>,
    cache: Arc<MarketCache<L>>,
    #[debug(skip)]
    executor: E,
    #[debug(skip)]
    subscriber: Option<Arc<dyn AccountSubscriber>>,
    state: RwLock<SessionState>,
}

impl<L, T, B, E> SwapSession<L, T, B, E>
where
    L: MarketLoader + 'static,
    T: RouteTable,
    B: BridgeRegistry,
    E: SwapExecutor,
{
    /// Creates a session with its own market cache.
    pub fn new(config: SwapConfig, resolver: RouteResolver<T, B>, loader: L, executor: E) -> Self {
        let cache = Arc::new(MarketCache::new(loader).with_eviction(config.eviction));
        Self::with_cache(config, resolver, cache, executor)
    }

    /// Creates a session sharing an existing market cache.
    pub fn with_cache(
        config: SwapConfig,
        resolver: RouteResolver<T, B>,
        cache: Arc<MarketCache<L>>,
        executor: E,
    ) -> Self {
        let state = SessionState {
            pair: None,
            request: 0,
            route: None,
            stage: Stage::NoRoute,
            input: None,
            slippage: config.slippage,
            fair_override: None,
            strict: config.strict,
            close_new_accounts: config.close_new_accounts,
            referral: config.referral,
            refresh: None,
        };
        Self {
            resolver: resolver.with_market_creation(config.allow_market_creation),
            config,
            cache,
            executor,
            subscriber: None,
            state: RwLock::new(state),
        }
    }

    /// Refresh order books from account change notifications instead of
    /// polling, unless [`RefreshStrategy::Poll`] is configured.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn AccountSubscriber>) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    pub fn resolver(&self) -> &RouteResolver<T, B> {
        &self.resolver
    }

    pub fn cache(&self) -> &Arc<MarketCache<L>> {
        &self.cache
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `update` if `request` is still the latest pair change.
    fn commit(
        &self,
        request: RequestId,
        update: impl FnOnce(&mut SessionState),
    ) -> Result<(), SwapError> {
        let mut state = self.write();
        if state.request != request {
            debug!(request, latest = state.request, "discarding superseded result");
            return Err(SwapError::Superseded {
                request,
                latest: state.request,
            });
        }
        update(&mut state);
        Ok(())
    }

    pub fn pair(&self) -> Option<AssetPair> {
        self.read().pair
    }

    pub fn route(&self) -> Option<Route> {
        self.read().route.clone()
    }

    /// Id of the latest pair change.
    pub fn request_id(&self) -> RequestId {
        self.read().request
    }

    pub fn is_refreshing(&self) -> bool {
        self.read()
            .refresh
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn phase(&self) -> SwapPhase {
        let state = self.read();
        match state.stage {
            Stage::NoRoute => SwapPhase::NoRoute,
            Stage::RouteFound => SwapPhase::RouteFound,
            Stage::PricesLoading => SwapPhase::PricesLoading,
            Stage::PricesReady => match state.input {
                None => SwapPhase::PricesReady,
                Some(_) if self.fair_of(&state).is_ok() => SwapPhase::QuoteComputed,
                Some(_) => SwapPhase::AmountEntered,
            },
        }
    }

    /// Selects the pair to swap, resolves its route and loads its markets.
    ///
    /// Returns the route, `None` for wrapping and unwrapping of the native
    /// token which needs no market. The entered amount is kept.
    ///
    /// # Errors
    ///
    /// * [`SwapError::NotFound`] when no market connects the pair.
    /// * [`SwapError::Superseded`] when another pair was selected meanwhile,
    ///   the session then reflects the newer pair.
    /// * Market loading errors, the session stays in
    ///   [`SwapPhase::PricesLoading`].
    pub async fn set_pair(&self, from: AssetId, to: AssetId) -> Result<Option<Route>, SwapError> {
        let request = {
            let mut state = self.write();
            state.request += 1;
            state.pair = Some(AssetPair::new(from, to));
            state.route = None;
            state.stage = Stage::NoRoute;
            state.refresh = None;
            state.request
        };
        debug!(request, %from, %to, "token pair changed");

        if pricing::is_wrap_unwrap(self.resolver.cluster(), &from, &to) {
            self.commit(request, |state| state.stage = Stage::PricesReady)?;
            return Ok(None);
        }

        let resolved = self.resolver.resolve(from, to).await;
        // Stale outcomes are discarded whether they succeeded or not
        self.commit(request, |_| {})?;
        let route = resolved?;
        self.commit(request, |state| {
            state.route = Some(route.clone());
            state.stage = Stage::RouteFound;
        })?;
        self.cache.on_route_change(Some(&route));

        self.commit(request, |state| state.stage = Stage::PricesLoading)?;
        let markets =
            futures::future::try_join_all(route.markets().iter().map(|m| self.load_market(*m)))
                .await;
        self.commit(request, |_| {})?;
        let markets = markets?;

        let refreshed = self.cache.refresh_books(route.markets()).await;
        if refreshed < markets.len() {
            warn!(request, refreshed, markets = markets.len(), "initial book refresh incomplete");
        }

        let task = self.start_refresh(markets);
        self.commit(request, move |state| {
            state.stage = Stage::PricesReady;
            state.refresh = Some(task);
        })?;
        info!(request, %from, %to, kind = ?route.kind(), markets = ?route.markets(), "route ready");
        Ok(Some(route))
    }

    /// Loads the market through the cache, waiting for a load started by
    /// another request.
    async fn load_market(&self, address: MarketAddress) -> Result<Arc<MarketHandle>, SwapError> {
        let market = tokio::time::timeout(PENDING_TIMEOUT, async {
            loop {
                if let Some(market) = self.cache.get_market(address).await? {
                    return Ok::<_, SwapError>(market);
                }
                tokio::time::sleep(PENDING_POLL_INTERVAL).await;
            }
        })
        .await
        .map_err(|_| SwapError::Unavailable("market"))??;

        if market.base_decimals().is_some() && market.quote_decimals().is_some() {
            return Ok(market);
        }
        let tokens = self.resolver.tokens();
        match (
            tokens.decimals(&market.base_mint()),
            tokens.decimals(&market.quote_mint()),
        ) {
            (Some(base), Some(quote)) => {
                self.cache.set_decimals(&address, base, quote);
                Ok(self.cache.market(&address).unwrap_or(market))
            }
            _ => Ok(market),
        }
    }

    fn start_refresh(&self, markets: Vec<Arc<MarketHandle>>) -> RefreshTask {
        let cache = self.cache.clone();
        match (&self.subscriber, self.config.refresh) {
            (Some(subscriber), RefreshStrategy::Auto) => {
                let updates = stream::route_updates(cache, subscriber.as_ref(), markets);
                RefreshTask::spawn(async move {
                    futures::pin_mut!(updates);
                    while let Some(update) = updates.next().await {
                        if let Err(err) = update {
                            warn!(%err, "skipping undecodable book update");
                        }
                    }
                })
            }
            _ => {
                let addresses = markets.iter().map(|m| m.address()).collect();
                let ticks = stream::poll(
                    cache,
                    addresses,
                    self.config.poll_interval,
                    tokio::time::sleep,
                );
                RefreshTask::spawn(ticks.for_each(|_| async {}))
            }
        }
    }

    /// Swaps the direction of the trade, the current `to` amount becomes the
    /// `from` amount.
    pub async fn flip(&self) -> Result<Option<Route>, SwapError> {
        let pair = {
            let mut state = self.write();
            let pair = state
                .pair
                .ok_or_else(|| SwapError::InvalidRequest("no token pair selected".to_string()))?;
            if state.input.is_some() {
                let to_amount = self.quote_of(&state).to_amount;
                state.input = Some(AmountInput::From(to_amount));
            }
            pair.reversed()
        };
        self.set_pair(pair.from, pair.to).await
    }

    pub fn set_from_amount(&self, amount: UD64) {
        self.write().input = Some(AmountInput::From(amount));
    }

    pub fn set_to_amount(&self, amount: UD64) {
        self.write().input = Some(AmountInput::To(amount));
    }

    pub fn clear_amount(&self) {
        self.write().input = None;
    }

    /// Slippage tolerance in percent.
    pub fn set_slippage(&self, slippage: UD64) -> Result<(), SwapError> {
        if slippage > udec64!(100) {
            return Err(SwapError::InvalidRequest(format!(
                "slippage {slippage}% exceeds 100%"
            )));
        }
        self.write().slippage = slippage;
        Ok(())
    }

    pub fn slippage(&self) -> UD64 {
        self.read().slippage
    }

    /// Replaces the market derived fair price, `None` restores it.
    pub fn set_fair_override(&self, fair: Option<UD64>) -> Result<(), SwapError> {
        if fair.is_some_and(|f| f == UD64::ZERO) {
            return Err(SwapError::InvalidRequest(
                "fair price override must be positive".to_string(),
            ));
        }
        self.write().fair_override = fair;
        Ok(())
    }

    pub fn set_strict(&self, strict: bool) {
        self.write().strict = strict;
    }

    pub fn set_close_new_accounts(&self, close: bool) {
        self.write().close_new_accounts = close;
    }

    /// Wallet credited with referral fees of the following swaps.
    pub fn set_referral(&self, owner: Option<Pubkey>) {
        self.write().referral = owner;
    }

    /// Loaded markets of the route with their snapshots, `None` until every
    /// leg has both.
    fn legs(&self, route: &Route) -> Option<Vec<Leg>> {
        route
            .markets()
            .iter()
            .map(|address| {
                Some(Leg {
                    market: self.cache.market(address)?,
                    book: self.cache.snapshot(address)?,
                })
            })
            .collect()
    }

    /// Price of one `to` token in `from` tokens.
    pub fn fair(&self) -> Result<UD64, SwapError> {
        self.fair_of(&self.read())
    }

    fn fair_of(&self, state: &SessionState) -> Result<UD64, SwapError> {
        let pair = state.pair.ok_or(SwapError::Unavailable("fair price"))?;
        let cluster = self.resolver.cluster();
        if pricing::is_wrap_unwrap(cluster, &pair.from, &pair.to) {
            return Ok(UD64::ONE);
        }
        if let Some(fair) = state.fair_override {
            return Ok(fair);
        }
        let legs = state
            .route
            .as_ref()
            .and_then(|route| self.legs(route))
            .ok_or(SwapError::Unavailable("fair price"))?;
        let legs = legs
            .iter()
            .map(|leg| RouteLeg::new(&leg.market, leg.book.bbo()))
            .collect_vec();
        pricing::fair_rate(cluster, &pair.from, &pair.to, &legs)
    }

    /// Fair price of the reversed pair, price of one `from` token in `to`
    /// tokens.
    pub fn reverse_fair(&self) -> Result<UD64, SwapError> {
        let state = self.read();
        let pair = state
            .pair
            .ok_or(SwapError::Unavailable("fair price"))?
            .reversed();
        let cluster = self.resolver.cluster();
        if pricing::is_wrap_unwrap(cluster, &pair.from, &pair.to) {
            return Ok(UD64::ONE);
        }
        if let Some(fair) = state.fair_override {
            return Ok(UD64::ONE / fair);
        }
        let legs = state
            .route
            .as_ref()
            .and_then(|route| self.legs(route))
            .ok_or(SwapError::Unavailable("fair price"))?;
        let legs = legs
            .iter()
            .rev()
            .map(|leg| RouteLeg::new(&leg.market, leg.book.bbo()))
            .collect_vec();
        pricing::fair_rate(cluster, &pair.from, &pair.to, &legs)
    }

    /// Quote of the current amount.
    pub fn quote(&self) -> Quote {
        self.quote_of(&self.read())
    }

    fn quote_of(&self, state: &SessionState) -> Quote {
        let cluster = self.resolver.cluster();
        let wrap_unwrap = state
            .pair
            .is_some_and(|p| pricing::is_wrap_unwrap(cluster, &p.from, &p.to));
        let fee_multiplier = pricing::fee_multiplier(self.config.taker_fee, wrap_unwrap);
        let fair = self.fair_of(state).ok();

        let (from_amount, to_amount) = match (fair, state.input) {
            (Some(fair), Some(AmountInput::From(from))) => (
                from,
                pricing::expected_output(from, fair, fee_multiplier).unwrap_or(UD64::ZERO),
            ),
            (Some(fair), Some(AmountInput::To(to))) => (
                pricing::required_input(to, fair, fee_multiplier).unwrap_or(UD64::ZERO),
                to,
            ),
            _ => (UD64::ZERO, UD64::ZERO),
        };
        let mut quote = Quote {
            fair,
            from_amount,
            to_amount,
            fee_multiplier,
            price_impact: None,
            min_exchange_rate: None,
            min_swap_amount: None,
        };
        let (Some(pair), Some(fair)) = (state.pair, fair) else {
            return quote;
        };

        let legs = state
            .route
            .as_ref()
            .and_then(|route| self.legs(route))
            .unwrap_or_default();
        quote.min_exchange_rate = self
            .decimals(&pair.to, &legs)
            .and_then(|decimals| {
                pricing::min_exchange_rate(fair, decimals, state.slippage, fee_multiplier).ok()
            });
        if wrap_unwrap || legs.is_empty() || from_amount == UD64::ZERO {
            return quote;
        }

        quote.price_impact = self.price_impact(&pair, &legs, to_amount);
        let route_legs = legs
            .iter()
            .map(|leg| RouteLeg::new(&leg.market, leg.book.bbo()))
            .collect_vec();
        quote.min_swap_amount = route_legs.first().and_then(|from_leg| {
            pricing::min_swap_amount(
                &pair.from,
                from_amount,
                to_amount,
                from_leg,
                route_legs.get(1),
            )
        });
        quote
    }

    /// Impact of filling the output amount on the market delivering the
    /// `to` token, the last leg of the route.
    fn price_impact(&self, pair: &AssetPair, legs: &[Leg], to_amount: UD64) -> Option<UD64> {
        let to = self.resolver.cluster().wrapped(pair.to);
        let leg = legs.last()?;
        pricing::price_impact(&leg.book, &leg.market, &to, to_amount).ok()
    }

    /// Decimals of the mint from the token registry, falling back to the
    /// precision metadata of the route markets.
    fn decimals(&self, mint: &AssetId, legs: &[Leg]) -> Option<u8> {
        self.resolver.tokens().decimals(mint).or_else(|| {
            let wrapped = self.resolver.cluster().wrapped(*mint);
            legs.iter().find_map(|leg| {
                if leg.market.base_mint() == wrapped {
                    leg.market.base_decimals()
                } else if leg.market.quote_mint() == wrapped {
                    leg.market.quote_decimals()
                } else {
                    None
                }
            })
        })
    }

    /// `true` when the current form can be submitted.
    pub fn can_swap(&self) -> bool {
        let state = self.read();
        let Some(pair) = state.pair else {
            return false;
        };
        let Some(route) = state.route.as_ref() else {
            return false;
        };
        let quote = self.quote_of(&state);
        let tokens = self.resolver.tokens();
        let correct_side = match route.kind() {
            RouteKind::DirectOrTransitiveQuote => true,
            RouteKind::WormholeNative => tokens.is_wormhole(&pair.from),
            RouteKind::WormholeSollet => tokens.is_sollet(&pair.from),
        };
        pair.from != pair.to
            && quote.fair.is_some_and(|f| f > UD64::ZERO)
            && quote.from_amount > UD64::ZERO
            && quote.to_amount > UD64::ZERO
            && correct_side
    }

    /// Parameters of the swap transaction for the current form.
    ///
    /// # Errors
    ///
    /// [`SwapError::Fatal`] when the route markets, the fair price or the
    /// decimals of a mint are missing.
    pub fn swap_params(&self) -> Result<SwapParams, SwapError> {
        let state = self.read();
        let pair = state
            .pair
            .ok_or_else(|| SwapError::InvalidRequest("no token pair selected".to_string()))?;
        if pricing::is_wrap_unwrap(self.resolver.cluster(), &pair.from, &pair.to) {
            return Err(SwapError::InvalidRequest(
                "wrapping the native token is not a market swap".to_string(),
            ));
        }
        let route = state.route.as_ref().ok_or(SwapError::NotFound {
            from: pair.from,
            to: pair.to,
        })?;
        let legs = self
            .legs(route)
            .ok_or_else(|| SwapError::Fatal("route markets are not loaded".to_string()))?;
        let quote = self.quote_of(&state);
        let fair = quote
            .fair
            .ok_or_else(|| SwapError::Fatal("fair price is unavailable".to_string()))?;

        let missing = |mint: &AssetId| SwapError::Fatal(format!("missing decimals of {mint}"));
        let from_market = &legs
            .first()
            .ok_or_else(|| SwapError::Fatal("route has no markets".to_string()))?
            .market;
        let quote_mint = from_market.quote_mint();
        let from_decimals = self
            .decimals(&pair.from, &legs)
            .ok_or_else(|| missing(&pair.from))?;
        let quote_decimals = self
            .decimals(&quote_mint, &legs)
            .ok_or_else(|| missing(&quote_mint))?;
        let to_decimals = self
            .decimals(&pair.to, &legs)
            .ok_or_else(|| missing(&pair.to))?;

        Ok(SwapParams {
            from_mint: pair.from,
            to_mint: pair.to,
            quote_mint,
            amount: Converter::new(from_decimals).to_raw(quote.from_amount)?,
            min_exchange_rate: MinExchangeRate {
                rate: pricing::min_exchange_rate(
                    fair,
                    to_decimals,
                    state.slippage,
                    quote.fee_multiplier,
                )?,
                from_decimals,
                quote_decimals,
                strict: state.strict,
            },
            from_market: from_market.address(),
            to_market: route.to_market(),
            close_new_accounts: state.close_new_accounts,
            referral: state
                .referral
                .and_then(|owner| referral_account(self.resolver.cluster(), &owner, &quote_mint)),
        })
    }

    /// Builds the swap parameters and hands them to the executor.
    pub async fn submit(&self) -> Result<SwapParams, SwapError> {
        if !self.can_swap() {
            return Err(SwapError::InvalidRequest(
                "swap is not available for the current form".to_string(),
            ));
        }
        let params = self.swap_params()?;
        self.executor.execute(params.clone()).await?;
        info!(
            from = %params.from_mint,
            to = %params.to_mint,
            amount = params.amount,
            min_rate = params.min_exchange_rate.rate,
            "swap submitted"
        );
        Ok(params)
    }
}

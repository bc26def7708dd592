use std::{sync::Arc, time::Duration};

use futures::{Stream, StreamExt, stream};
use tracing::debug;

use crate::{
    client::{AccountSubscriber, MarketLoader},
    error::SwapError,
    state::MarketCache,
    types::{BookSide, MarketAddress, MarketHandle},
};

/// Result of one polling round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollTick {
    /// Markets whose snapshot was replaced.
    pub refreshed: usize,
    pub markets: usize,
}

/// Book-side change delivered by an account subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BookUpdate {
    pub market: MarketAddress,
    pub side: BookSide,
    /// `false` when the top of the book did not move and the cached side was
    /// kept.
    pub changed: bool,
}

/// Returns endless stream of polling rounds refreshing the books of the given
/// markets in the cache, one round per `interval`, starting after the first
/// interval.
///
/// Markets that are not loaded yet are loaded on the way, failed refreshes
/// keep the previous snapshot (see [`MarketCache::refresh_books`]).
pub fn poll<L, S, SFut>(
    cache: Arc<MarketCache<L>>,
    markets: Vec<MarketAddress>,
    interval: Duration,
    sleep: S,
) -> impl Stream<Item = PollTick>
where
    L: MarketLoader,
    S: Fn(Duration) -> SFut + Copy,
    SFut: Future<Output = ()>,
{
    stream::unfold((cache, markets), move |(cache, markets)| async move {
        sleep(interval).await;
        for market in &markets {
            if cache.market(market).is_none() {
                // Errors are logged by the cache, the market is retried next round
                _ = cache.get_market(*market).await;
            }
        }
        let refreshed = cache.refresh_books(&markets).await;
        debug!(refreshed, markets = markets.len(), "polled order books");
        let tick = PollTick {
            refreshed,
            markets: markets.len(),
        };
        Some((tick, (cache, markets)))
    })
}

/// Returns stream of book-side changes of the market, decoded from account
/// change notifications of both book sides.
///
/// The cached side is replaced only when its best price changed, so a
/// notification carrying an older state of the same top of book never
/// overwrites a snapshot fetched by polling.
pub fn book_side_updates<L, A>(
    cache: Arc<MarketCache<L>>,
    subscriber: &A,
    market: Arc<MarketHandle>,
) -> impl Stream<Item = Result<BookUpdate, SwapError>> + Send + 'static + use<L, A>
where
    L: MarketLoader + 'static,
    A: AccountSubscriber + ?Sized + 'static,
{
    let side_updates = |side: BookSide| {
        subscriber
            .subscribe(market.book_side_address(side))
            .map(move |data| (side, data))
    };
    stream::select(side_updates(BookSide::Bids), side_updates(BookSide::Asks)).map(
        move |(side, data)| -> Result<BookUpdate, SwapError> {
            let decoded = cache.loader().decode_book_side(&market, side, &data)?;
            let changed = cache.replace_side_if_top_changed(market.address(), decoded);
            debug!(market = %market.address(), %side, changed, "book side update");
            Ok(BookUpdate {
                market: market.address(),
                side,
                changed,
            })
        },
    )
}

/// Merged [`book_side_updates`] of all given markets.
pub fn route_updates<L, A>(
    cache: Arc<MarketCache<L>>,
    subscriber: &A,
    markets: Vec<Arc<MarketHandle>>,
) -> impl Stream<Item = Result<BookUpdate, SwapError>> + Send + 'static + use<L, A>
where
    L: MarketLoader + 'static,
    A: AccountSubscriber + ?Sized + 'static,
{
    stream::select_all(
        markets
            .into_iter()
            .map(|market| book_side_updates(cache.clone(), subscriber, market).boxed()),
    )
}

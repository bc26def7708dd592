use fastnum::{UD64, udec64};

use crate::{
    error::SwapError,
    state::OrderBook,
    types::{AssetId, MarketHandle},
};

/// Estimated price movement, in percent, caused by taking `size` from the
/// side of the book a taker receiving `to` consumes.
///
/// `size` is the output amount of the trade. The walk stops at the
/// last visible level when the book is too thin, so the impact of trades
/// larger than the visible depth is underestimated.
pub fn price_impact(
    book: &OrderBook,
    market: &MarketHandle,
    to: &AssetId,
    size: UD64,
) -> Result<UD64, SwapError> {
    let walk = book
        .side(market.taker_side(to))
        .walk(size)
        .filter(|w| w.first_price > UD64::ZERO)
        .ok_or(SwapError::Unavailable("price impact"))?;
    let change = if walk.first_price > walk.last_price {
        walk.first_price - walk.last_price
    } else {
        walk.last_price - walk.first_price
    };
    Ok(change * udec64!(100) / walk.first_price)
}

//! Order book snapshot.
//!
//! A snapshot is a pair of sorted book sides, each replaced as a whole on
//! refresh. No incremental diffing is done: a newer side simply supersedes the
//! older one.

mod error;
mod level;

#[cfg(test)]
mod tests;

pub use error::{BookError, BookResult};
pub use level::PriceLevel;

use fastnum::{UD64, udec64};
use itertools::{FoldWhile, Itertools};

use crate::types::BookSide;

/// One side of the order book, sorted away from the spread.
#[derive(Clone, derive_more::Debug, PartialEq)]
pub struct OrderBookSide {
    side: BookSide,
    #[debug("{levels:?}")]
    levels: Vec<PriceLevel>,
}

/// Best bid and offer of the book.
///
/// `mid` is defined only when both sides are present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bbo {
    pub best_bid: Option<UD64>,
    pub best_offer: Option<UD64>,
    pub mid: Option<UD64>,
}

/// Result of walking a book side to fill a requested size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BookWalk {
    /// Price of the best level.
    pub first_price: UD64,
    /// Price of the last level the walk touched.
    pub last_price: UD64,
    /// Size covered by the visible levels.
    pub filled: UD64,
    /// Size the visible levels could not cover.
    pub unfilled: UD64,
}

/// Bids and asks of a single market.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderBook {
    bids: OrderBookSide,
    asks: OrderBookSide,
}

impl OrderBookSide {
    /// Creates a book side from levels in any order. Levels sharing a price
    /// are merged, so prices are strictly monotonic from the best level.
    ///
    /// # Errors
    ///
    /// Returns an error if any level has zero price or zero size.
    pub fn new(side: BookSide, mut levels: Vec<PriceLevel>) -> BookResult<Self> {
        for level in &levels {
            if level.price() == UD64::ZERO {
                return Err(BookError::InvalidPrice {
                    side,
                    price: level.price(),
                });
            }
            if level.size() == UD64::ZERO {
                return Err(BookError::InvalidSize {
                    side,
                    price: level.price(),
                    size: level.size(),
                });
            }
        }
        match side {
            BookSide::Bids => levels.sort_by(|a, b| b.price().cmp(&a.price())),
            BookSide::Asks => levels.sort_by(|a, b| a.price().cmp(&b.price())),
        }
        let levels = levels
            .into_iter()
            .coalesce(|a, b| {
                if a.price() == b.price() {
                    Ok(PriceLevel::new(a.price(), a.size() + b.size()))
                } else {
                    Err((a, b))
                }
            })
            .collect();
        Ok(Self { side, levels })
    }

    pub fn empty(side: BookSide) -> Self {
        Self {
            side,
            levels: Vec::new(),
        }
    }

    pub fn side(&self) -> BookSide {
        self.side
    }

    /// Levels sorted away from the spread.
    pub fn levels(&self) -> &[PriceLevel] {
        &self.levels
    }

    pub fn best(&self) -> Option<PriceLevel> {
        self.levels.first().copied()
    }

    pub fn best_price(&self) -> Option<UD64> {
        self.best().map(|l| l.price())
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Total visible size.
    pub fn depth(&self) -> UD64 {
        self.levels
            .iter()
            .fold(UD64::ZERO, |acc, level| acc + level.size())
    }

    /// Walks the side from the best level, consuming levels until `want_size`
    /// is covered or the visible book is exhausted.
    ///
    /// Returns `None` for an empty side.
    pub fn walk(&self, want_size: UD64) -> Option<BookWalk> {
        let first = self.best()?;
        let (last_price, unfilled) = self
            .levels
            .iter()
            .fold_while(
                (first.price(), want_size),
                |(last_price, unfilled), level| {
                    if unfilled == UD64::ZERO {
                        return FoldWhile::Done((last_price, unfilled));
                    }
                    let unfilled = if unfilled > level.size() {
                        unfilled - level.size()
                    } else {
                        UD64::ZERO
                    };
                    FoldWhile::Continue((level.price(), unfilled))
                },
            )
            .into_inner();
        Some(BookWalk {
            first_price: first.price(),
            last_price,
            filled: want_size - unfilled,
            unfilled,
        })
    }
}

impl OrderBook {
    /// # Errors
    ///
    /// Returns an error if the sides are swapped.
    pub fn new(bids: OrderBookSide, asks: OrderBookSide) -> BookResult<Self> {
        if bids.side() != BookSide::Bids {
            return Err(BookError::SideMismatch {
                expected: BookSide::Bids,
                actual: bids.side(),
            });
        }
        if asks.side() != BookSide::Asks {
            return Err(BookError::SideMismatch {
                expected: BookSide::Asks,
                actual: asks.side(),
            });
        }
        Ok(Self { bids, asks })
    }

    pub fn empty() -> Self {
        Self {
            bids: OrderBookSide::empty(BookSide::Bids),
            asks: OrderBookSide::empty(BookSide::Asks),
        }
    }

    pub fn bids(&self) -> &OrderBookSide {
        &self.bids
    }

    pub fn asks(&self) -> &OrderBookSide {
        &self.asks
    }

    pub fn side(&self, side: BookSide) -> &OrderBookSide {
        match side {
            BookSide::Bids => &self.bids,
            BookSide::Asks => &self.asks,
        }
    }

    /// Replaces one side as a whole.
    pub fn replace_side(&mut self, side: OrderBookSide) {
        match side.side() {
            BookSide::Bids => self.bids = side,
            BookSide::Asks => self.asks = side,
        }
    }

    pub fn bbo(&self) -> Bbo {
        let best_bid = self.bids.best_price();
        let best_offer = self.asks.best_price();
        let mid = match (best_bid, best_offer) {
            (Some(bid), Some(offer)) => Some((bid + offer) / udec64!(2)),
            _ => None,
        };
        Bbo {
            best_bid,
            best_offer,
            mid,
        }
    }
}

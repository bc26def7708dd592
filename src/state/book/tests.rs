//! Tests for order book snapshots.

use fastnum::udec64;

use super::*;

/// Build a book side from `(price, size)` literals.
/// side!(Bids, [(10, 5), (9.5, 2)])
macro_rules! side {
    ($side:ident, [$(($price:expr, $size:expr)),* $(,)?]) => {
        OrderBookSide::new(
            BookSide::$side,
            vec![$(PriceLevel::new(udec64!($price), udec64!($size))),*],
        )
        .expect("valid book side")
    };
}

fn prices(side: &OrderBookSide) -> Vec<UD64> {
    side.levels().iter().map(|l| l.price()).collect()
}

#[test]
fn bids_sorted_descending() {
    let bids = side!(Bids, [(9.5, 1), (10, 2), (9.9, 3)]);
    assert_eq!(prices(&bids), vec![udec64!(10), udec64!(9.9), udec64!(9.5)]);
    assert_eq!(bids.best_price(), Some(udec64!(10)));
}

#[test]
fn asks_sorted_ascending() {
    let asks = side!(Asks, [(10.5, 1), (10.2, 2), (11, 3)]);
    assert_eq!(prices(&asks), vec![udec64!(10.2), udec64!(10.5), udec64!(11)]);
    assert_eq!(asks.best_price(), Some(udec64!(10.2)));
    assert_eq!(asks.depth(), udec64!(6));
}

#[test]
fn same_price_levels_merged() {
    let bids = side!(Bids, [(10, 2), (9.5, 1), (10, 3)]);
    assert_eq!(prices(&bids), vec![udec64!(10), udec64!(9.5)]);
    assert_eq!(bids.best().map(|l| l.size()), Some(udec64!(5)));
    assert_eq!(bids.depth(), udec64!(6));
}

#[test]
fn rejects_zero_price_and_size() {
    assert_eq!(
        OrderBookSide::new(
            BookSide::Asks,
            vec![PriceLevel::new(UD64::ZERO, udec64!(1))]
        ),
        Err(BookError::InvalidPrice {
            side: BookSide::Asks,
            price: UD64::ZERO
        })
    );
    assert!(matches!(
        OrderBookSide::new(
            BookSide::Bids,
            vec![PriceLevel::new(udec64!(1), UD64::ZERO)]
        ),
        Err(BookError::InvalidSize { .. })
    ));
}

#[test]
fn rejects_swapped_sides() {
    let bids = side!(Bids, [(10, 1)]);
    let asks = side!(Asks, [(11, 1)]);
    assert_eq!(
        OrderBook::new(asks.clone(), bids.clone()),
        Err(BookError::SideMismatch {
            expected: BookSide::Bids,
            actual: BookSide::Asks
        })
    );
    assert!(OrderBook::new(bids, asks).is_ok());
}

#[test]
fn bbo_both_sides() {
    let book = OrderBook::new(side!(Bids, [(10, 1), (9, 1)]), side!(Asks, [(10.2, 1)])).unwrap();
    assert_eq!(
        book.bbo(),
        Bbo {
            best_bid: Some(udec64!(10)),
            best_offer: Some(udec64!(10.2)),
            mid: Some(udec64!(10.1)),
        }
    );
}

#[test]
fn bbo_one_side_has_no_mid() {
    let book = OrderBook::new(side!(Bids, [(10, 1)]), OrderBookSide::empty(BookSide::Asks)).unwrap();
    assert_eq!(
        book.bbo(),
        Bbo {
            best_bid: Some(udec64!(10)),
            best_offer: None,
            mid: None,
        }
    );
    assert_eq!(OrderBook::empty().bbo(), Bbo::default());
}

#[test]
fn replace_side_swaps_whole_side() {
    let mut book = OrderBook::new(side!(Bids, [(10, 1), (9, 4)]), side!(Asks, [(11, 1)])).unwrap();
    book.replace_side(side!(Bids, [(8, 2)]));
    assert_eq!(prices(book.bids()), vec![udec64!(8)]);
    assert_eq!(prices(book.asks()), vec![udec64!(11)]);
}

#[test]
fn walk_partially_consumes_second_level() {
    let asks = side!(Asks, [(10, 5), (10.5, 5)]);
    let walk = asks.walk(udec64!(7)).unwrap();
    assert_eq!(walk.first_price, udec64!(10));
    assert_eq!(walk.last_price, udec64!(10.5));
    assert_eq!(walk.filled, udec64!(7));
    assert_eq!(walk.unfilled, UD64::ZERO);
}

#[test]
fn walk_stops_at_covering_level() {
    let asks = side!(Asks, [(10, 5), (10.5, 5), (12, 5)]);
    let walk = asks.walk(udec64!(5)).unwrap();
    assert_eq!(walk.last_price, udec64!(10));
}

#[test]
fn walk_exhausted_book_stops_at_last_level() {
    let bids = side!(Bids, [(10, 1), (9, 1)]);
    let walk = bids.walk(udec64!(5)).unwrap();
    assert_eq!(walk.first_price, udec64!(10));
    assert_eq!(walk.last_price, udec64!(9));
    assert_eq!(walk.filled, udec64!(2));
    assert_eq!(walk.unfilled, udec64!(3));
}

#[test]
fn walk_empty_side() {
    assert_eq!(OrderBookSide::empty(BookSide::Asks).walk(udec64!(1)), None);
}

#[test]
fn walk_zero_size_stays_at_top() {
    let asks = side!(Asks, [(10, 5), (10.5, 5)]);
    let walk = asks.walk(UD64::ZERO).unwrap();
    assert_eq!(walk.last_price, udec64!(10));
    assert_eq!(walk.filled, UD64::ZERO);
}

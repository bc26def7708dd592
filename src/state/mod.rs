//! Market data state.
//!
//! [`MarketCache`] memoizes market metadata and keeps the latest
//! [`OrderBook`] snapshot of every market it was asked to refresh. Snapshots
//! are kept fresh either by periodic polling ([`crate::stream::poll`]) or by
//! book-side account change notifications ([`crate::stream::book_side_updates`]).

mod book;
mod cache;

pub use book::*;
pub use cache::*;

//! Fair price, price impact and minimum exchange rate of a trade.
//!
//! All arithmetic is exact decimal math on [`fastnum::UD64`], raw token
//! amounts are produced by flooring.

mod fair;
mod impact;
mod quote;

pub use fair::*;
pub use impact::*;
pub use quote::*;

//! Aggregated price level of a book side.

use fastnum::UD64;

/// Total resting size at a single price.
#[derive(Clone, Copy, derive_more::Debug, PartialEq, Eq)]
#[debug("{price}x{size}")]
pub struct PriceLevel {
    price: UD64,
    size: UD64,
}

impl PriceLevel {
    pub fn new(price: UD64, size: UD64) -> Self {
        Self { price, size }
    }

    pub fn price(&self) -> UD64 {
        self.price
    }

    pub fn size(&self) -> UD64 {
        self.size
    }
}

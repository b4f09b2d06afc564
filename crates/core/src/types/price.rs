//! Type-safe price representation.

use serde::{Deserialize, Serialize};

/// A catalog or order price in whole currency units (MXN).
///
/// The store sells fixed-price digital goods with whole-peso price points,
/// so prices are plain integers rather than decimals. The value is always
/// positive for catalog entries (enforced at catalog load).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// Create a new price from a whole-unit amount.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Get the underlying whole-unit amount.
    #[must_use]
    pub const fn amount(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${} MXN", self.0)
    }
}

impl From<i64> for Price {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

impl From<Price> for i64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

//! Quantity types for litres and prices, and the rounding rules that go with them.

use rust_decimal::{Decimal, RoundingStrategy};

/// Price per litre (or any currency amount), represented as a Decimal for precision.
pub type Price = Decimal;

/// Oil volume in litres.
pub type Litres = Decimal;

/// Round a litre figure to one decimal place.
#[must_use]
pub fn round_litres(value: Litres) -> Litres {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a currency figure to cents.
#[must_use]
pub fn round_cents(value: Price) -> Price {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to a whole number.
#[must_use]
pub fn round_whole(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

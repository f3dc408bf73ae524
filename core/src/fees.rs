//! Platform fee splitting.
//!
//! The platform takes a configured percentage of each paid order; the
//! organizer receives the remainder. The fee rounds half-up, which is
//! financially observable: on a 5-minor-unit amount at 10%, the fee is 1,
//! not 0.

use crate::types::Money;

/// Result of splitting an order total between platform and organizer.
///
/// Invariant: `platform_fee + organizer_take_home == amount` exactly, and
/// neither side is negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeSplit {
    /// Platform's cut.
    pub platform_fee: Money,
    /// Organizer's cut.
    pub organizer_take_home: Money,
}

/// Splits `amount` at `platform_fee_percent` (clamped to 0..=100).
///
/// The fee is `round_half_up(amount * percent / 100)`; the take-home is the
/// exact remainder, so the two always sum to `amount`.
#[must_use]
pub fn split(amount: Money, platform_fee_percent: u8) -> FeeSplit {
    let percent = u128::from(platform_fee_percent.min(100));
    // round-half-up: floor((amount * percent + 50) / 100), widened so the
    // intermediate product cannot overflow
    let fee_minor = (u128::from(amount.minor()) * percent + 50) / 100;
    #[allow(clippy::cast_possible_truncation)] // fee <= amount, which fits u64
    let platform_fee = Money::from_minor((fee_minor as u64).min(amount.minor()));
    FeeSplit {
        platform_fee,
        organizer_take_home: amount.saturating_sub(platform_fee),
    }
}

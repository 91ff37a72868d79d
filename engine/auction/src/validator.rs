//! Pre-trade checks for incoming orders

use crate::error::{MarketError, Result};
use crate::{DuplicateScope, OrderBook, ParticipantId, Price, Qty, Side};

/// Structural and balance checks. Buy orders are deliberately not checked
/// against cash: buyers may run a negative balance until the round closes.
pub fn validate(
    holding: Qty,
    side: Side,
    price: Price,
    quantity: Qty,
    resource: &str,
) -> Result<()> {
    if price <= 0 || quantity <= 0 {
        return Err(MarketError::InvalidOrder { price, quantity });
    }
    if price.checked_mul(quantity).is_none() {
        return Err(MarketError::ValueOverflow { price, quantity });
    }
    if side == Side::Sell && quantity > holding {
        return Err(MarketError::InsufficientResources {
            requested: quantity,
            available: holding,
            resource: resource.to_string(),
        });
    }
    Ok(())
}

/// Reject terms that already rest on the same side.
pub fn check_duplicate(
    book: &OrderBook,
    scope: DuplicateScope,
    participant_id: ParticipantId,
    side: Side,
    price: Price,
    quantity: Qty,
) -> Result<()> {
    let taken = match scope {
        DuplicateScope::AnyParticipant => book.contains_terms(side, price, quantity),
        DuplicateScope::SameParticipant => book.contains_exact(participant_id, side, price, quantity),
    };
    if taken {
        return Err(MarketError::DuplicateOrder { side, price, quantity });
    }
    Ok(())
}

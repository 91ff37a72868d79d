use crate::{ParticipantId, Price, Qty, Side};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A resting or incoming order. Identity is the (participant, price, quantity) triple;
/// there is no separate order id.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Order {
    pub participant_id: ParticipantId,
    pub price: Price,
    pub quantity: Qty,
    pub side: Side,
}

impl Order {
    pub fn new(participant_id: ParticipantId, side: Side, price: Price, quantity: Qty) -> Self {
        Self { participant_id, price, quantity, side }
    }

    #[inline]
    pub fn buy(participant_id: ParticipantId, price: Price, quantity: Qty) -> Self {
        Self::new(participant_id, Side::Buy, price, quantity)
    }

    #[inline]
    pub fn sell(participant_id: ParticipantId, price: Price, quantity: Qty) -> Self {
        Self::new(participant_id, Side::Sell, price, quantity)
    }

    #[inline]
    pub fn has_terms(&self, price: Price, quantity: Qty) -> bool {
        self.price == price && self.quantity == quantity
    }

    /// Whether this resting order would trade against `incoming` on price alone.
    #[inline]
    pub fn crosses(&self, incoming: &Order) -> bool {
        match incoming.side {
            Side::Buy => self.price <= incoming.price,
            Side::Sell => self.price >= incoming.price,
        }
    }
}

/// Best-first ordering for one side: buys by price desc, sells by price asc,
/// ties broken by ascending participant id.
pub fn best_first(side: Side, a: &Order, b: &Order) -> Ordering {
    let by_price = match side {
        Side::Buy => b.price.cmp(&a.price),
        Side::Sell => a.price.cmp(&b.price),
    };
    by_price.then_with(|| a.participant_id.cmp(&b.participant_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crosses_respects_side() {
        let resting_sell = Order::sell(2, 12, 5);
        assert!(resting_sell.crosses(&Order::buy(1, 15, 5)));
        assert!(resting_sell.crosses(&Order::buy(1, 12, 5)));
        assert!(!resting_sell.crosses(&Order::buy(1, 11, 5)));

        let resting_buy = Order::buy(2, 12, 5);
        assert!(resting_buy.crosses(&Order::sell(1, 10, 5)));
        assert!(!resting_buy.crosses(&Order::sell(1, 13, 5)));
    }

    #[test]
    fn best_first_ties_by_participant() {
        let mut sells = vec![Order::sell(3, 12, 5), Order::sell(1, 12, 5), Order::sell(2, 10, 5)];
        sells.sort_by(|a, b| best_first(Side::Sell, a, b));
        let ids: Vec<_> = sells.iter().map(|o| o.participant_id).collect();
        assert_eq!(ids, vec![2, 1, 3]);

        let mut buys = vec![Order::buy(3, 12, 5), Order::buy(1, 12, 5), Order::buy(2, 14, 5)];
        buys.sort_by(|a, b| best_first(Side::Buy, a, b));
        let ids: Vec<_> = buys.iter().map(|o| o.participant_id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }
}

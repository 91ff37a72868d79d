// engine/auction/src/matching.rs
//
// Exact-quantity matching: a resting order is eligible only when its quantity
// equals the incoming quantity. Partial fills never happen.

use crate::order::best_first;
use crate::{Order, OrderBook};

/// Best eligible counter-order for `incoming`, if any.
///
/// Eligible means: opposite side, different participant, price crosses, same quantity.
/// Best means lowest ask for a buy, highest bid for a sell, then lowest participant id.
pub fn find_counter_order(book: &OrderBook, incoming: &Order) -> Option<Order> {
    let counter_side = incoming.side.opposite();
    book.side(counter_side)
        .iter()
        .filter(|c| c.participant_id != incoming.participant_id)
        .filter(|c| c.quantity == incoming.quantity)
        .filter(|c| c.crosses(incoming))
        .min_by(|a, b| best_first(counter_side, a, b))
        .copied()
}

/// A matched pair ready for settlement. Price is always the resting order's.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Fill {
    pub buyer_id: crate::ParticipantId,
    pub seller_id: crate::ParticipantId,
    pub price: crate::Price,
    pub quantity: crate::Qty,
    /// The resting order this fill consumes.
    pub resting: Order,
}

impl Fill {
    /// Fill for an incoming order crossing `resting`.
    pub fn against(incoming: &Order, resting: Order) -> Self {
        let (buyer_id, seller_id) = match incoming.side {
            crate::Side::Buy => (incoming.participant_id, resting.participant_id),
            crate::Side::Sell => (resting.participant_id, incoming.participant_id),
        };
        Self { buyer_id, seller_id, price: resting.price, quantity: incoming.quantity, resting }
    }

    /// Fill for a participant taking a specific resting order.
    pub fn accepting(acceptor: crate::ParticipantId, resting: Order) -> Self {
        let (buyer_id, seller_id) = match resting.side {
            crate::Side::Buy => (resting.participant_id, acceptor),
            crate::Side::Sell => (acceptor, resting.participant_id),
        };
        Self { buyer_id, seller_id, price: resting.price, quantity: resting.quantity, resting }
    }

    /// Cash that changes hands, or `None` when it does not fit in `Cash`.
    #[inline]
    pub fn total_value(&self) -> Option<crate::Cash> {
        self.price.checked_mul(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Side;

    #[test]
    fn picks_lowest_ask_for_buy() {
        let mut b = OrderBook::new();
        b.add(Order::sell(2, 14, 5));
        b.add(Order::sell(3, 12, 5));
        b.add(Order::sell(4, 13, 5));
        let got = find_counter_order(&b, &Order::buy(1, 15, 5)).unwrap();
        assert_eq!((got.participant_id, got.price), (3, 12));
    }

    #[test]
    fn picks_highest_bid_for_sell() {
        let mut b = OrderBook::new();
        b.add(Order::buy(2, 11, 4));
        b.add(Order::buy(3, 13, 4));
        let got = find_counter_order(&b, &Order::sell(1, 10, 4)).unwrap();
        assert_eq!(got.participant_id, 3);
    }

    #[test]
    fn ties_go_to_lowest_participant_id() {
        let mut b = OrderBook::new();
        b.add(Order::sell(7, 12, 5));
        b.add(Order::sell(4, 12, 5));
        let got = find_counter_order(&b, &Order::buy(1, 12, 5)).unwrap();
        assert_eq!(got.participant_id, 4);
    }

    #[test]
    fn quantity_must_match_exactly() {
        let mut b = OrderBook::new();
        b.add(Order::sell(2, 10, 6));
        b.add(Order::sell(3, 10, 4));
        assert!(find_counter_order(&b, &Order::buy(1, 12, 5)).is_none());
    }

    #[test]
    fn never_matches_own_orders() {
        let mut b = OrderBook::new();
        b.add(Order::sell(1, 10, 5));
        assert!(find_counter_order(&b, &Order::buy(1, 12, 5)).is_none());
        b.add(Order::sell(2, 11, 5));
        assert_eq!(find_counter_order(&b, &Order::buy(1, 12, 5)).unwrap().participant_id, 2);
    }

    #[test]
    fn fill_uses_resting_price() {
        let incoming = Order::buy(1, 15, 5);
        let fill = Fill::against(&incoming, Order::sell(2, 12, 5));
        assert_eq!((fill.buyer_id, fill.seller_id, fill.price, fill.quantity), (1, 2, 12, 5));
        assert_eq!(fill.total_value(), Some(60));

        let fill = Fill::accepting(3, Order::buy(4, 9, 2));
        assert_eq!((fill.buyer_id, fill.seller_id), (4, 3));
        assert_eq!(fill.resting.side, Side::Buy);
    }
}

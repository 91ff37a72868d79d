// engine/auction/src/book.rs

use crate::order::best_first;
use crate::{Order, ParticipantId, Price, Qty, Side};
use serde::{Deserialize, Serialize};

/// Persisted shape of one resting order: `[participant_id, price, quantity]`.
type OrderTuple = (ParticipantId, Price, Qty);

#[derive(Serialize, Deserialize)]
struct BookRecord {
    #[serde(default)]
    buys: Vec<OrderTuple>,
    #[serde(default)]
    sells: Vec<OrderTuple>,
}

/// Two-sided book for one group and one round.
///
/// Orders are kept in insertion order; ranking is applied on read
/// (`sorted`) rather than maintained on write.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BookRecord", into = "BookRecord")]
pub struct OrderBook {
    buys: Vec<Order>,
    sells: Vec<Order>,
}

impl From<BookRecord> for OrderBook {
    fn from(rec: BookRecord) -> Self {
        let lift = |side: Side, rows: Vec<OrderTuple>| {
            rows.into_iter().map(|(pid, price, qty)| Order::new(pid, side, price, qty)).collect()
        };
        Self { buys: lift(Side::Buy, rec.buys), sells: lift(Side::Sell, rec.sells) }
    }
}

impl From<OrderBook> for BookRecord {
    fn from(book: OrderBook) -> Self {
        let flat = |orders: Vec<Order>| {
            orders.into_iter().map(|o| (o.participant_id, o.price, o.quantity)).collect()
        };
        Self { buys: flat(book.buys), sells: flat(book.sells) }
    }
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn orders_mut(&mut self, side: Side) -> &mut Vec<Order> {
        match side {
            Side::Buy => &mut self.buys,
            Side::Sell => &mut self.sells,
        }
    }

    /// Raw side contents in insertion order.
    #[inline]
    pub fn side(&self, side: Side) -> &[Order] {
        match side {
            Side::Buy => &self.buys,
            Side::Sell => &self.sells,
        }
    }

    /// Append to the order's side. No ranking happens here.
    pub fn add(&mut self, order: Order) {
        tracing::debug!(
            participant = order.participant_id,
            side = %order.side,
            price = order.price,
            quantity = order.quantity,
            "order rested"
        );
        self.orders_mut(order.side).push(order);
    }

    /// Remove every order of `participant_id` on `side`. Returns how many were removed.
    pub fn remove_all(&mut self, participant_id: ParticipantId, side: Side) -> usize {
        let orders = self.orders_mut(side);
        let before = orders.len();
        orders.retain(|o| o.participant_id != participant_id);
        let removed = before - orders.len();
        if removed > 0 {
            tracing::debug!(participant = participant_id, side = %side, removed, "orders cancelled");
        }
        removed
    }

    /// Remove the first order matching all three fields. Returns whether one was found.
    pub fn remove_exact(
        &mut self,
        participant_id: ParticipantId,
        price: Price,
        quantity: Qty,
        side: Side,
    ) -> bool {
        let orders = self.orders_mut(side);
        match orders
            .iter()
            .position(|o| o.participant_id == participant_id && o.has_terms(price, quantity))
        {
            Some(i) => {
                orders.remove(i);
                true
            }
            None => false,
        }
    }

    /// Whether any participant rests an order with these terms on `side`.
    pub fn contains_terms(&self, side: Side, price: Price, quantity: Qty) -> bool {
        self.side(side).iter().any(|o| o.has_terms(price, quantity))
    }

    /// Whether `participant_id` rests an order with these terms on `side`.
    pub fn contains_exact(
        &self,
        participant_id: ParticipantId,
        side: Side,
        price: Price,
        quantity: Qty,
    ) -> bool {
        self.side(side)
            .iter()
            .any(|o| o.participant_id == participant_id && o.has_terms(price, quantity))
    }

    /// Side contents ranked best-first.
    pub fn sorted(&self, side: Side) -> Vec<Order> {
        let mut out = self.side(side).to_vec();
        out.sort_by(|a, b| best_first(side, a, b));
        out
    }

    /// One participant's orders on a side, ranked best-first.
    pub fn orders_of(&self, participant_id: ParticipantId, side: Side) -> Vec<Order> {
        let mut out: Vec<Order> =
            self.side(side).iter().filter(|o| o.participant_id == participant_id).copied().collect();
        out.sort_by(|a, b| best_first(side, a, b));
        out
    }

    /// Sum of quantity across the participant's resting sell orders.
    pub fn locked_quantity(&self, participant_id: ParticipantId) -> Qty {
        self.sells.iter().filter(|o| o.participant_id == participant_id).map(|o| o.quantity).sum()
    }

    #[inline]
    pub fn len(&self, side: Side) -> usize {
        self.side(side).len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buys.is_empty() && self.sells.is_empty()
    }

    pub fn clear(&mut self) {
        self.buys.clear();
        self.sells.clear();
    }
}

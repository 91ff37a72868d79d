//! Per-participant read model of one group's market

use crate::account::{Account, ResourceAccessor, TradeStats};
use crate::ledger::{PriceTick, TradeRecord};
use crate::order::best_first;
use crate::{AuctionConfig, Cash, GroupState, Order, ParticipantId, Price, Qty, Side};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One order as shown to participants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferView {
    pub player_id: ParticipantId,
    pub price: Price,
    pub quantity: Qty,
}

impl From<&Order> for OfferView {
    fn from(o: &Order) -> Self {
        Self { player_id: o.participant_id, price: o.price, quantity: o.quantity }
    }
}

/// A ledger entry annotated for the viewer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeView {
    #[serde(flatten)]
    pub trade: TradeRecord,
    pub is_buyer: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: NotificationKind::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: NotificationKind::Error, message: message.into() }
    }
}

/// What one participant sees after every market event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketStateView {
    pub participant_id: ParticipantId,
    pub cash: Cash,
    pub holding: Qty,
    pub resource: String,
    pub stats: TradeStats,
    pub my_buy_offers: Vec<OfferView>,
    pub my_sell_offers: Vec<OfferView>,
    pub buy_offers: Vec<OfferView>,
    pub sell_offers: Vec<OfferView>,
    pub trade_history: Vec<TradeView>,
    pub price_history: Vec<PriceTick>,
    pub locked_cash: Cash,
    pub locked_permits: Qty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

impl MarketStateView {
    pub fn with_notification(mut self, notification: Option<Notification>) -> Self {
        self.notification = notification;
        self
    }
}

/// Public view of one side: at most `depth` orders per distinct quantity,
/// best price first, ties by participant id. The viewer's own orders are included.
pub fn public_offers(orders: &[Order], side: Side, depth: usize) -> Vec<OfferView> {
    let mut buckets: BTreeMap<Qty, Vec<Order>> = BTreeMap::new();
    for o in orders {
        buckets.entry(o.quantity).or_default().push(*o);
    }

    let mut shown: Vec<Order> = Vec::new();
    for bucket in buckets.values_mut() {
        bucket.sort_by(|a, b| best_first(side, a, b));
        shown.extend(bucket.iter().take(depth));
    }
    shown.sort_by(|a, b| best_first(side, a, b));
    shown.iter().map(OfferView::from).collect()
}

pub fn project<P: Account>(
    state: &GroupState,
    participant: &P,
    accessor: &dyn ResourceAccessor<P>,
    config: &AuctionConfig,
) -> MarketStateView {
    let id = participant.id();
    let book = &state.book;
    let views = |orders: Vec<Order>| orders.iter().map(OfferView::from).collect::<Vec<_>>();

    let trades = state.trades.all();
    let skip = config.history_window.apply(trades);
    let trade_history = trades[skip..]
        .iter()
        .map(|t| TradeView { trade: t.clone(), is_buyer: t.buyer_id == id })
        .collect();

    MarketStateView {
        participant_id: id,
        cash: participant.cash(),
        holding: accessor.holding(participant),
        resource: accessor.label().to_string(),
        stats: *participant.stats(),
        my_buy_offers: views(book.orders_of(id, Side::Buy)),
        my_sell_offers: views(book.orders_of(id, Side::Sell)),
        buy_offers: public_offers(book.side(Side::Buy), Side::Buy, config.display_depth),
        sell_offers: public_offers(book.side(Side::Sell), Side::Sell, config.display_depth),
        trade_history,
        price_history: state.prices.all().to_vec(),
        locked_cash: 0,
        locked_permits: book.locked_quantity(id),
        notification: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::testing::{permits, Desk};
    use crate::ledger::TradeRecord;
    use crate::HistoryWindow;

    #[test]
    fn public_view_caps_each_quantity_bucket() {
        let orders: Vec<Order> = vec![
            Order::sell(1, 15, 5),
            Order::sell(2, 12, 5),
            Order::sell(3, 14, 5),
            Order::sell(4, 13, 5),
            Order::sell(5, 20, 2),
        ];
        let shown = public_offers(&orders, Side::Sell, 3);
        let prices: Vec<_> = shown.iter().map(|o| (o.price, o.quantity)).collect();
        assert_eq!(prices, vec![(12, 5), (13, 5), (14, 5), (20, 2)]);
    }

    #[test]
    fn public_view_orders_buys_high_to_low_with_id_ties() {
        let orders = vec![Order::buy(4, 9, 1), Order::buy(2, 11, 3), Order::buy(1, 11, 2)];
        let shown = public_offers(&orders, Side::Buy, 3);
        let ids: Vec<_> = shown.iter().map(|o| o.player_id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    fn trade(buyer: ParticipantId, seller: ParticipantId) -> TradeRecord {
        TradeRecord {
            timestamp: "00:30".into(),
            buyer_id: buyer,
            seller_id: seller,
            price: 10,
            quantity: 1,
            total_value: 10,
            market_price: 10,
            round: 1,
        }
    }

    #[test]
    fn projection_reports_own_orders_and_locks() {
        let mut state = GroupState::new();
        state.book.add(Order::sell(1, 14, 3));
        state.book.add(Order::sell(1, 16, 2));
        state.book.add(Order::buy(1, 8, 1));
        state.book.add(Order::buy(2, 9, 1));
        state.trades.append(trade(1, 2));
        state.trades.append(trade(2, 3));

        let me = Desk::new(1, 500, 10);
        let view = project(&state, &me, &permits(), &AuctionConfig::default());
        assert_eq!(view.cash, 500);
        assert_eq!(view.holding, 10);
        assert_eq!(view.locked_permits, 5);
        assert_eq!(view.locked_cash, 0);
        assert_eq!(view.my_sell_offers.len(), 2);
        assert_eq!(view.my_buy_offers.len(), 1);
        assert_eq!(view.buy_offers.len(), 2);
        assert_eq!(view.trade_history.len(), 2);
        assert!(view.trade_history[0].is_buyer);
        assert!(!view.trade_history[1].is_buyer);
    }

    #[test]
    fn recent_window_limits_trade_history() {
        let mut state = GroupState::new();
        for _ in 0..12 {
            state.trades.append(trade(1, 2));
        }
        let cfg = AuctionConfig { history_window: HistoryWindow::Recent(10), ..Default::default() };
        let view = project(&state, &Desk::new(1, 0, 0), &permits(), &cfg);
        assert_eq!(view.trade_history.len(), 10);
    }

    #[test]
    fn serialized_view_uses_wire_names() {
        let view = project(&GroupState::new(), &Desk::new(1, 0, 0), &permits(), &AuctionConfig::default())
            .with_notification(Some(Notification::error("nope")));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["notification"]["type"], "error");
        assert_eq!(json["locked_permits"], 0);
        assert!(json["my_buy_offers"].is_array());
    }
}

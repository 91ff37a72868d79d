// engine/auction/src/settlement.rs
//
// Turns a Fill into balance transfers, a ledger entry and a price tick.
// All preconditions are checked before the first write, so a failed
// settlement leaves participants, book and logs exactly as they were.

use crate::account::{Account, ResourceAccessor, Roster};
use crate::error::{MarketError, Result};
use crate::ledger::{PriceEvent, PriceTick, TradeRecord};
use crate::matching::Fill;
use crate::{GroupState, RoundContext, Side};
use chrono::{DateTime, Utc};

pub fn settle<P: Account>(
    state: &mut GroupState,
    roster: &mut Roster<P>,
    accessor: &dyn ResourceAccessor<P>,
    round: &RoundContext,
    now: DateTime<Utc>,
    fill: &Fill,
) -> Result<TradeRecord> {
    if fill.buyer_id == fill.seller_id {
        return Err(MarketError::SelfTrade);
    }

    let missing = |id| {
        if id == fill.resting.participant_id {
            MarketError::CounterpartyNotFound {
                participant_id: id,
                side: fill.resting.side,
                price: fill.resting.price,
                quantity: fill.resting.quantity,
            }
        } else {
            MarketError::UnknownParticipant(id)
        }
    };
    let (buyer_cash, buyer_holding) = match roster.get(&fill.buyer_id) {
        Some(buyer) => (buyer.cash(), accessor.holding(buyer)),
        None => return Err(missing(fill.buyer_id)),
    };
    let (seller_cash, seller_holding) = match roster.get(&fill.seller_id) {
        Some(seller) => (seller.cash(), accessor.holding(seller)),
        None => return Err(missing(fill.seller_id)),
    };
    if seller_holding < fill.quantity {
        return Err(MarketError::InsufficientResources {
            requested: fill.quantity,
            available: seller_holding,
            resource: accessor.label().to_string(),
        });
    }

    let overflow = || MarketError::ValueOverflow { price: fill.price, quantity: fill.quantity };
    let value = fill.total_value().ok_or_else(overflow)?;
    let buyer_cash = buyer_cash.checked_sub(value).ok_or_else(overflow)?;
    let buyer_holding = buyer_holding.checked_add(fill.quantity).ok_or_else(overflow)?;
    let seller_cash = seller_cash.checked_add(value).ok_or_else(overflow)?;

    if let Some(buyer) = roster.get_mut(&fill.buyer_id) {
        buyer.set_cash(buyer_cash);
        accessor.set_holding(buyer, buyer_holding);
        buyer.stats_mut().record_purchase(fill.quantity, value);
    }
    if let Some(seller) = roster.get_mut(&fill.seller_id) {
        seller.set_cash(seller_cash);
        accessor.set_holding(seller, seller_holding - fill.quantity);
        seller.stats_mut().record_sale(fill.quantity, value);
    }

    let timestamp = round.clock.stamp(now);
    let record = TradeRecord {
        timestamp: timestamp.clone(),
        buyer_id: fill.buyer_id,
        seller_id: fill.seller_id,
        price: fill.price,
        quantity: fill.quantity,
        total_value: value,
        market_price: round.market_price,
        round: round.round,
    };
    state.trades.append(record.clone());

    // One fill per participant per side: everything else they had working on
    // that side is withdrawn.
    state.book.remove_all(fill.buyer_id, Side::Buy);
    state.book.remove_all(fill.seller_id, Side::Sell);
    let r = &fill.resting;
    state.book.remove_exact(r.participant_id, r.price, r.quantity, r.side);

    state.prices.append(PriceTick {
        timestamp,
        price: fill.price,
        event: PriceEvent::Trade,
        market_price: round.market_price,
        round: round.round,
    });

    tracing::info!(
        round = round.round,
        buyer = fill.buyer_id,
        seller = fill.seller_id,
        price = fill.price,
        quantity = fill.quantity,
        "trade settled"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::testing::{permits, Desk};
    use crate::account::roster_of;
    use crate::ledger::RoundClock;
    use crate::Order;
    use chrono::TimeZone;

    fn round() -> RoundContext {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        RoundContext::new(2, RoundClock::started(start), 10)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 1, 5).unwrap()
    }

    #[test]
    fn transfers_cash_and_holding_at_resting_price() {
        let mut state = GroupState::new();
        let mut roster = roster_of(vec![Desk::new(1, 1_000, 0), Desk::new(2, 1_000, 10)]);
        let resting = Order::sell(2, 12, 5);
        state.book.add(resting);
        let fill = Fill::against(&Order::buy(1, 15, 5), resting);

        let rec = settle(&mut state, &mut roster, &permits(), &round(), now(), &fill).unwrap();

        assert_eq!(roster[&1].cash, 940);
        assert_eq!(roster[&1].permits, 5);
        assert_eq!(roster[&2].cash, 1_060);
        assert_eq!(roster[&2].permits, 5);
        assert_eq!(roster[&1].stats.total_bought, 5);
        assert_eq!(roster[&2].stats.total_earned, 60);
        assert_eq!(rec.timestamp, "01:05");
        assert_eq!((rec.total_value, rec.market_price, rec.round), (60, 10, 2));
        assert!(state.book.is_empty());
        assert_eq!(state.trades.len(), 1);
        assert_eq!(state.prices.last_price(), Some(12));
    }

    #[test]
    fn cancels_remaining_same_side_orders_of_both_parties() {
        let mut state = GroupState::new();
        let mut roster = roster_of(vec![Desk::new(1, 0, 0), Desk::new(2, 0, 20)]);
        state.book.add(Order::buy(1, 8, 2));
        state.book.add(Order::sell(1, 30, 1));
        state.book.add(Order::sell(2, 12, 5));
        state.book.add(Order::sell(2, 13, 4));
        state.book.add(Order::buy(2, 5, 1));
        let fill = Fill::against(&Order::buy(1, 12, 5), Order::sell(2, 12, 5));

        settle(&mut state, &mut roster, &permits(), &round(), now(), &fill).unwrap();

        assert!(state.book.orders_of(1, Side::Buy).is_empty());
        assert!(state.book.orders_of(2, Side::Sell).is_empty());
        // opposite-side orders survive
        assert_eq!(state.book.orders_of(1, Side::Sell).len(), 1);
        assert_eq!(state.book.orders_of(2, Side::Buy).len(), 1);
    }

    #[test]
    fn buyer_cash_may_go_negative() {
        let mut state = GroupState::new();
        let mut roster = roster_of(vec![Desk::new(1, 10, 0), Desk::new(2, 0, 5)]);
        let fill = Fill::accepting(1, Order::sell(2, 20, 5));
        settle(&mut state, &mut roster, &permits(), &round(), now(), &fill).unwrap();
        assert_eq!(roster[&1].cash, -90);
    }

    #[test]
    fn short_seller_is_rejected_without_side_effects() {
        let mut state = GroupState::new();
        let mut roster = roster_of(vec![Desk::new(1, 100, 0), Desk::new(2, 100, 3)]);
        state.book.add(Order::sell(2, 12, 5));
        let before = (state.clone(), roster.clone());
        let fill = Fill::against(&Order::buy(1, 12, 5), Order::sell(2, 12, 5));

        let err = settle(&mut state, &mut roster, &permits(), &round(), now(), &fill).unwrap_err();
        assert!(matches!(err, MarketError::InsufficientResources { requested: 5, available: 3, .. }));
        assert_eq!((state, roster), before);
    }

    #[test]
    fn cash_overflow_is_rejected_without_side_effects() {
        let mut state = GroupState::new();
        let mut roster = roster_of(vec![Desk::new(1, -100, 0), Desk::new(2, 0, 5)]);
        let resting = Order::sell(2, i64::MAX / 5, 5);
        state.book.add(resting);
        let before = (state.clone(), roster.clone());
        let fill = Fill::against(&Order::buy(1, i64::MAX / 5, 5), resting);

        let err = settle(&mut state, &mut roster, &permits(), &round(), now(), &fill).unwrap_err();
        assert_eq!(err, MarketError::ValueOverflow { price: i64::MAX / 5, quantity: 5 });
        assert_eq!((state, roster), before);
    }

    #[test]
    fn vanished_counterparty_is_reported() {
        let mut state = GroupState::new();
        let mut roster = roster_of(vec![Desk::new(1, 100, 0)]);
        let fill = Fill::against(&Order::buy(1, 12, 5), Order::sell(9, 12, 5));
        let err = settle(&mut state, &mut roster, &permits(), &round(), now(), &fill).unwrap_err();
        assert!(matches!(err, MarketError::CounterpartyNotFound { participant_id: 9, .. }));
        assert_eq!(roster[&1].cash, 100);
        assert!(state.trades.is_empty());
    }
}

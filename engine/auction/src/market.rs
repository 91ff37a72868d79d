// engine/auction/src/market.rs
//
// Per-group, per-round context. Every operation borrows the group's state,
// roster and accessor for exactly its own duration; nothing is global.

use crate::account::{Account, ResourceAccessor, Roster};
use crate::error::{MarketError, Result};
use crate::ledger::{SubmittedOffer, TradeRecord};
use crate::matching::{find_counter_order, Fill};
use crate::projector::{project, MarketStateView, Notification};
use crate::settlement::settle;
use crate::validator::{check_duplicate, validate};
use crate::{AuctionConfig, GroupState, Order, ParticipantId, Price, Qty, RoundContext, Side};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// What an accepted action did to the market.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// No eligible counter-order; the order now rests in the book.
    Rested(Order),
    Traded(TradeRecord),
    Cancelled { side: Side, price: Price, quantity: Qty, removed: usize },
    /// Timeout close: every resting order withdrawn, balances floored at zero.
    RoundClosed { cancelled: usize },
}

impl Outcome {
    /// Success messages keyed by recipient.
    pub fn notifications(&self, actor: ParticipantId, resource: &str) -> BTreeMap<ParticipantId, Notification> {
        let mut out = BTreeMap::new();
        match self {
            Outcome::Traded(t) => {
                out.insert(
                    t.buyer_id,
                    Notification::success(format!(
                        "Trade executed: you bought {} {} at price {}",
                        t.quantity, resource, t.price
                    )),
                );
                out.insert(
                    t.seller_id,
                    Notification::success(format!(
                        "Trade executed: you sold {} {} at price {}",
                        t.quantity, resource, t.price
                    )),
                );
            }
            Outcome::Rested(o) => {
                out.insert(
                    actor,
                    Notification::success(format!(
                        "Order placed: {} {} {} at price {}",
                        o.side, o.quantity, resource, o.price
                    )),
                );
            }
            Outcome::Cancelled { side, price, quantity, removed } if *removed > 0 => {
                out.insert(
                    actor,
                    Notification::success(format!(
                        "Order cancelled: {side} {quantity} {resource} at price {price}"
                    )),
                );
            }
            Outcome::Cancelled { .. } | Outcome::RoundClosed { .. } => {}
        }
        out
    }
}

pub struct Market<'a, P> {
    pub state: &'a mut GroupState,
    pub roster: &'a mut Roster<P>,
    pub accessor: &'a dyn ResourceAccessor<P>,
    pub round: &'a RoundContext,
    pub config: &'a AuctionConfig,
    /// Event time used for every timestamp this operation writes.
    pub now: DateTime<Utc>,
}

impl<'a, P: Account> Market<'a, P> {
    fn holding_of(&self, participant_id: ParticipantId) -> Result<Qty> {
        self.roster
            .get(&participant_id)
            .map(|p| self.accessor.holding(p))
            .ok_or(MarketError::UnknownParticipant(participant_id))
    }

    fn record_offer(&mut self, participant_id: ParticipantId, side: Side, price: Price, quantity: Qty) {
        let entry = SubmittedOffer {
            timestamp: self.round.clock.stamp(self.now),
            direction: side,
            price,
            quantity,
        };
        self.state.submitted_offers.entry(participant_id).or_default().push(entry);
    }

    /// Validate, then match against the best eligible resting order or rest.
    pub fn submit(&mut self, participant_id: ParticipantId, side: Side, price: Price, quantity: Qty) -> Result<Outcome> {
        let holding = self.holding_of(participant_id)?;
        self.record_offer(participant_id, side, price, quantity);

        validate(holding, side, price, quantity, self.accessor.label())?;
        check_duplicate(&self.state.book, self.config.duplicate_scope, participant_id, side, price, quantity)?;

        let incoming = Order::new(participant_id, side, price, quantity);
        let Some(resting) = find_counter_order(&self.state.book, &incoming) else {
            self.state.book.add(incoming);
            return Ok(Outcome::Rested(incoming));
        };

        let fill = Fill::against(&incoming, resting);
        match settle(&mut *self.state, &mut *self.roster, self.accessor, self.round, self.now, &fill) {
            Ok(record) => Ok(Outcome::Traded(record)),
            Err(e) => {
                // The submitter's order is never dropped because the counter-party failed.
                tracing::warn!(
                    participant = participant_id,
                    counterparty = resting.participant_id,
                    error = %e,
                    "settlement failed; resting incoming order"
                );
                self.state.book.add(incoming);
                Ok(Outcome::Rested(incoming))
            }
        }
    }

    /// Take a specific resting order, named by its owner and terms.
    pub fn accept(
        &mut self,
        participant_id: ParticipantId,
        offer_side: Side,
        target_id: ParticipantId,
        price: Price,
        quantity: Qty,
    ) -> Result<Outcome> {
        let holding = self.holding_of(participant_id)?;
        if target_id == participant_id {
            return Err(MarketError::SelfTrade);
        }
        if price <= 0 || quantity <= 0 {
            return Err(MarketError::InvalidOrder { price, quantity });
        }
        if !self.state.book.contains_exact(target_id, offer_side, price, quantity) {
            return Err(MarketError::CounterpartyNotFound {
                participant_id: target_id,
                side: offer_side,
                price,
                quantity,
            });
        }
        // Accepting a bid means selling into it.
        if offer_side == Side::Buy && quantity > holding {
            return Err(MarketError::InsufficientResources {
                requested: quantity,
                available: holding,
                resource: self.accessor.label().to_string(),
            });
        }

        let resting = Order::new(target_id, offer_side, price, quantity);
        let fill = Fill::accepting(participant_id, resting);
        settle(&mut *self.state, &mut *self.roster, self.accessor, self.round, self.now, &fill).map(Outcome::Traded)
    }

    /// Withdraw the participant's orders with these terms. Missing orders are not an error.
    pub fn cancel(&mut self, participant_id: ParticipantId, side: Side, price: Price, quantity: Qty) -> Result<Outcome> {
        self.holding_of(participant_id)?;
        let mut removed = 0;
        while self.state.book.remove_exact(participant_id, price, quantity, side) {
            removed += 1;
        }
        Ok(Outcome::Cancelled { side, price, quantity, removed })
    }

    /// Trading window expired: clear the book and floor every balance at zero.
    pub fn close_on_timeout(&mut self) -> Outcome {
        let cancelled = self.state.book.len(Side::Buy) + self.state.book.len(Side::Sell);
        self.state.book.clear();
        for p in self.roster.values_mut() {
            if p.cash() < 0 {
                p.set_cash(0);
            }
            if self.accessor.holding(p) < 0 {
                self.accessor.set_holding(p, 0);
            }
        }
        tracing::info!(round = self.round.round, cancelled, "round closed on timeout");
        Outcome::RoundClosed { cancelled }
    }

    pub fn project(&self, participant_id: ParticipantId) -> Result<MarketStateView> {
        let participant =
            self.roster.get(&participant_id).ok_or(MarketError::UnknownParticipant(participant_id))?;
        Ok(project(&*self.state, participant, self.accessor, self.config))
    }

    /// Views for every participant in the group.
    pub fn project_all(&self) -> BTreeMap<ParticipantId, MarketStateView> {
        self.roster
            .iter()
            .map(|(id, p)| (*id, project(&*self.state, p, self.accessor, self.config)))
            .collect()
    }
}

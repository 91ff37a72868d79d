//! Participant balances as seen by the engine
//!
//! The engine never names a concrete holding field. Each stage supplies a
//! [`ResourceAccessor`] that reads and writes whatever the stage trades
//! (emission permits, generic items) on its own participant type.

use crate::{Cash, ParticipantId, Qty};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-round trading counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeStats {
    pub total_bought: Qty,
    pub total_sold: Qty,
    pub total_spent: Cash,
    pub total_earned: Cash,
}

impl TradeStats {
    /// Counters saturate instead of wrapping.
    pub fn record_purchase(&mut self, quantity: Qty, value: Cash) {
        self.total_bought = self.total_bought.saturating_add(quantity);
        self.total_spent = self.total_spent.saturating_add(value);
    }

    pub fn record_sale(&mut self, quantity: Qty, value: Cash) {
        self.total_sold = self.total_sold.saturating_add(quantity);
        self.total_earned = self.total_earned.saturating_add(value);
    }

    /// Holding change this round from trading alone.
    pub fn net_quantity(&self) -> Qty {
        self.total_bought - self.total_sold
    }
}

/// Cash side of a participant. Implemented by each stage's participant type.
pub trait Account {
    fn id(&self) -> ParticipantId;
    fn cash(&self) -> Cash;
    fn set_cash(&mut self, cash: Cash);
    fn stats(&self) -> &TradeStats;
    fn stats_mut(&mut self) -> &mut TradeStats;
}

/// Read/write access to the traded resource on a participant.
pub trait ResourceAccessor<P>: Send + Sync {
    fn holding(&self, participant: &P) -> Qty;
    fn set_holding(&self, participant: &mut P, holding: Qty);
    /// Human-readable name of the resource, used in messages.
    fn label(&self) -> &str;
}

/// Accessor built from a getter/setter pair.
pub struct FieldAccessor<P> {
    get: fn(&P) -> Qty,
    set: fn(&mut P, Qty),
    label: String,
}

impl<P> FieldAccessor<P> {
    pub fn new(label: impl Into<String>, get: fn(&P) -> Qty, set: fn(&mut P, Qty)) -> Self {
        Self { get, set, label: label.into() }
    }
}

impl<P> ResourceAccessor<P> for FieldAccessor<P> {
    #[inline]
    fn holding(&self, participant: &P) -> Qty {
        (self.get)(participant)
    }

    #[inline]
    fn set_holding(&self, participant: &mut P, holding: Qty) {
        (self.set)(participant, holding)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// The participants of one group, keyed by id-in-group.
pub type Roster<P> = BTreeMap<ParticipantId, P>;

/// Build a roster from participants, keyed by their own ids.
pub fn roster_of<P: Account>(participants: impl IntoIterator<Item = P>) -> Roster<P> {
    participants.into_iter().map(|p| (p.id(), p)).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Minimal participant used across engine tests.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Desk {
        pub id: ParticipantId,
        pub cash: Cash,
        pub permits: Qty,
        pub stats: TradeStats,
    }

    impl Desk {
        pub fn new(id: ParticipantId, cash: Cash, permits: Qty) -> Self {
            Self { id, cash, permits, stats: TradeStats::default() }
        }
    }

    impl Account for Desk {
        fn id(&self) -> ParticipantId {
            self.id
        }
        fn cash(&self) -> Cash {
            self.cash
        }
        fn set_cash(&mut self, cash: Cash) {
            self.cash = cash;
        }
        fn stats(&self) -> &TradeStats {
            &self.stats
        }
        fn stats_mut(&mut self) -> &mut TradeStats {
            &mut self.stats
        }
    }

    pub fn permits() -> FieldAccessor<Desk> {
        FieldAccessor::new("permits", |d| d.permits, |d, q| d.permits = q)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn field_accessor_reads_and_writes() {
        let acc = permits();
        let mut d = Desk::new(1, 100, 10);
        assert_eq!(acc.holding(&d), 10);
        acc.set_holding(&mut d, 4);
        assert_eq!(d.permits, 4);
        assert_eq!(acc.label(), "permits");
    }

    #[test]
    fn stats_accumulate() {
        let mut s = TradeStats::default();
        s.record_purchase(5, 60);
        s.record_sale(2, 30);
        assert_eq!(s.net_quantity(), 3);
        assert_eq!((s.total_spent, s.total_earned), (60, 30));
    }

    #[test]
    fn stats_saturate() {
        let mut s = TradeStats::default();
        s.record_purchase(1, i64::MAX);
        s.record_purchase(1, 10);
        assert_eq!(s.total_spent, i64::MAX);
    }

    #[test]
    fn roster_keys_by_participant_id() {
        let roster = roster_of(vec![Desk::new(3, 0, 0), Desk::new(1, 0, 0)]);
        let ids: Vec<_> = roster.keys().copied().collect();
        assert_eq!(ids, vec![1, 3]);
    }
}

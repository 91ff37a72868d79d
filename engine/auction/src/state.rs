use crate::ledger::{PriceHistory, RoundClock, SubmittedOffer, TradeLedger};
use crate::{OrderBook, ParticipantId, Price, Round};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything the engine persists for one group and one round.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupState {
    pub book: OrderBook,
    #[serde(default)]
    pub trades: TradeLedger,
    #[serde(default)]
    pub prices: PriceHistory,
    #[serde(default)]
    pub submitted_offers: BTreeMap<ParticipantId, Vec<SubmittedOffer>>,
}

impl GroupState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offers_of(&self, participant_id: ParticipantId) -> &[SubmittedOffer] {
        self.submitted_offers.get(&participant_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Round-scoped facts the engine reads but never changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundContext {
    pub round: Round,
    pub clock: RoundClock,
    /// Reference price recorded next to every trade.
    pub market_price: Price,
}

impl RoundContext {
    pub fn new(round: Round, clock: RoundClock, market_price: Price) -> Self {
        Self { round, clock, market_price }
    }
}

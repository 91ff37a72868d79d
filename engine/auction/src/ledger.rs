//! Append-only trade and price logs, plus the round clock that stamps them

use crate::{ParticipantId, Price, Qty, Round, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Elapsed-time formatter relative to the round start marker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundClock {
    pub started_at: Option<DateTime<Utc>>,
}

impl RoundClock {
    pub fn started(at: DateTime<Utc>) -> Self {
        Self { started_at: Some(at) }
    }

    /// Whole seconds since the round started. Unset or future starts read as zero.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> i64 {
        match self.started_at {
            Some(start) => (now - start).num_seconds().max(0),
            None => 0,
        }
    }

    /// `MM:SS` since the round started.
    pub fn stamp(&self, now: DateTime<Utc>) -> String {
        let secs = self.elapsed_secs(now);
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: String,
    pub buyer_id: ParticipantId,
    pub seller_id: ParticipantId,
    pub price: Price,
    pub quantity: Qty,
    pub total_value: i64,
    pub market_price: Price,
    pub round: Round,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceEvent {
    Trade,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTick {
    pub timestamp: String,
    pub price: Price,
    pub event: PriceEvent,
    pub market_price: Price,
    pub round: Round,
}

/// Audit entry for every order a participant tried to place, accepted or not.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedOffer {
    pub timestamp: String,
    pub direction: Side,
    pub price: Price,
    pub quantity: Qty,
}

/// Append-only log. Entries are never edited or dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppendLog<T> {
    entries: Vec<T>,
}

impl<T> Default for AppendLog<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> AppendLog<T> {
    pub fn append(&mut self, entry: T) {
        self.entries.push(entry);
    }

    pub fn all(&self) -> &[T] {
        &self.entries
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> &[T] {
        let skip = self.entries.len().saturating_sub(n);
        &self.entries[skip..]
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type TradeLedger = AppendLog<TradeRecord>;
pub type PriceHistory = AppendLog<PriceTick>;

impl TradeLedger {
    pub fn involving(&self, participant_id: ParticipantId) -> impl Iterator<Item = &TradeRecord> {
        self.all()
            .iter()
            .filter(move |t| t.buyer_id == participant_id || t.seller_id == participant_id)
    }

    pub fn volume(&self) -> Qty {
        self.all().iter().map(|t| t.quantity).sum()
    }
}

impl PriceHistory {
    pub fn last_price(&self) -> Option<Price> {
        self.last().map(|t| t.price)
    }
}

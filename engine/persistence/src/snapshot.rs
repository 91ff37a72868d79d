//! Versioned envelope for persisted group state
//!
//! Every read goes through [`decode_or_reset`]. A snapshot that cannot be
//! parsed at all, or that was written by an unknown format version, is logged
//! and replaced by an empty [`GroupState`]. Inside a readable snapshot each
//! part (book, trades, prices, offer log) is recovered on its own, so a
//! damaged book never costs the trade history.

use crate::error::{PersistenceError, Result};
use auction::GroupState;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Format version written by this build
pub const SNAPSHOT_VERSION: u32 = 1;

/// A stored copy of one group's state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSnapshot {
    /// Format version
    pub version: u32,

    /// Unique identifier for this write
    pub id: Uuid,

    /// Timestamp when the snapshot was written
    pub saved_at: DateTime<Utc>,

    /// The group state at this point in time
    pub state: GroupState,
}

impl GroupSnapshot {
    pub fn new(state: GroupState) -> Self {
        Self { version: SNAPSHOT_VERSION, id: Uuid::new_v4(), saved_at: Utc::now(), state }
    }
}

/// Serialize a group state inside a fresh snapshot envelope.
pub fn encode(state: &GroupState, pretty: bool) -> Result<String> {
    let snapshot = GroupSnapshot::new(state.clone());
    let text = if pretty {
        serde_json::to_string_pretty(&snapshot)?
    } else {
        serde_json::to_string(&snapshot)?
    };
    Ok(text)
}

/// Parse a snapshot, rejecting versions this build does not know.
pub fn decode(text: &str) -> Result<GroupState> {
    let snapshot: GroupSnapshot = serde_json::from_str(text)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(PersistenceError::corruption(format!(
            "unsupported snapshot version {} (expected {})",
            snapshot.version, SNAPSHOT_VERSION
        )));
    }
    Ok(snapshot.state)
}

/// Parse a snapshot, falling back to empty parts for whatever is unreadable.
pub fn decode_or_reset(text: &str) -> GroupState {
    let err = match decode(text) {
        Ok(state) => return state,
        Err(e) => e,
    };
    match serde_json::from_str::<LooseSnapshot>(text) {
        Ok(loose) if loose.version == SNAPSHOT_VERSION => {
            tracing::warn!(error = %err, "group state partly unreadable; recovering what parses");
            recover(loose.state)
        }
        _ => {
            tracing::warn!(error = %err, "discarding unreadable group state; starting empty");
            GroupState::default()
        }
    }
}

/// Envelope with the state left untyped
#[derive(Deserialize)]
struct LooseSnapshot {
    version: u32,
    #[serde(default)]
    state: Map<String, Value>,
}

fn recover(mut fields: Map<String, Value>) -> GroupState {
    GroupState {
        book: part(&mut fields, "book"),
        trades: part(&mut fields, "trades"),
        prices: part(&mut fields, "prices"),
        submitted_offers: part(&mut fields, "submitted_offers"),
    }
}

fn part<T: DeserializeOwned + Default>(fields: &mut Map<String, Value>, name: &str) -> T {
    let Some(value) = fields.remove(name) else {
        return T::default();
    };
    serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!(part = name, error = %e, "discarding unreadable part of group state");
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction::{Order, PriceEvent, PriceTick};

    fn sample_state() -> GroupState {
        let mut state = GroupState::new();
        state.book.add(Order::buy(1, 12, 5));
        state.book.add(Order::sell(2, 14, 3));
        state.prices.append(PriceTick {
            timestamp: "00:12".into(),
            price: 13,
            event: PriceEvent::Trade,
            market_price: 10,
            round: 1,
        });
        state
    }

    #[test]
    fn round_trip_preserves_state() {
        let state = sample_state();
        for pretty in [false, true] {
            let text = encode(&state, pretty).unwrap();
            assert_eq!(decode(&text).unwrap(), state);
        }
    }

    #[test]
    fn malformed_text_resets_to_empty() {
        assert_eq!(decode_or_reset("{not json"), GroupState::default());
        assert_eq!(decode_or_reset(""), GroupState::default());
        assert_eq!(decode_or_reset(r#"{"version":1}"#), GroupState::default());
    }

    #[test]
    fn unknown_version_is_corruption() {
        let text = encode(&sample_state(), false).unwrap().replacen(
            &format!("\"version\":{SNAPSHOT_VERSION}"),
            "\"version\":99",
            1,
        );
        assert!(matches!(decode(&text), Err(PersistenceError::Corruption(_))));
        assert_eq!(decode_or_reset(&text), GroupState::default());
    }

    #[test]
    fn corrupt_order_tuple_empties_only_the_book() {
        let text = encode(&sample_state(), false).unwrap().replace("[1,12,5]", "[1,\"x\"]");
        assert!(decode(&text).is_err());

        let state = decode_or_reset(&text);
        assert!(state.book.is_empty());
        assert_eq!(state.prices, sample_state().prices);
    }

    #[test]
    fn corrupt_price_history_keeps_the_book() {
        let text = encode(&sample_state(), false).unwrap().replace("\"price\":13", "\"price\":\"high\"");
        let state = decode_or_reset(&text);
        assert!(state.prices.is_empty());
        assert_eq!(state.book, sample_state().book);
    }
}

//! Message types for the live market channel

use auction::{MarketStateView, ParticipantId, Price, Qty, Side};
use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};

/// Actions a participant can send. Tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundAction {
    /// Place a new order; it trades immediately if an eligible counter-order rests
    SubmitOffer {
        direction: Side,
        #[serde(deserialize_with = "lenient_int")]
        price: Price,
        #[serde(deserialize_with = "lenient_int")]
        quantity: Qty,
    },

    /// Take a specific resting order
    AcceptOffer {
        /// Side of the resting order being taken
        offer_type: Side,
        /// Owner of the resting order
        #[serde(deserialize_with = "lenient_id")]
        player_id: ParticipantId,
        #[serde(deserialize_with = "lenient_int")]
        price: Price,
        #[serde(deserialize_with = "lenient_int")]
        quantity: Qty,
    },

    /// Withdraw own orders with these terms
    CancelOffer {
        direction: Side,
        #[serde(deserialize_with = "lenient_int")]
        price: Price,
        #[serde(deserialize_with = "lenient_int")]
        quantity: Qty,
    },

    /// Request a fresh view without changing anything
    Ping,
}

impl InboundAction {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn name(&self) -> &'static str {
        match self {
            InboundAction::SubmitOffer { .. } => "submit_offer",
            InboundAction::AcceptOffer { .. } => "accept_offer",
            InboundAction::CancelOffer { .. } => "cancel_offer",
            InboundAction::Ping => "ping",
        }
    }
}

/// Browsers send numbers as ints, floats or strings; floats truncate.
fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(i64),
        Float(f64),
        Text(String),
    }

    let from_float = |f: f64| if f.is_finite() { Some(f.trunc() as i64) } else { None };
    match Number::deserialize(deserializer)? {
        Number::Int(v) => Ok(v),
        Number::Float(f) => from_float(f).ok_or_else(|| D::Error::custom(format!("not a finite number: {f}"))),
        Number::Text(s) => {
            let t = s.trim();
            t.parse::<i64>()
                .ok()
                .or_else(|| t.parse::<f64>().ok().and_then(from_float))
                .ok_or_else(|| D::Error::custom(format!("not a number: {s:?}")))
        }
    }
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ParticipantId, D::Error> {
    let raw = lenient_int(deserializer)?;
    ParticipantId::try_from(raw).map_err(|_| D::Error::custom(format!("invalid participant id: {raw}")))
}

/// Full market refresh for one participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateMessage {
    #[serde(flatten)]
    pub view: MarketStateView,

    /// Stage-specific participant data (cost tables, private values)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Everything the market sends to a participant. Tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Update(Box<UpdateMessage>),
    /// Sent alone when no view can be built for the recipient
    Error { message: String },
}

impl OutboundMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn as_update(&self) -> Option<&UpdateMessage> {
        match self {
            OutboundMessage::Update(u) => Some(u),
            OutboundMessage::Error { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_submit_with_mixed_number_forms() {
        let a = InboundAction::parse(r#"{"type":"submit_offer","direction":"buy","price":"12","quantity":5.0}"#)
            .unwrap();
        assert_eq!(a, InboundAction::SubmitOffer { direction: Side::Buy, price: 12, quantity: 5 });

        let a = InboundAction::parse(r#"{"type":"cancel_offer","direction":"sell","price":12.9,"quantity":"3"}"#)
            .unwrap();
        assert_eq!(a, InboundAction::CancelOffer { direction: Side::Sell, price: 12, quantity: 3 });
    }

    #[test]
    fn parses_accept_and_ping() {
        let a = InboundAction::parse(
            r#"{"type":"accept_offer","offer_type":"sell","player_id":"4","price":10,"quantity":2}"#,
        )
        .unwrap();
        assert_eq!(
            a,
            InboundAction::AcceptOffer { offer_type: Side::Sell, player_id: 4, price: 10, quantity: 2 }
        );
        assert_eq!(InboundAction::parse(r#"{"type":"ping"}"#).unwrap(), InboundAction::Ping);
        assert_eq!(InboundAction::Ping.name(), "ping");
    }

    #[test]
    fn rejects_garbage() {
        assert!(InboundAction::parse(r#"{"type":"submit_offer","direction":"buy","price":"abc","quantity":1}"#).is_err());
        assert!(InboundAction::parse(r#"{"type":"teleport"}"#).is_err());
        assert!(InboundAction::parse(r#"{"type":"accept_offer","offer_type":"buy","player_id":-1,"price":1,"quantity":1}"#).is_err());
        assert!(InboundAction::parse("not json").is_err());
    }

    #[test]
    fn error_message_shape() {
        let msg = OutboundMessage::Error { message: "bad".into() };
        let v: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(v["type"], "error");
        assert_eq!(v["message"], "bad");
        assert!(msg.as_update().is_none());
    }
}

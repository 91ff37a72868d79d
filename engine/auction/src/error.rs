//! Error types for the auction engine

use crate::{ParticipantId, Price, Qty, Side};
use thiserror::Error;

/// Result type alias for market operations
pub type Result<T> = std::result::Result<T, MarketError>;

/// Why an action was refused. Every variant leaves the book and balances untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    #[error("Invalid order: price and quantity must be positive (price {price}, quantity {quantity})")]
    InvalidOrder { price: Price, quantity: Qty },

    #[error("Order value out of range: price {price} times quantity {quantity} overflows")]
    ValueOverflow { price: Price, quantity: Qty },

    #[error("Insufficient {resource}: requested {requested}, available {available}")]
    InsufficientResources { requested: Qty, available: Qty, resource: String },

    #[error("Duplicate order: a {side} order at price {price} for quantity {quantity} already exists")]
    DuplicateOrder { side: Side, price: Price, quantity: Qty },

    #[error("Cannot trade with yourself")]
    SelfTrade,

    #[error("Counterparty {participant_id} has no {side} order at price {price} for quantity {quantity}")]
    CounterpartyNotFound { participant_id: ParticipantId, side: Side, price: Price, quantity: Qty },

    #[error("Unknown participant: {0}")]
    UnknownParticipant(ParticipantId),
}

impl MarketError {
    /// Short machine-readable tag, used in logs and outbound notifications
    pub fn kind(&self) -> &'static str {
        match self {
            MarketError::InvalidOrder { .. } => "invalid_order",
            MarketError::ValueOverflow { .. } => "value_overflow",
            MarketError::InsufficientResources { .. } => "insufficient_resources",
            MarketError::DuplicateOrder { .. } => "duplicate_order",
            MarketError::SelfTrade => "self_trade",
            MarketError::CounterpartyNotFound { .. } => "counterparty_not_found",
            MarketError::UnknownParticipant(_) => "unknown_participant",
        }
    }
}

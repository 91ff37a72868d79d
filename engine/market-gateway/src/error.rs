//! Error types for the MarketGateway

use auction::{MarketError, ParticipantId};
use persistence::PersistenceError;
use thiserror::Error;

/// Errors that can occur in the MarketGateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Market error: {0}")]
    Market(#[from] MarketError),

    #[error("Participant {0} is not part of this group")]
    UnknownParticipant(ParticipantId),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for MarketGateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

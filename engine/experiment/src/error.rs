//! Error types for experiment economics

use auction::{ParticipantId, Qty};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExperimentError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExperimentError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Production {production} outside 0..={max} for participant {participant_id}")]
    ProductionOutOfRange { participant_id: ParticipantId, production: Qty, max: Qty },

    #[error("Insufficient permits: production {production} needs {required}, holding {available}")]
    InsufficientPermits { production: Qty, required: Qty, available: Qty },

    #[error("Allocation needs at least one firm")]
    EmptyGroup,

    #[error("Marginal cost coefficient must be positive, got {0}")]
    NonPositiveCoefficient(f64),
}

impl ExperimentError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }
}

use core::fmt;
use serde::{Deserialize, Serialize};

pub type ParticipantId = u32;
pub type Price = i64;
pub type Qty = i64;
pub type Cash = i64;
pub type Round = u32;

#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one stage of one experiment run, e.g. `("carbon", "carbon_trading")`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct StageKey {
    pub experiment: String,
    pub stage: String,
}

impl StageKey {
    pub fn new(experiment: impl Into<String>, stage: impl Into<String>) -> Self {
        Self { experiment: experiment.into(), stage: stage.into() }
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.experiment, self.stage)
    }
}

/// One trading group in one round. Order books never outlive their key.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct GroupKey {
    pub stage: StageKey,
    pub round: Round,
    pub group: u32,
}

impl GroupKey {
    pub fn new(stage: StageKey, round: Round, group: u32) -> Self {
        Self { stage, round, group }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/r{}/g{}", self.stage, self.round, self.group)
    }
}

//! Recorded session scripts for the `replay` command

use auction::{ParticipantId, Qty, Round};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to read script: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse script: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid script: {0}")]
    Invalid(String),
}

/// Which part of the experiment a script replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Firms trade emission permits, then produce
    CarbonTrading,
    /// Firms produce under a per-unit emission tax
    CarbonTax,
    /// Firms produce with no emission pricing
    Control,
    /// Traders exchange items with private values
    Muda,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CarbonTrading => "carbon_trading",
            Stage::CarbonTax => "carbon_tax",
            Stage::Control => "control",
            Stage::Muda => "muda",
        }
    }

    /// Whether the stage runs a live market
    pub fn has_market(&self) -> bool {
        matches!(self, Stage::CarbonTrading | Stage::Muda)
    }
}

/// One participant message at a point in the trading window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptEvent {
    /// Seconds after the round started
    pub at_secs: i64,
    pub player: ParticipantId,
    /// Raw inbound message, exactly as a browser would send it
    pub action: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayScript {
    pub stage: Stage,
    #[serde(default = "first")]
    pub round: Round,
    #[serde(default = "first")]
    pub group: u32,
    /// Round start; defaults to the time of the replay
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub events: Vec<ScriptEvent>,
    /// Production decisions after trading; firms without one produce at their default
    #[serde(default)]
    pub productions: BTreeMap<ParticipantId, Qty>,
}

fn first() -> u32 {
    1
}

impl ReplayScript {
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let script: Self = serde_json::from_str(text)?;
        script.validate()?;
        Ok(script)
    }

    pub fn from_file(path: &Path) -> Result<Self, ScriptError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ScriptError> {
        if self.round == 0 {
            return Err(ScriptError::Invalid("round numbers start at 1".to_string()));
        }
        if !self.stage.has_market() && !self.events.is_empty() {
            return Err(ScriptError::Invalid(format!("stage {} has no market to trade in", self.stage.as_str())));
        }
        if let Some(e) = self.events.iter().find(|e| e.at_secs < 0) {
            return Err(ScriptError::Invalid(format!("event at {}s precedes the round start", e.at_secs)));
        }
        Ok(())
    }

    /// Events in time order; ties keep script order
    pub fn timeline(&self) -> Vec<&ScriptEvent> {
        let mut events: Vec<&ScriptEvent> = self.events.iter().collect();
        events.sort_by_key(|e| e.at_secs);
        events
    }
}

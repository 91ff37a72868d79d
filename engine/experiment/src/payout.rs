//! Which round pays out, drawn once per stage of an experiment run

use auction::{Round, StageKey};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;

/// Memoized payout-round draws keyed by `(experiment, stage)`.
///
/// The first call for a key draws uniformly from `1..=num_rounds`; every later
/// call returns that same round, whichever participant asks.
pub struct PayoutRoundSelector {
    num_rounds: Round,
    draws: Mutex<HashMap<StageKey, Round>>,
}

impl PayoutRoundSelector {
    pub fn new(num_rounds: Round) -> Self {
        Self { num_rounds: num_rounds.max(1), draws: Mutex::new(HashMap::new()) }
    }

    pub fn select<R: Rng + ?Sized>(&self, key: &StageKey, rng: &mut R) -> Round {
        let mut draws = self.draws.lock();
        if let Some(round) = draws.get(key) {
            return *round;
        }
        let round = rng.gen_range(1..=self.num_rounds);
        tracing::info!(stage = %key, round, "payout round selected");
        draws.insert(key.clone(), round);
        round
    }

    pub fn selected(&self, key: &StageKey) -> Option<Round> {
        self.draws.lock().get(key).copied()
    }

    pub fn num_rounds(&self) -> Round {
        self.num_rounds
    }
}

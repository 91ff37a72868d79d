//! Production cost schedules
//!
//! Each firm's per-unit disturbances are drawn from a generator seeded with
//! `participant_id * 1000 + round`, so the table shown during trading and
//! the cost charged at payoff time always agree. The generator is local to
//! the schedule; nothing touches a shared random state.

use auction::{ParticipantId, Qty, Round};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Seed for one firm in one round.
#[inline]
pub fn cost_seed(participant_id: ParticipantId, round: Round) -> u64 {
    u64::from(participant_id) * 1000 + u64::from(round)
}

#[inline]
fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// One row of the table shown to firms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRow {
    pub quantity: Qty,
    pub marginal_cost: f64,
    pub total_cost: f64,
    pub total_emission: Qty,
    /// Revenue minus total cost at the round's market price
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostSchedule {
    coefficient: f64,
    /// Disturbance of unit q at index q - 1, rounded to 3 decimals
    disturbances: Vec<f64>,
}

impl CostSchedule {
    pub fn new(
        participant_id: ParticipantId,
        round: Round,
        coefficient: i64,
        max_production: Qty,
        range: (f64, f64),
    ) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(cost_seed(participant_id, round));
        let units = max_production.max(0) as usize;
        let (lo, hi) = range;
        let disturbances = (0..units)
            .map(|_| if lo < hi { round_to(rng.gen_range(lo..=hi), 3) } else { round_to(lo, 3) })
            .collect();
        Self { coefficient: coefficient as f64, disturbances }
    }

    /// Schedule with explicit disturbances (tests, replays of recorded sessions).
    pub fn with_disturbances(coefficient: i64, disturbances: Vec<f64>) -> Self {
        Self { coefficient: coefficient as f64, disturbances }
    }

    pub fn disturbances(&self) -> &[f64] {
        &self.disturbances
    }

    pub fn max_quantity(&self) -> Qty {
        self.disturbances.len() as Qty
    }

    /// Cost of the q-th unit (1-based). Units beyond the schedule carry no disturbance.
    pub fn marginal_cost(&self, q: Qty) -> f64 {
        if q <= 0 {
            return 0.0;
        }
        let d = self.disturbances.get((q - 1) as usize).copied().unwrap_or(0.0);
        self.coefficient * q as f64 + d
    }

    /// Sum of marginal costs of units 1..=q.
    pub fn total_cost(&self, q: Qty) -> f64 {
        (1..=q.max(0)).map(|i| self.marginal_cost(i)).sum()
    }

    pub fn table(&self, emission_per_unit: i64, market_price: i64) -> Vec<CostRow> {
        let mut total = 0.0;
        (1..=self.max_quantity())
            .map(|q| {
                let mc = self.marginal_cost(q);
                total += mc;
                CostRow {
                    quantity: q,
                    marginal_cost: round_to(mc, 2),
                    total_cost: round_to(total, 2),
                    total_emission: q * emission_per_unit,
                    profit: round_to((q * market_price) as f64 - total, 2),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_schedule() {
        let a = CostSchedule::new(3, 2, 4, 8, (-1.0, 1.0));
        let b = CostSchedule::new(3, 2, 4, 8, (-1.0, 1.0));
        assert_eq!(a, b);
        let other_round = CostSchedule::new(3, 3, 4, 8, (-1.0, 1.0));
        assert_ne!(a.disturbances(), other_round.disturbances());
    }

    #[test]
    fn disturbances_in_range_and_rounded() {
        let s = CostSchedule::new(7, 1, 2, 20, (-1.0, 1.0));
        assert_eq!(s.max_quantity(), 20);
        for d in s.disturbances() {
            assert!((-1.0..=1.0).contains(d));
            assert!((d * 1000.0 - (d * 1000.0).round()).abs() < 1e-9);
        }
    }

    #[test]
    fn total_cost_accumulates_marginals() {
        let s = CostSchedule::with_disturbances(2, vec![0.5, -0.25, 0.0]);
        assert_eq!(s.marginal_cost(1), 2.5);
        assert_eq!(s.marginal_cost(2), 3.75);
        assert_eq!(s.total_cost(0), 0.0);
        assert_eq!(s.total_cost(3), 2.5 + 3.75 + 6.0);
    }

    #[test]
    fn table_rows_are_cumulative() {
        let s = CostSchedule::with_disturbances(1, vec![0.0, 0.0]);
        let rows = s.table(2, 10);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].total_cost, 3.0);
        assert_eq!(rows[1].total_emission, 4);
        assert_eq!(rows[1].profit, 17.0);
    }

    #[test]
    fn seed_matches_documented_formula() {
        assert_eq!(cost_seed(4, 7), 4007);
    }
}

//! Participant types for each trading stage

use crate::error::{ExperimentError, Result};
use auction::{Account, Cash, FieldAccessor, ParticipantId, Price, Qty, TradeStats};
use serde::{Deserialize, Serialize};

/// A producing firm (carbon trading, carbon tax and control stages).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Firm {
    pub id: ParticipantId,
    pub is_dominant: bool,
    /// `a`: marginal cost of unit q is `a * q` plus disturbance
    pub marginal_cost_coefficient: i64,
    /// `b`: emissions per unit produced
    pub emission_per_unit: i64,
    pub max_production: Qty,
    /// Output price for this round
    pub market_price: Price,
    pub initial_capital: Cash,
    pub cash: Cash,
    pub initial_permits: Qty,
    pub current_permits: Qty,
    pub production: Qty,
    #[serde(default)]
    pub stats: TradeStats,
}

impl Firm {
    /// Permits needed to produce `production` units.
    #[inline]
    pub fn permits_required(&self, production: Qty) -> Qty {
        production * self.emission_per_unit
    }

    /// Largest output the current permit holding allows.
    pub fn max_feasible_production(&self) -> Qty {
        if self.emission_per_unit <= 0 {
            return self.max_production;
        }
        (self.current_permits.max(0) / self.emission_per_unit).min(self.max_production)
    }

    /// Range check only; used where emissions are taxed rather than permitted.
    pub fn check_production_range(&self, production: Qty) -> Result<()> {
        if production < 0 || production > self.max_production {
            return Err(ExperimentError::ProductionOutOfRange {
                participant_id: self.id,
                production,
                max: self.max_production,
            });
        }
        Ok(())
    }

    /// Range check plus permit coverage, for the trading stage.
    pub fn check_production(&self, production: Qty) -> Result<()> {
        self.check_production_range(production)?;
        let required = self.permits_required(production);
        if required > self.current_permits {
            return Err(ExperimentError::InsufficientPermits {
                production,
                required,
                available: self.current_permits,
            });
        }
        Ok(())
    }

    pub fn set_production(&mut self, production: Qty, permits_binding: bool) -> Result<()> {
        if permits_binding {
            self.check_production(production)?;
        } else {
            self.check_production_range(production)?;
        }
        self.production = production;
        Ok(())
    }

    pub fn emissions(&self) -> Qty {
        self.permits_required(self.production)
    }
}

impl Account for Firm {
    fn id(&self) -> ParticipantId {
        self.id
    }
    fn cash(&self) -> Cash {
        self.cash
    }
    fn set_cash(&mut self, cash: Cash) {
        self.cash = cash;
    }
    fn stats(&self) -> &TradeStats {
        &self.stats
    }
    fn stats_mut(&mut self) -> &mut TradeStats {
        &mut self.stats
    }
}

/// A pure trader in the MUDA stage: holds items with a private per-item value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trader {
    pub id: ParticipantId,
    pub initial_capital: Cash,
    pub cash: Cash,
    pub current_items: Qty,
    pub personal_item_value: Price,
    #[serde(default)]
    pub stats: TradeStats,
}

impl Trader {
    /// Cash plus items at private value.
    pub fn total_value(&self) -> Cash {
        self.cash + self.current_items * self.personal_item_value
    }
}

impl Account for Trader {
    fn id(&self) -> ParticipantId {
        self.id
    }
    fn cash(&self) -> Cash {
        self.cash
    }
    fn set_cash(&mut self, cash: Cash) {
        self.cash = cash;
    }
    fn stats(&self) -> &TradeStats {
        &self.stats
    }
    fn stats_mut(&mut self) -> &mut TradeStats {
        &mut self.stats
    }
}

/// Firms trade emission permits.
pub fn permits_accessor(label: impl Into<String>) -> FieldAccessor<Firm> {
    FieldAccessor::new(label, |f| f.current_permits, |f, q| f.current_permits = q)
}

/// Traders trade generic items.
pub fn items_accessor(label: impl Into<String>) -> FieldAccessor<Trader> {
    FieldAccessor::new(label, |t| t.current_items, |t, q| t.current_items = q)
}

#[cfg(test)]
pub(crate) fn sample_firm(id: ParticipantId) -> Firm {
    Firm {
        id,
        is_dominant: false,
        marginal_cost_coefficient: 2,
        emission_per_unit: 2,
        max_production: 8,
        market_price: 10,
        initial_capital: 10_000,
        cash: 10_000,
        initial_permits: 10,
        current_permits: 10,
        production: 0,
        stats: TradeStats::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auction::ResourceAccessor;

    #[test]
    fn production_bounded_by_permits() {
        let mut f = sample_firm(1);
        assert_eq!(f.max_feasible_production(), 5);
        assert!(f.check_production(5).is_ok());
        assert_eq!(
            f.check_production(6),
            Err(ExperimentError::InsufficientPermits { production: 6, required: 12, available: 10 })
        );
        // taxed stages ignore permits
        assert!(f.set_production(8, false).is_ok());
        assert_eq!(f.emissions(), 16);
        assert!(f.set_production(9, false).is_err());
    }

    #[test]
    fn max_feasible_respects_capacity() {
        let mut f = sample_firm(1);
        f.current_permits = 100;
        assert_eq!(f.max_feasible_production(), 8);
        f.current_permits = -3;
        assert_eq!(f.max_feasible_production(), 0);
    }

    #[test]
    fn accessors_target_stage_fields() {
        let acc = permits_accessor("permits");
        let mut f = sample_firm(2);
        acc.set_holding(&mut f, 3);
        assert_eq!(f.current_permits, 3);

        let acc = items_accessor("widgets");
        let mut t = Trader {
            id: 1,
            initial_capital: 1_000,
            cash: 900,
            current_items: 2,
            personal_item_value: 30,
            stats: TradeStats::default(),
        };
        assert_eq!(acc.holding(&t), 2);
        acc.set_holding(&mut t, 5);
        assert_eq!(t.total_value(), 900 + 150);
        assert_eq!(acc.label(), "widgets");
    }
}

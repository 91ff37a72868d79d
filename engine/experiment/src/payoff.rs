//! Round payoffs per stage

use crate::cost::CostSchedule;
use crate::participant::{Firm, Trader};
use serde::{Deserialize, Serialize};

/// How a firm's production result is turned into profit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Treatment {
    /// No emission pricing
    Control,
    /// Emissions taxed at a per-unit rate
    CarbonTax { tax_rate: f64 },
    /// Emissions covered by traded permits; profit is net of starting capital
    Trading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirmPayoff {
    pub production: i64,
    pub emissions: i64,
    pub revenue: f64,
    pub cost: f64,
    pub tax: f64,
    pub profit: f64,
    pub final_cash: f64,
}

pub fn firm_payoff(firm: &Firm, schedule: &CostSchedule, treatment: Treatment) -> FirmPayoff {
    let production = firm.production.max(0);
    let emissions = firm.permits_required(production);
    let revenue = (production * firm.market_price) as f64;
    let cost = schedule.total_cost(production);
    let cash = firm.cash as f64;

    let (tax, profit, final_cash) = match treatment {
        Treatment::Control => {
            let profit = revenue - cost;
            (0.0, profit, cash + profit)
        }
        Treatment::CarbonTax { tax_rate } => {
            let tax = if tax_rate > 0.0 { emissions as f64 * tax_rate } else { 0.0 };
            let profit = revenue - cost - tax;
            (tax, profit, cash + profit)
        }
        Treatment::Trading => {
            let final_cash = cash - cost + revenue;
            (0.0, final_cash - firm.initial_capital as f64, final_cash)
        }
    };

    FirmPayoff { production, emissions, revenue, cost, tax, profit, final_cash }
}

/// MUDA profit: cash plus items at private value, minus starting capital.
pub fn trader_profit(trader: &Trader) -> i64 {
    trader.total_value() - trader.initial_capital
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::sample_firm;
    use auction::TradeStats;

    fn producing(production: i64) -> Firm {
        Firm { production, ..sample_firm(1) }
    }

    fn flat_schedule() -> CostSchedule {
        // a = 2, no disturbance: cost(q) = q(q+1)
        CostSchedule::with_disturbances(2, vec![0.0; 8])
    }

    #[test]
    fn control_profit_is_revenue_minus_cost() {
        let p = firm_payoff(&producing(3), &flat_schedule(), Treatment::Control);
        assert_eq!(p.revenue, 30.0);
        assert_eq!(p.cost, 12.0);
        assert_eq!(p.profit, 18.0);
        assert_eq!(p.tax, 0.0);
    }

    #[test]
    fn tax_charged_on_emissions() {
        let p = firm_payoff(&producing(3), &flat_schedule(), Treatment::CarbonTax { tax_rate: 4.0 });
        // emissions = 3 * 2
        assert_eq!(p.tax, 24.0);
        assert_eq!(p.profit, 30.0 - 12.0 - 24.0);
    }

    #[test]
    fn trading_profit_nets_out_initial_capital() {
        let mut f = producing(2);
        f.cash = 10_000 - 60 + 25;
        let p = firm_payoff(&f, &flat_schedule(), Treatment::Trading);
        // final cash = cash - cost(6) + revenue(20)
        assert_eq!(p.final_cash, 9_965.0 - 6.0 + 20.0);
        assert_eq!(p.profit, p.final_cash - 10_000.0);
    }

    #[test]
    fn trader_profit_values_items_privately() {
        let t = Trader {
            id: 2,
            initial_capital: 10_000,
            cash: 9_880,
            current_items: 4,
            personal_item_value: 35,
            stats: TradeStats::default(),
        };
        assert_eq!(trader_profit(&t), 9_880 + 140 - 10_000);
    }
}

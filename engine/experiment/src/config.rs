//! Experiment parameters
//!
//! Defaults are the production values of the lab sessions. Every section is
//! `#[serde(default)]` so a config file only needs the values it changes.

use crate::error::{ExperimentError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub general: GeneralConfig,
    pub firms: FirmRolesConfig,
    pub carbon_trading: CarbonTradingConfig,
    pub carbon_tax: CarbonTaxConfig,
    pub muda: MudaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub players_per_group: usize,
    pub num_rounds: u32,
    /// Uniform range for the per-unit cost disturbance
    pub disturbance_range: (f64, f64),
}

/// Parameter ranges for the two firm types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmRolesConfig {
    pub dominant_firm_count: usize,
    pub dominant: FirmTypeConfig,
    pub non_dominant: FirmTypeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirmTypeConfig {
    pub mc_range: (i64, i64),
    pub emission_per_unit: i64,
    pub max_production: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMethod {
    /// Equal split; the remainder is withheld
    Equal,
    /// Equal split; the remainder goes one unit each to randomly drawn firms
    EqualWithRandomRemainder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimalAllocationConfig {
    pub use_fixed_price: bool,
    pub fixed_market_price: i64,
    pub social_cost_per_unit_carbon: f64,
    pub cap_multipliers: Vec<f64>,
    pub allocation_method: AllocationMethod,
    /// Round the cap to the nearest integer instead of truncating
    pub round_cap_total: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarbonTradingConfig {
    pub initial_capital: i64,
    pub permits_per_player: i64,
    pub trading_time_secs: u64,
    pub reset_cash_each_round: bool,
    pub display_depth: usize,
    pub optimal_allocation: OptimalAllocationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CarbonTaxConfig {
    /// Multipliers of the social cost drawn as the per-unit tax
    pub rates: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MudaConfig {
    pub initial_capital: i64,
    pub initial_items: i64,
    pub trading_time_secs: u64,
    pub item_price_options: Vec<i64>,
    pub item_name: String,
    pub reset_cash_each_round: bool,
    pub recent_trades_shown: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { players_per_group: 15, num_rounds: 15, disturbance_range: (-1.0, 1.0) }
    }
}

impl Default for FirmRolesConfig {
    fn default() -> Self {
        Self {
            dominant_firm_count: 3,
            dominant: FirmTypeConfig { mc_range: (1, 5), emission_per_unit: 2, max_production: 20 },
            non_dominant: FirmTypeConfig { mc_range: (2, 7), emission_per_unit: 1, max_production: 8 },
        }
    }
}

impl Default for OptimalAllocationConfig {
    fn default() -> Self {
        Self {
            use_fixed_price: true,
            fixed_market_price: 10,
            social_cost_per_unit_carbon: 2.0,
            cap_multipliers: vec![0.8, 1.0, 1.2],
            allocation_method: AllocationMethod::EqualWithRandomRemainder,
            round_cap_total: true,
        }
    }
}

impl Default for CarbonTradingConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000,
            permits_per_player: 10,
            trading_time_secs: 120,
            reset_cash_each_round: true,
            display_depth: 3,
            optimal_allocation: OptimalAllocationConfig::default(),
        }
    }
}

impl Default for CarbonTaxConfig {
    fn default() -> Self {
        Self { rates: vec![1.0, 2.0, 3.0] }
    }
}

impl Default for MudaConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000,
            initial_items: 10,
            trading_time_secs: 180,
            item_price_options: vec![25, 30, 35, 40],
            item_name: "碳權".to_string(),
            reset_cash_each_round: true,
            recent_trades_shown: 10,
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.general.players_per_group == 0 {
            return Err(ExperimentError::config("players_per_group must be greater than 0"));
        }
        if self.general.num_rounds == 0 {
            return Err(ExperimentError::config("num_rounds must be greater than 0"));
        }
        let (lo, hi) = self.general.disturbance_range;
        if !(lo <= hi) {
            return Err(ExperimentError::config(format!("disturbance_range ({lo}, {hi}) is empty")));
        }
        if self.firms.dominant_firm_count > self.general.players_per_group {
            return Err(ExperimentError::config("dominant_firm_count exceeds players_per_group"));
        }
        for (name, t) in [("dominant", &self.firms.dominant), ("non_dominant", &self.firms.non_dominant)] {
            if t.mc_range.0 <= 0 || t.mc_range.0 > t.mc_range.1 {
                return Err(ExperimentError::config(format!("{name}.mc_range must be positive and ordered")));
            }
            if t.emission_per_unit <= 0 || t.max_production <= 0 {
                return Err(ExperimentError::config(format!(
                    "{name} emission_per_unit and max_production must be positive"
                )));
            }
        }
        let alloc = &self.carbon_trading.optimal_allocation;
        if alloc.cap_multipliers.is_empty() || alloc.cap_multipliers.iter().any(|m| *m <= 0.0) {
            return Err(ExperimentError::config("cap_multipliers must be non-empty and positive"));
        }
        if alloc.fixed_market_price <= 0 {
            return Err(ExperimentError::config("fixed_market_price must be positive"));
        }
        if self.carbon_trading.display_depth == 0 {
            return Err(ExperimentError::config("display_depth must be greater than 0"));
        }
        if self.carbon_tax.rates.is_empty() {
            return Err(ExperimentError::config("carbon_tax.rates must not be empty"));
        }
        if self.muda.item_price_options.is_empty() {
            return Err(ExperimentError::config("muda.item_price_options must not be empty"));
        }
        if self.muda.recent_trades_shown == 0 {
            return Err(ExperimentError::config("muda.recent_trades_shown must be greater than 0"));
        }
        Ok(())
    }

    /// Per-unit tax for a drawn rate multiplier.
    pub fn tax_rate(&self, multiplier: f64) -> f64 {
        multiplier * self.carbon_trading.optimal_allocation.social_cost_per_unit_carbon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = ExperimentConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.general.num_rounds, 15);
        assert_eq!(cfg.carbon_trading.optimal_allocation.fixed_market_price, 10);
        assert_eq!(cfg.muda.item_price_options, vec![25, 30, 35, 40]);
        assert_eq!(cfg.tax_rate(1.5), 3.0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: ExperimentConfig =
            serde_json::from_str(r#"{"general":{"num_rounds":3},"muda":{"item_name":"widgets"}}"#).unwrap();
        assert_eq!(cfg.general.num_rounds, 3);
        assert_eq!(cfg.general.players_per_group, 15);
        assert_eq!(cfg.muda.item_name, "widgets");
        assert_eq!(cfg.muda.trading_time_secs, 180);
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = ExperimentConfig::default();
        cfg.general.disturbance_range = (1.0, -1.0);
        assert!(cfg.validate().is_err());

        let mut cfg = ExperimentConfig::default();
        cfg.carbon_trading.optimal_allocation.cap_multipliers.clear();
        assert!(cfg.validate().is_err());

        let mut cfg = ExperimentConfig::default();
        cfg.firms.dominant_firm_count = 20;
        assert!(cfg.validate().is_err());
    }
}

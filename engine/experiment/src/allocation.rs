//! Socially optimal output and permit cap allocation
//!
//! For a firm with marginal cost coefficient `a` and emission intensity `b`
//! facing output price `p` and a per-unit carbon charge `t`, the benchmark
//! output is `q = trunc((p - b*t) / a)` clamped to `0..=max_production`.
//! With `t` equal to the social cost of carbon this is the social optimum;
//! with `t` equal to the drawn tax rate it is the carbon-tax benchmark.

use crate::config::{AllocationMethod, OptimalAllocationConfig};
use crate::error::{ExperimentError, Result};
use crate::participant::Firm;
use auction::Qty;
use rand::seq::{index, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Benchmark output and emissions for one firm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FirmBenchmark {
    pub a: f64,
    pub b: f64,
    pub quantity: Qty,
    pub emissions: Qty,
}

pub fn benchmark(firm: &Firm, market_price: f64, carbon_charge: f64) -> Result<FirmBenchmark> {
    let a = firm.marginal_cost_coefficient as f64;
    let b = firm.emission_per_unit as f64;
    if a <= 0.0 {
        return Err(ExperimentError::NonPositiveCoefficient(a));
    }
    let raw = ((market_price - b * carbon_charge) / a).trunc() as Qty;
    let quantity = raw.clamp(0, firm.max_production.max(0));
    let emissions = (b * quantity as f64).trunc() as Qty;
    Ok(FirmBenchmark { a, b, quantity, emissions })
}

/// Per-firm benchmarks plus the group total of emissions.
pub fn group_benchmark(firms: &[Firm], market_price: f64, carbon_charge: f64) -> Result<(Vec<FirmBenchmark>, Qty)> {
    let details = firms
        .iter()
        .map(|f| benchmark(f, market_price, carbon_charge))
        .collect::<Result<Vec<_>>>()?;
    let total = details.iter().map(|d| d.emissions).sum();
    Ok((details, total))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowanceAllocation {
    pub firm_details: Vec<FirmBenchmark>,
    /// Sum of socially optimal emissions across the group
    pub te_opt_total: Qty,
    /// Drawn cap multiplier `r`
    pub multiplier: f64,
    pub cap_total: Qty,
    /// Permits per firm, in the order the firms were given
    pub allocations: Vec<Qty>,
}

impl AllowanceAllocation {
    pub fn allocated_total(&self) -> Qty {
        self.allocations.iter().sum()
    }
}

/// Draw a cap around the social optimum and split it across the firms.
pub fn allocate_allowances<R: Rng + ?Sized>(
    firms: &[Firm],
    market_price: f64,
    config: &OptimalAllocationConfig,
    rng: &mut R,
) -> Result<AllowanceAllocation> {
    if firms.is_empty() {
        return Err(ExperimentError::EmptyGroup);
    }
    let (firm_details, te_opt_total) =
        group_benchmark(firms, market_price, config.social_cost_per_unit_carbon)?;

    let multiplier = *config
        .cap_multipliers
        .choose(rng)
        .ok_or_else(|| ExperimentError::config("cap_multipliers must not be empty"))?;
    let scaled = multiplier * te_opt_total as f64;
    let cap_total = if config.round_cap_total { scaled.round() as Qty } else { scaled.trunc() as Qty };

    let n = firms.len();
    let base = cap_total.div_euclid(n as Qty);
    let remainder = cap_total.rem_euclid(n as Qty) as usize;
    let mut allocations = vec![base; n];
    if config.allocation_method == AllocationMethod::EqualWithRandomRemainder && remainder > 0 {
        for idx in index::sample(rng, n, remainder).into_iter() {
            allocations[idx] += 1;
        }
    }

    tracing::info!(
        firms = n,
        te_opt_total,
        multiplier,
        cap_total,
        base,
        remainder,
        "allowance allocation drawn"
    );
    Ok(AllowanceAllocation { firm_details, te_opt_total, multiplier, cap_total, allocations })
}

//! Participant economics for the carbon market experiment
//!
//! Everything the auction engine treats as an outside collaborator lives
//! here: the participant types of each stage and the accessors that expose
//! their traded resource, deterministic production cost schedules, optimal
//! allowance allocation, payoff rules and payout-round selection.

pub mod allocation;
pub mod config;
pub mod cost;
pub mod error;
pub mod participant;
pub mod payoff;
pub mod payout;

pub use allocation::{allocate_allowances, benchmark, group_benchmark, AllowanceAllocation, FirmBenchmark};
pub use config::{AllocationMethod, ExperimentConfig, FirmTypeConfig, OptimalAllocationConfig};
pub use cost::{cost_seed, CostRow, CostSchedule};
pub use error::{ExperimentError, Result};
pub use participant::{items_accessor, permits_accessor, Firm, Trader};
pub use payoff::{firm_payoff, trader_profit, FirmPayoff, Treatment};
pub use payout::PayoutRoundSelector;

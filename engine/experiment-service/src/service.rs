//! Round setup, session replay and round reports

use crate::config::{validate_config, ServiceConfig};
use crate::script::{ReplayScript, Stage};
use anyhow::{Context, Result};
use auction::{
    roster_of, Account, AuctionConfig, GroupKey, GroupState, HistoryWindow, NotificationKind, ParticipantId, Price,
    Qty, Round, RoundClock, RoundContext, Roster, StageKey,
};
use chrono::{DateTime, Duration, Utc};
use experiment::{
    allocate_allowances, benchmark, firm_payoff, items_accessor, permits_accessor, trader_profit, CostSchedule, Firm,
    PayoutRoundSelector, Trader, Treatment,
};
use market_gateway::{Broadcast, LiveMarket, OutboundMessage};
use parking_lot::Mutex;
use persistence::{create_store, GroupStore};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// End-of-round result for one participant
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantResult {
    pub id: ParticipantId,
    pub cash: i64,
    pub holding: Qty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production: Option<Qty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissions: Option<Qty>,
    pub profit: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    pub experiment: String,
    pub stage: Stage,
    pub round: Round,
    pub group: u32,
    pub trades: usize,
    pub volume: Qty,
    pub last_price: Option<Price>,
    /// Actions answered with an error
    pub rejected: usize,
    pub messages_delivered: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap_total: Option<Qty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
    pub payout_round: Round,
    pub participants: Vec<ParticipantResult>,
}

impl RoundReport {
    fn new(experiment: &str, script: &ReplayScript) -> Self {
        Self {
            experiment: experiment.to_string(),
            stage: script.stage,
            round: script.round,
            group: script.group,
            trades: 0,
            volume: 0,
            last_price: None,
            rejected: 0,
            messages_delivered: 0,
            cap_total: None,
            tax_rate: None,
            payout_round: 0,
            participants: Vec::new(),
        }
    }

    fn record_market<P>(&mut self, session: &Replayed<P>) {
        self.trades = session.state.trades.len();
        self.volume = session.state.trades.volume();
        self.last_price = session.state.prices.last_price();
        self.rejected = session.rejected;
        self.messages_delivered = session.delivered;
    }
}

impl fmt::Display for RoundReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} / {} round {} group {}", self.experiment, self.stage.as_str(), self.round, self.group)?;
        if self.stage.has_market() {
            let last = self.last_price.map_or_else(|| "-".to_string(), |p| p.to_string());
            writeln!(f, "  trades: {} (volume {}, last price {})", self.trades, self.volume, last)?;
            writeln!(f, "  rejected actions: {}, messages delivered: {}", self.rejected, self.messages_delivered)?;
        }
        if let Some(cap) = self.cap_total {
            writeln!(f, "  permit cap: {cap}")?;
        }
        if let Some(rate) = self.tax_rate {
            writeln!(f, "  tax rate: {rate}")?;
        }
        writeln!(f, "  payout round: {}", self.payout_round)?;
        for p in &self.participants {
            write!(f, "  player {:>3}: cash {:>7} holding {:>4}", p.id, p.cash, p.holding)?;
            if let (Some(q), Some(e)) = (p.production, p.emissions) {
                write!(f, " production {q:>3} emissions {e:>3}")?;
            }
            writeln!(f, " profit {:.2}", p.profit)?;
        }
        Ok(())
    }
}

/// What a played-out market leaves behind
struct Replayed<P> {
    roster: Roster<P>,
    state: GroupState,
    rejected: usize,
    delivered: usize,
}

/// Drives experiment rounds through the market engine
pub struct ExperimentService {
    config: ServiceConfig,
    store: Arc<dyn GroupStore>,
    payout: PayoutRoundSelector,
    rng: Mutex<ChaCha8Rng>,
}

impl ExperimentService {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        validate_config(&config)?;
        let store = create_store(&config.persistence).context("Failed to open group store")?;
        let rng = match config.service.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let payout = PayoutRoundSelector::new(config.experiment.general.num_rounds);
        info!(
            experiment = %config.service.experiment_name,
            backend = ?config.persistence.backend,
            "experiment service initialized"
        );
        Ok(Self { config, store, payout, rng: Mutex::new(rng) })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn GroupStore> {
        &self.store
    }

    pub fn stage_key(&self, stage: Stage) -> StageKey {
        StageKey::new(self.config.service.experiment_name.clone(), stage.as_str())
    }

    /// Firms for one group. The first `dominant_firm_count` ids are dominant;
    /// each firm's cost coefficient is drawn from its type's range.
    pub fn build_firms(&self, market_price: Price) -> Vec<Firm> {
        let cfg = &self.config.experiment;
        let trading = &cfg.carbon_trading;
        let mut rng = self.rng.lock();
        (1..=cfg.general.players_per_group as ParticipantId)
            .map(|id| {
                let is_dominant = (id as usize) <= cfg.firms.dominant_firm_count;
                let kind = if is_dominant { &cfg.firms.dominant } else { &cfg.firms.non_dominant };
                Firm {
                    id,
                    is_dominant,
                    marginal_cost_coefficient: rng.gen_range(kind.mc_range.0..=kind.mc_range.1),
                    emission_per_unit: kind.emission_per_unit,
                    max_production: kind.max_production,
                    market_price,
                    initial_capital: trading.initial_capital,
                    cash: trading.initial_capital,
                    initial_permits: trading.permits_per_player,
                    current_permits: trading.permits_per_player,
                    production: 0,
                    stats: Default::default(),
                }
            })
            .collect()
    }

    /// Traders for one MUDA group, each with a privately drawn item value.
    pub fn build_traders(&self) -> Result<Vec<Trader>> {
        let cfg = &self.config.experiment;
        let muda = &cfg.muda;
        let mut rng = self.rng.lock();
        (1..=cfg.general.players_per_group as ParticipantId)
            .map(|id| {
                let value = *muda.item_price_options.choose(&mut *rng).context("item_price_options is empty")?;
                Ok(Trader {
                    id,
                    initial_capital: muda.initial_capital,
                    cash: muda.initial_capital,
                    current_items: muda.initial_items,
                    personal_item_value: value,
                    stats: Default::default(),
                })
            })
            .collect()
    }

    /// Replay one recorded round and report its outcome.
    pub fn replay(&self, script: &ReplayScript) -> Result<RoundReport> {
        script.validate()?;
        let started_at = script.started_at.unwrap_or_else(Utc::now);
        let key = GroupKey::new(self.stage_key(script.stage), script.round, script.group);
        info!(group = %key, events = script.events.len(), "replaying session");

        let mut report = match script.stage {
            Stage::CarbonTrading => self.replay_carbon_trading(script, &key, started_at)?,
            Stage::Muda => self.replay_muda(script, &key, started_at)?,
            Stage::CarbonTax => self.run_production(script, true)?,
            Stage::Control => self.run_production(script, false)?,
        };
        report.payout_round = self.payout.select(&key.stage, &mut *self.rng.lock());
        info!(group = %key, trades = report.trades, payout_round = report.payout_round, "round complete");
        Ok(report)
    }

    fn replay_carbon_trading(&self, script: &ReplayScript, key: &GroupKey, started_at: DateTime<Utc>) -> Result<RoundReport> {
        let cfg = &self.config.experiment;
        let trading = &cfg.carbon_trading;
        // Every firm sells its output at the configured price.
        let price = trading.optimal_allocation.fixed_market_price;

        let mut firms = self.build_firms(price);
        let allocation = {
            let mut rng = self.rng.lock();
            allocate_allowances(&firms, price as f64, &trading.optimal_allocation, &mut *rng)?
        };
        for (firm, permits) in firms.iter_mut().zip(&allocation.allocations) {
            firm.initial_permits = *permits;
            firm.current_permits = *permits;
        }

        let range = cfg.general.disturbance_range;
        let auction_config = AuctionConfig { display_depth: trading.display_depth, ..AuctionConfig::default() };
        let market = LiveMarket::<Firm>::new(
            key.clone(),
            auction_config,
            Arc::new(permits_accessor("permits")),
            Arc::clone(&self.store),
        )?
        .with_details(Arc::new(move |f: &Firm, round: &RoundContext| {
            let schedule = CostSchedule::new(f.id, round.round, f.marginal_cost_coefficient, f.max_production, range);
            Some(serde_json::json!({
                "is_dominant": f.is_dominant,
                "max_production": f.max_production,
                "max_feasible_production": f.max_feasible_production(),
                "cost_table": schedule.table(f.emission_per_unit, f.market_price),
            }))
        }));

        let round = RoundContext::new(script.round, RoundClock::started(started_at), price);
        let session = self.play(&market, script, roster_of(firms), round, trading.trading_time_secs)?;

        let mut report = RoundReport::new(&self.config.service.experiment_name, script);
        report.record_market(&session);
        report.cap_total = Some(allocation.cap_total);
        for mut firm in session.roster.into_values() {
            let default = firm.max_feasible_production();
            let requested = script.productions.get(&firm.id).copied();
            decide_production(&mut firm, requested, default, true);
            let schedule =
                CostSchedule::new(firm.id, script.round, firm.marginal_cost_coefficient, firm.max_production, range);
            let payoff = firm_payoff(&firm, &schedule, Treatment::Trading);
            report.participants.push(ParticipantResult {
                id: firm.id,
                cash: firm.cash,
                holding: firm.current_permits,
                production: Some(payoff.production),
                emissions: Some(payoff.emissions),
                profit: payoff.profit,
            });
        }
        Ok(report)
    }

    fn replay_muda(&self, script: &ReplayScript, key: &GroupKey, started_at: DateTime<Utc>) -> Result<RoundReport> {
        let muda = &self.config.experiment.muda;
        let traders = self.build_traders()?;

        let auction_config =
            AuctionConfig { history_window: HistoryWindow::Recent(muda.recent_trades_shown), ..AuctionConfig::default() };
        let market = LiveMarket::<Trader>::new(
            key.clone(),
            auction_config,
            Arc::new(items_accessor(muda.item_name.clone())),
            Arc::clone(&self.store),
        )?
        .with_details(Arc::new(|t: &Trader, _: &RoundContext| {
            Some(serde_json::json!({
                "personal_item_value": t.personal_item_value,
                "total_value": t.total_value(),
            }))
        }));

        let round = RoundContext::new(script.round, RoundClock::started(started_at), 0);
        let session = self.play(&market, script, roster_of(traders), round, muda.trading_time_secs)?;

        let mut report = RoundReport::new(&self.config.service.experiment_name, script);
        report.record_market(&session);
        for trader in session.roster.into_values() {
            report.participants.push(ParticipantResult {
                id: trader.id,
                cash: trader.cash,
                holding: trader.current_items,
                production: None,
                emissions: None,
                profit: trader_profit(&trader) as f64,
            });
        }
        Ok(report)
    }

    /// Production-only stages: firms choose output, emissions are taxed or free.
    fn run_production(&self, script: &ReplayScript, taxed: bool) -> Result<RoundReport> {
        let cfg = &self.config.experiment;
        let price = cfg.carbon_trading.optimal_allocation.fixed_market_price;
        let range = cfg.general.disturbance_range;
        let mut firms = self.build_firms(price);

        let tax_rate = if taxed {
            let multiplier =
                *cfg.carbon_tax.rates.choose(&mut *self.rng.lock()).context("carbon_tax.rates is empty")?;
            Some(cfg.tax_rate(multiplier))
        } else {
            None
        };
        let treatment = match tax_rate {
            Some(tax_rate) => Treatment::CarbonTax { tax_rate },
            None => Treatment::Control,
        };

        let mut report = RoundReport::new(&self.config.service.experiment_name, script);
        report.tax_rate = tax_rate;
        for firm in &mut firms {
            let default = benchmark(firm, price as f64, tax_rate.unwrap_or(0.0))?.quantity;
            decide_production(firm, script.productions.get(&firm.id).copied(), default, false);
            let schedule =
                CostSchedule::new(firm.id, script.round, firm.marginal_cost_coefficient, firm.max_production, range);
            let payoff = firm_payoff(firm, &schedule, treatment);
            report.participants.push(ParticipantResult {
                id: firm.id,
                cash: firm.cash,
                holding: firm.current_permits,
                production: Some(payoff.production),
                emissions: Some(payoff.emissions),
                profit: payoff.profit,
            });
        }
        Ok(report)
    }

    /// Run the scripted events through a live market, then close the round.
    fn play<P: Account + Clone + Send>(
        &self,
        market: &LiveMarket<P>,
        script: &ReplayScript,
        roster: Roster<P>,
        round: RoundContext,
        trading_secs: u64,
    ) -> Result<Replayed<P>> {
        let mut receivers: Vec<_> = roster.keys().map(|id| market.broadcaster().subscribe(*id)).collect();
        let start = round.clock.started_at.unwrap_or_else(Utc::now);
        let window = i64::try_from(trading_secs).unwrap_or(i64::MAX);
        market.start_round(round, roster)?;

        let mut rejected = 0;
        for event in script.timeline() {
            if event.at_secs >= window {
                warn!(player = event.player, at_secs = event.at_secs, "event after the trading window; skipped");
                continue;
            }
            let now = start + Duration::seconds(event.at_secs);
            let out = market.handle_text(event.player, &event.action.to_string(), now)?;
            if is_rejection(&out, event.player) {
                rejected += 1;
            }
        }

        let close_at = start + Duration::seconds(window.min(i64::from(u32::MAX)));
        market.close_round(close_at)?;

        let delivered = receivers
            .iter_mut()
            .map(|rx| std::iter::from_fn(|| rx.try_recv().ok()).count())
            .sum();
        Ok(Replayed { roster: market.roster(), state: market.snapshot(), rejected, delivered })
    }
}

fn is_rejection(out: &Broadcast, actor: ParticipantId) -> bool {
    match out.get(&actor) {
        Some(OutboundMessage::Error { .. }) => true,
        Some(OutboundMessage::Update(update)) => {
            update.view.notification.as_ref().is_some_and(|n| n.kind == NotificationKind::Error)
        }
        None => false,
    }
}

/// Apply a firm's production decision; infeasible requests fall back to `default`.
fn decide_production(firm: &mut Firm, requested: Option<Qty>, default: Qty, permits_binding: bool) {
    let Some(production) = requested else {
        firm.production = default;
        return;
    };
    if let Err(e) = firm.set_production(production, permits_binding) {
        warn!(participant = firm.id, production, error = %e, "production decision rejected; using default");
        firm.production = default;
    }
}

//! [`BacktestHarness`] — replays a closed candle series through the same
//! selector → strategy → admission-chain → dynamic-exit pipeline the live
//! engine runs, against an in-memory broker, and emits a
//! [`BacktestRun`] artifact: the run's inputs, its closed trades, and the
//! metrics computed from them.
//!
//! This crate cannot depend on the wiring layer that assembles the live
//! pipeline (that crate depends on this one, for its metrics), so
//! [`BacktestParams`] duplicates the handful of config fields the pipeline
//! needs rather than importing them.

use crate::metric::drawdown::MaxDrawdown;
use crate::metric::profit_factor::ProfitFactor;
use crate::metric::sharpe::SharpeRatio;
use crate::metric::win_rate::WinRate;
use crate::quality::{self, DataQualityMode, Issue, QualityError};
use crate::time::{Annual252, Daily};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ixtrade_data::Candle;
use ixtrade_execution::MockBrokerAdapter;
use ixtrade_markets::{Instrument, InstrumentToken, Side};
use ixtrade_risk::{
    AdaptiveOptimizer, GovernorConfig, MarketCalendar, OptimizerConfigParams, OrderRateLimiter,
    PortfolioGovernor, RateLimiterConfig, RiskEngine, RiskEngineConfig, SessionBucket, SpreadRegime,
};
use ixtrade_strategies::indicators::atr;
use ixtrade_strategies::{family, Selector, SelectorConfig, Signal, StrategyRegistry};
use ixtrade_trader::exit::{DynamicExitManager, ExitAction, ExitReason};
use ixtrade_trader::{DynamicExitConfig, EntryPlan, Trade, TradeManager, TradeState, TradeStore};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

const ATR_PERIOD: usize = 14;

/// Mirrors [`ixtrade_risk` sizing inputs]: equity and per-trade risk
/// budgeting, scaled by session bucket. Kept local rather than imported
/// since its owning config type lives in the wiring crate.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RiskBudget {
    pub equity_inr: Decimal,
    pub per_trade_risk_pct: Decimal,
    pub per_trade_risk_min_inr: Decimal,
    pub per_trade_risk_max_inr: Decimal,
    pub day_state_multiplier_open: Decimal,
    pub day_state_multiplier_mid: Decimal,
    pub day_state_multiplier_close: Decimal,
    pub target_rr_multiple: Decimal,
}

impl Default for RiskBudget {
    fn default() -> Self {
        Self {
            equity_inr: Decimal::from(1_000_000),
            per_trade_risk_pct: Decimal::new(5, 3),
            per_trade_risk_min_inr: Decimal::from(500),
            per_trade_risk_max_inr: Decimal::from(20_000),
            day_state_multiplier_open: Decimal::new(8, 1),
            day_state_multiplier_mid: Decimal::ONE,
            day_state_multiplier_close: Decimal::new(6, 1),
            target_rr_multiple: Decimal::new(15, 1),
        }
    }
}

impl RiskBudget {
    fn session_risk_inr(&self, bucket: SessionBucket) -> Decimal {
        let multiplier = match bucket {
            SessionBucket::Open => self.day_state_multiplier_open,
            SessionBucket::Mid => self.day_state_multiplier_mid,
            SessionBucket::Close => self.day_state_multiplier_close,
        };
        (self.equity_inr * self.per_trade_risk_pct * multiplier)
            .clamp(self.per_trade_risk_min_inr, self.per_trade_risk_max_inr)
    }
}

/// The knobs a backtest run is parameterized by, recorded verbatim into the
/// run artifact's `params` field.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BacktestParams {
    pub min_confidence: u8,
    pub min_candles: usize,
    pub fee_per_lot_inr: Decimal,
    pub liquidity_buffer_ticks: u32,
    pub liquidity_buffer_atr_pct: Decimal,
    pub round_level_avoid_step: Decimal,
    pub spread_penalty_enabled: bool,
    pub risk_budget: RiskBudget,
    pub dynamic_exit: DynamicExitConfig,
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            min_confidence: 60,
            min_candles: 50,
            fee_per_lot_inr: Decimal::ZERO,
            liquidity_buffer_ticks: 3,
            liquidity_buffer_atr_pct: Decimal::new(1, 1),
            round_level_avoid_step: Decimal::ONE,
            spread_penalty_enabled: true,
            risk_budget: RiskBudget::default(),
            dynamic_exit: DynamicExitConfig::default(),
        }
    }
}

/// Summary statistics computed from a run's closed trades.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BacktestMetrics {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: Option<Decimal>,
    pub profit_factor: Option<Decimal>,
    pub total_net_pnl_inr: Decimal,
    pub total_estimated_cost_inr: Decimal,
    pub max_drawdown_inr: Decimal,
    pub avg_net_per_trade_inr: Option<Decimal>,
    /// Sharpe ratio of per-trade returns (net P&L over `equity_inr`),
    /// annualized on the 252-trading-day NSE convention.
    pub sharpe_ratio_annual252: Option<Decimal>,
}

impl BacktestMetrics {
    fn compute(trades: &[Trade], equity_inr: Decimal) -> Self {
        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut total_net = Decimal::ZERO;
        let mut total_cost = Decimal::ZERO;
        let mut profits_gross_abs = Decimal::ZERO;
        let mut losses_gross_abs = Decimal::ZERO;
        let mut running_equity = Decimal::ZERO;
        let mut equity_curve = Vec::with_capacity(trades.len());
        let mut returns = Vec::with_capacity(trades.len());

        for trade in trades {
            let net = trade.realized_net_pnl_inr.unwrap_or(Decimal::ZERO);
            let cost = trade.realized_cost_inr.unwrap_or(Decimal::ZERO);
            total_net += net;
            total_cost += cost;
            if net > Decimal::ZERO {
                wins += 1;
                profits_gross_abs += net.abs();
            } else if net < Decimal::ZERO {
                losses += 1;
                losses_gross_abs += net.abs();
            }
            running_equity += net;
            equity_curve.push(running_equity);
            if !equity_inr.is_zero() {
                returns.push(net / equity_inr);
            }
        }

        let win_rate = WinRate::calculate(Decimal::from(wins), Decimal::from(trades.len())).map(|w| w.value);
        let profit_factor = ProfitFactor::calculate(profits_gross_abs, losses_gross_abs).map(|p| p.value);
        let max_drawdown = MaxDrawdown::calculate(&equity_curve);
        let avg_net_per_trade = if trades.is_empty() {
            None
        } else {
            Some(total_net / Decimal::from(trades.len()))
        };
        let sharpe_ratio_annual252 = sharpe_of_returns(&returns).map(|s| s.scale(Annual252).value);

        Self {
            trades: trades.len(),
            wins,
            losses,
            win_rate,
            profit_factor,
            total_net_pnl_inr: total_net,
            total_estimated_cost_inr: total_cost,
            max_drawdown_inr: max_drawdown.value_inr,
            avg_net_per_trade_inr: avg_net_per_trade,
            sharpe_ratio_annual252,
        }
    }
}

/// Sharpe ratio of a per-trade INR return series, expressed per trade
/// (treated as [`Daily`] — an intraday engine closes at most a handful of
/// trades a day, so per-trade and per-day dispersion are taken as
/// equivalent) against a zero risk-free rate. `None` below two samples,
/// there being no meaningful dispersion to measure from a single return.
fn sharpe_of_returns(returns: &[Decimal]) -> Option<SharpeRatio<Daily>> {
    if returns.len() < 2 {
        return None;
    }
    let n = Decimal::from(returns.len());
    let mean = returns.iter().sum::<Decimal>() / n;
    let variance = returns.iter().map(|r| (*r - mean).powi(2)).sum::<Decimal>() / n;
    let std_dev = variance.sqrt().unwrap_or(Decimal::ZERO);
    Some(SharpeRatio::calculate(Decimal::ZERO, mean, std_dev, Daily))
}

/// The full record of one backtest run, matching the shape persisted to the
/// backtest-runs store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestRun {
    pub run_at: DateTime<Utc>,
    pub token: InstrumentToken,
    pub interval_min: u32,
    pub range: (DateTime<Utc>, DateTime<Utc>),
    pub seed: u64,
    pub params: BacktestParams,
    pub metrics: BacktestMetrics,
    pub trades: Vec<Trade>,
    pub quality_issues: Vec<Issue>,
}

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("candle series is empty")]
    NoCandles,
    #[error("data quality check failed: {0}")]
    Quality(#[from] QualityError),
}

/// Replays one instrument's candle series through the signal pipeline and
/// simulated execution, sequentially, with no wall-clock dependency —
/// every timestamp comes from the candles themselves.
pub struct BacktestHarness {
    params: BacktestParams,
    calendar: Arc<MarketCalendar>,
    strategies: StrategyRegistry,
    selector: Selector,
    quality_mode: DataQualityMode,
}

impl BacktestHarness {
    pub fn new(params: BacktestParams, calendar: Arc<MarketCalendar>, quality_mode: DataQualityMode) -> Self {
        let mut strategies = StrategyRegistry::new();
        family::register_all(&mut strategies);

        Self {
            params,
            calendar,
            strategies,
            selector: Selector::new(SelectorConfig::default()),
            quality_mode,
        }
    }

    pub async fn run(
        &self,
        instrument: &Instrument,
        candles: &[Candle],
        seed: u64,
    ) -> Result<BacktestRun, BacktestError> {
        if candles.is_empty() {
            return Err(BacktestError::NoCandles);
        }

        let quality_issues = quality::enforce(self.quality_mode, candles, &self.calendar)?;

        let broker = Arc::new(MockBrokerAdapter::default());
        let store = Arc::new(TradeStore::new());
        let risk = Arc::new(RiskEngine::new(RiskEngineConfig::default()));
        let governor = Arc::new(PortfolioGovernor::new(GovernorConfig {
            max_loss_r: Decimal::from(-4),
            max_loss_streak: 3,
            max_open_risk_r: Decimal::from(3),
            profit_goal_r: Decimal::from(6),
        }));
        let optimizer = Arc::new(AdaptiveOptimizer::new(OptimizerConfigParams {
            lookback_n: 20,
            min_samples: 8,
            block_ttl: ChronoDuration::minutes(60),
            fee_multiple_threshold: Decimal::ONE,
            spread_penalty_enabled: true,
        }));
        let rate_limiter = Arc::new(OrderRateLimiter::new(RateLimiterConfig {
            max_per_second: 3,
            max_per_minute: 60,
        }));
        let manager = TradeManager::new(
            broker.clone(),
            store.clone(),
            self.calendar.clone(),
            risk.clone(),
            governor.clone(),
            optimizer.clone(),
            rate_limiter.clone(),
            ChronoDuration::minutes(5),
        );

        let mut history: Vec<Candle> = Vec::with_capacity(candles.len());
        let mut closed_trades: Vec<Trade> = Vec::new();

        for candle in candles {
            history.push(candle.clone());
            broker.set_ltp(instrument.token, candle.close);

            self.reconcile_open_trades(&store, &governor, &risk, &optimizer, instrument, candle.timestamp, candle.close, &mut closed_trades);

            if history.len() < self.params.min_candles {
                continue;
            }
            if store.has_open_position(instrument.token) {
                continue;
            }

            let now = candle.timestamp;
            let minutes_since_open = self.calendar.minutes_since_open(now);
            let regime = self.selector.classify(&history, minutes_since_open);
            let active_styles = self.selector.active_styles(regime);
            let (_candidates, winner) = self.strategies.evaluate(&history, regime, &active_styles);

            let Some(signal) = winner else { continue };
            if signal.confidence < self.params.min_confidence {
                continue;
            }

            self.try_open(&manager, instrument, &signal, &history, now).await;
        }

        // Force-close anything still open at the end of the series at the
        // last candle's close, so the run's metrics reflect every position
        // the strategy took rather than discarding unrealized ones.
        if let Some(last) = candles.last() {
            self.reconcile_open_trades(
                &store,
                &governor,
                &risk,
                &optimizer,
                instrument,
                last.timestamp,
                last.close,
                &mut closed_trades,
            );
            for trade in store.all_live() {
                self.force_close(&store, &governor, &risk, &optimizer, &trade, last.close, last.timestamp, &mut closed_trades);
            }
        }

        let metrics = BacktestMetrics::compute(&closed_trades, self.params.risk_budget.equity_inr);
        let range = (candles.first().unwrap().timestamp, candles.last().unwrap().timestamp);

        Ok(BacktestRun {
            run_at: range.1,
            token: instrument.token,
            interval_min: candles[0].interval_minutes,
            range,
            seed,
            params: self.params.clone(),
            metrics,
            trades: closed_trades,
            quality_issues,
        })
    }

    async fn try_open(
        &self,
        manager: &TradeManager<MockBrokerAdapter>,
        instrument: &Instrument,
        signal: &Signal,
        history: &[Candle],
        now: DateTime<Utc>,
    ) {
        let bucket = self.calendar.bucket(now);
        let Some(plan) = self.build_entry_plan(signal, history, instrument, bucket) else {
            return;
        };

        let _ = manager
            .try_open_trade(
                &signal.strategy_id,
                &instrument.tradingsymbol,
                instrument.exchange,
                instrument.token,
                bucket,
                SpreadRegime::Normal,
                self.params.spread_penalty_enabled,
                plan,
                now,
            )
            .await;
    }

    fn build_entry_plan(
        &self,
        signal: &Signal,
        candles: &[Candle],
        instrument: &Instrument,
        bucket: SessionBucket,
    ) -> Option<EntryPlan> {
        let entry_price = signal.candle.close;
        let atr_value = atr(candles, ATR_PERIOD)?;
        let atr_decimal = Decimal::from_f64(atr_value).unwrap_or(Decimal::ZERO);

        let buffer_from_atr = atr_decimal * self.params.liquidity_buffer_atr_pct;
        let buffer_from_ticks = instrument.tick_size * Decimal::from(self.params.liquidity_buffer_ticks);
        let buffer = buffer_from_atr.max(buffer_from_ticks);
        if buffer.is_zero() {
            return None;
        }

        let raw_stop = match signal.side {
            Side::Buy => entry_price - buffer,
            Side::Sell => entry_price + buffer,
        };
        let stop_loss = avoid_round_level(raw_stop, entry_price, self.params.round_level_avoid_step);
        let risk_per_share = (entry_price - stop_loss).abs();
        if risk_per_share.is_zero() {
            return None;
        }

        let target_price = match signal.side {
            Side::Buy => entry_price + risk_per_share * self.params.risk_budget.target_rr_multiple,
            Side::Sell => entry_price - risk_per_share * self.params.risk_budget.target_rr_multiple,
        };

        Some(EntryPlan {
            side: signal.side,
            entry_price,
            stop_loss,
            target_price: Some(target_price),
            tick_size: instrument.tick_size,
            session_risk_inr: self.params.risk_budget.session_risk_inr(bucket),
            fee_per_lot: self.params.fee_per_lot_inr,
            lot_size: Decimal::from(instrument.lot_size),
            confidence_mult: Decimal::ONE,
            qty_mult: Decimal::ONE,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn reconcile_open_trades(
        &self,
        store: &TradeStore,
        governor: &PortfolioGovernor,
        risk: &RiskEngine,
        optimizer: &AdaptiveOptimizer,
        instrument: &Instrument,
        now: DateTime<Utc>,
        ltp: Decimal,
        closed_trades: &mut Vec<Trade>,
    ) {
        for trade in store.all_live() {
            if trade.instrument_token != instrument.token {
                continue;
            }
            let plan = DynamicExitManager::compute_exit_plan(&trade, ltp, now, &self.params.dynamic_exit, None);
            let trade_id = trade.trade_id.clone();
            let _ = store.with_trade(&trade_id, |t| {
                if let Some(sl) = plan.patch.stop_loss {
                    t.stop_loss = Some(sl);
                }
                if let Some(target) = plan.patch.target_price {
                    t.target_price = Some(target);
                }
                if let Some(peak) = plan.patch.peak_ltp {
                    t.peak_ltp = Some(peak);
                }
                if let Some(peak_pnl) = plan.patch.peak_pnl_inr {
                    t.peak_pnl_inr = peak_pnl;
                }
                if plan.patch.be_locked_at.is_some() {
                    t.be_locked = true;
                    t.be_locked_at = plan.patch.be_locked_at;
                }
                if plan.patch.trail_locked_at.is_some() {
                    t.trail_locked = true;
                    t.trail_locked_at = plan.patch.trail_locked_at;
                }
                if plan.patch.time_stop_triggered_at.is_some() {
                    t.time_stop_triggered = true;
                    t.time_stop_triggered_at = plan.patch.time_stop_triggered_at;
                }
            });

            if let ExitAction::ExitNow { reason } = plan.action {
                if let Some(refreshed) = store.get(&trade_id) {
                    self.close(&refreshed, reason, ltp, now, store, governor, risk, optimizer, closed_trades);
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn close(
        &self,
        trade: &Trade,
        reason: ExitReason,
        ltp: Decimal,
        now: DateTime<Utc>,
        store: &TradeStore,
        governor: &PortfolioGovernor,
        risk: &RiskEngine,
        optimizer: &AdaptiveOptimizer,
        closed_trades: &mut Vec<Trade>,
    ) {
        let gross = trade.unrealized_pnl_inr(ltp);
        let cost = self.params.fee_per_lot_inr * (trade.filled_qty / Decimal::ONE).max(Decimal::ONE);
        let net = gross - cost;
        let realized_r = trade.pnl_in_r(net);

        let terminal = match reason {
            ExitReason::Target => TradeState::ExitedTarget,
            ExitReason::StopLoss | ExitReason::IvCrush => TradeState::ExitedSl,
            ExitReason::TimeStopNoProgress | ExitReason::TimeStopMaxHold => TradeState::ExitedManual,
        };

        let result = store.with_trade(&trade.trade_id, |t| {
            t.realized_gross_pnl_inr = Some(gross);
            t.realized_cost_inr = Some(cost);
            t.realized_net_pnl_inr = Some(net);
            let _ = t.transition(terminal, now);
            let _ = t.transition(TradeState::Closed, now);
        });
        if result.is_err() {
            return;
        }

        governor.record_trade_closed(trade.trade_id.clone(), realized_r);
        risk.record_position_closed(trade.instrument_token);
        optimizer.record_closed_trade(&trade.underlying, &trade.strategy_id, self.calendar.bucket(now), Decimal::ONE, now);

        if let Some(closed) = store.remove(&trade.trade_id) {
            closed_trades.push(closed);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn force_close(
        &self,
        store: &TradeStore,
        governor: &PortfolioGovernor,
        risk: &RiskEngine,
        optimizer: &AdaptiveOptimizer,
        trade: &Trade,
        ltp: Decimal,
        now: DateTime<Utc>,
        closed_trades: &mut Vec<Trade>,
    ) {
        self.close(trade, ExitReason::TimeStopMaxHold, ltp, now, store, governor, risk, optimizer, closed_trades);
    }
}

/// Nudges `price` away from the nearest multiple of `step`, in the
/// direction that widens the stop, to avoid planting it exactly on a round
/// number where resting orders cluster.
fn avoid_round_level(price: Decimal, reference: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return price;
    }
    let remainder = price % step;
    let distance_to_level = remainder.abs().min((step - remainder.abs()).abs());
    if distance_to_level >= step / Decimal::from(4) {
        return price;
    }
    let widen_away_from_entry = (price - reference).is_sign_negative();
    if widen_away_from_entry {
        price - (step / Decimal::from(4))
    } else {
        price + (step / Decimal::from(4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ixtrade_data::candle::CandleSource;
    use ixtrade_markets::{ExchangeId, InstrumentType};
    use rust_decimal_macros::dec;

    fn calendar() -> Arc<MarketCalendar> {
        Arc::new(MarketCalendar::new("Asia/Kolkata", "09:15", "15:30", "15:00", "09:30", "15:00", &[]).unwrap())
    }

    fn instrument() -> Instrument {
        Instrument::new(InstrumentToken(1), "NIFTY", ExchangeId::Nse, "NSE", InstrumentType::Eq, dec!(0.05), 1).unwrap()
    }

    fn trending_candles(n: i64) -> Vec<Candle> {
        let start = DateTime::from_timestamp(1_704_085_500, 0).unwrap(); // 2024-01-01 09:15 UTC-ish
        (0..n)
            .map(|i| {
                let close = dec!(100) + Decimal::from(i) * dec!(0.5);
                Candle::new(
                    InstrumentToken(1),
                    5,
                    start + ChronoDuration::minutes(i * 5),
                    close - dec!(0.2),
                    close + dec!(0.3),
                    close - dec!(0.3),
                    close,
                    1_000,
                    CandleSource::Historical,
                )
                .unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn empty_candle_series_is_rejected() {
        let harness = BacktestHarness::new(BacktestParams::default(), calendar(), DataQualityMode::Off);
        let err = harness.run(&instrument(), &[], 1).await.unwrap_err();
        assert!(matches!(err, BacktestError::NoCandles));
    }

    #[tokio::test]
    async fn run_produces_metrics_consistent_with_its_trade_count() {
        let mut params = BacktestParams::default();
        params.min_candles = 20;
        let harness = BacktestHarness::new(params, calendar(), DataQualityMode::Off);

        let candles = trending_candles(40);
        let run = harness.run(&instrument(), &candles, 42).await.unwrap();

        assert_eq!(run.metrics.trades, run.trades.len());
        assert!(run.metrics.wins + run.metrics.losses <= run.metrics.trades);
        assert_eq!(run.seed, 42);
        assert_eq!(run.token, InstrumentToken(1));
    }

    #[test]
    fn sharpe_of_returns_needs_at_least_two_samples() {
        assert!(sharpe_of_returns(&[]).is_none());
        assert!(sharpe_of_returns(&[dec!(0.01)]).is_none());
    }

    #[test]
    fn sharpe_of_returns_annualizes_on_the_252_day_convention() {
        let daily = sharpe_of_returns(&[dec!(0.01), dec!(-0.005), dec!(0.02), dec!(-0.01)]).unwrap();
        assert_ne!(daily.value, Decimal::ZERO);
        let annualized = daily.clone().scale(Annual252).value;
        // sqrt(252) scaling strictly grows the magnitude of a non-zero ratio.
        assert!(annualized.abs() > daily.value.abs());
    }

    #[test]
    fn metrics_profit_factor_and_sharpe_are_populated_from_inr_pnl() {
        let equity_inr = dec!(1_000_000);
        let trades = vec![
            trade_with_net_pnl(dec!(6_000)),
            trade_with_net_pnl(dec!(-2_000)),
            trade_with_net_pnl(dec!(4_500)),
            trade_with_net_pnl(dec!(-1_000)),
        ];
        let metrics = BacktestMetrics::compute(&trades, equity_inr);

        assert_eq!(metrics.wins, 2);
        assert_eq!(metrics.losses, 2);
        // gross profit 10_500 / gross loss 3_000
        assert_eq!(metrics.profit_factor, Some(dec!(3.5)));
        assert!(metrics.sharpe_ratio_annual252.is_some());
    }

    fn trade_with_net_pnl(net: Decimal) -> Trade {
        let mut trade = Trade::new(
            "t",
            Side::Buy,
            "STRAT-A",
            "NIFTY",
            InstrumentToken(1),
            dec!(75),
            dec!(1.5),
            dec!(5_000),
            dec!(0.05),
            Utc::now(),
        );
        trade.realized_net_pnl_inr = Some(net);
        trade
    }

    #[tokio::test]
    async fn strict_quality_mode_surfaces_as_a_backtest_error() {
        let harness = BacktestHarness::new(BacktestParams::default(), calendar(), DataQualityMode::Strict);
        let mut candles = trending_candles(5);
        candles.swap(0, 1); // introduces a non-monotonic timestamp
        let err = harness.run(&instrument(), &candles, 1).await.unwrap_err();
        assert!(matches!(err, BacktestError::Quality(_)));
    }
}

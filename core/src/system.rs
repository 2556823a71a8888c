//! `System` — wires the admission chain, the dynamic exit manager and the
//! tick-ingestion pipeline into one running engine. [`SystemBuilder::build`]
//! constructs every component from an [`EngineConfig`] and a connected
//! [`BrokerAdapter`]; [`System::spawn`] starts the three always-on tasks
//! (tick drain, broker-event dispatch, exit reconcile) that keep it moving.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::halt::HaltBus;
use crate::signal::build_entry_plan;
use crate::telemetry::TelemetryRing;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ixtrade_data::queue::TickQueue;
use ixtrade_data::{CandleCache, InMemoryCandleStore, IngestEvent, TickIngestor};
use ixtrade_execution::{BrokerAdapter, BrokerEvent, ClientOrderId, OrderKind, PlaceOrderParams, TimeInForce};
use ixtrade_markets::{Instrument, InstrumentRepo, InstrumentToken, Side};
use ixtrade_risk::{
    AdaptiveOptimizer, GovernorConfig, MarketCalendar, OptimizerConfigParams, OrderRateLimiter,
    PortfolioGovernor, RateLimiterConfig, RiskEngine, RiskEngineConfig, SpreadRegime,
};
use ixtrade_strategies::{family, Selector, SelectorConfig, StrategyCandidate, StrategyRegistry};
use ixtrade_trader::exit::{DynamicExitManager, ExitAction, ExitReason};
use ixtrade_trader::{EntryPlan, Trade, TradeManager, TradeState, TradeStore};
use parking_lot::Mutex as SyncMutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};

/// Every component the running engine owns. Cheap to clone: every field is
/// an `Arc`. Built once by [`SystemBuilder::build`]; tasks are spawned
/// separately via [`System::spawn`] so a `System` can be constructed and
/// inspected in a test without starting anything.
pub struct System<B: BrokerAdapter> {
    pub broker: Arc<B>,
    pub repo: Arc<SyncMutex<InstrumentRepo>>,
    pub calendar: Arc<MarketCalendar>,
    pub risk: Arc<RiskEngine>,
    pub governor: Arc<PortfolioGovernor>,
    pub optimizer: Arc<AdaptiveOptimizer>,
    pub rate_limiter: Arc<OrderRateLimiter>,
    pub trade_manager: Arc<TradeManager<B>>,
    pub trade_store: Arc<TradeStore>,
    pub strategies: Arc<StrategyRegistry>,
    pub selector: Arc<Selector>,
    pub cache: Arc<SyncMutex<CandleCache>>,
    pub ingestor: Arc<TickIngestor<InMemoryCandleStore>>,
    pub tick_queue: Arc<TickQueue>,
    pub halt: HaltBus,
    pub config: Arc<EngineConfig>,
    /// Every strategy candidate the registry produced on the last few
    /// evaluation rounds, winner or not — an admin surface's window into
    /// why a trade did or didn't fire.
    pub recent_candidates: TelemetryRing<StrategyCandidate>,
}

impl<B: BrokerAdapter> std::fmt::Debug for System<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System").field("config", &self.config).finish_non_exhaustive()
    }
}

/// The dedup TTL for [`ixtrade_execution::OrderUpdateDedup`]; broker
/// reconnect replay windows observed in production never exceed a couple of
/// minutes, so five is a comfortable margin.
const ORDER_UPDATE_DEDUP_MINUTES: i64 = 5;

/// Bounded candle-cache ring per (instrument, interval); the signal
/// pipeline never needs more than a few hundred trailing candles.
const CANDLE_CACHE_CAPACITY: usize = 500;

const TICK_QUEUE_CAPACITY: usize = 4096;

/// Trailing window of strategy-candidate telemetry kept for inspection.
const CANDIDATE_RING_CAPACITY: usize = 200;

pub struct SystemBuilder;

impl SystemBuilder {
    /// Builds every component from `config` and a connected broker.
    /// Returns the [`System`] plus the two receivers [`System::spawn`]
    /// needs — kept outside the struct because `UnboundedReceiver` isn't
    /// `Clone` and only the spawned tasks ever consume them.
    pub fn build<Broker: BrokerAdapter + 'static>(
        config: EngineConfig,
        broker: Arc<Broker>,
        repo: InstrumentRepo,
        halt: HaltBus,
    ) -> Result<(Arc<System<Broker>>, UnboundedReceiver<IngestEvent>), EngineError> {
        let calendar = Arc::new(MarketCalendar::new(
            &config.market_calendar.timezone,
            &config.market_calendar.session_open,
            &config.market_calendar.session_close,
            &config.market_calendar.entry_cutoff,
            &config.market_calendar.open_end,
            &config.market_calendar.close_start,
            &config.market_calendar.holidays,
        )?);

        let risk = Arc::new(RiskEngine::new(RiskEngineConfig {
            max_trades_per_day: config.daily_limits.max_trades_per_day,
            ..RiskEngineConfig::default()
        }));

        let governor = Arc::new(PortfolioGovernor::new(GovernorConfig {
            max_loss_r: config.daily_limits.max_loss_r,
            max_loss_streak: config.daily_limits.max_loss_streak,
            max_open_risk_r: config.daily_limits.max_open_risk_r,
            profit_goal_r: config.daily_limits.profit_goal_r,
        }));

        let optimizer = Arc::new(AdaptiveOptimizer::new(OptimizerConfigParams {
            lookback_n: config.optimizer.lookback_days as usize,
            min_samples: config.optimizer.min_samples,
            block_ttl: ChronoDuration::minutes(i64::from(config.optimizer.block_ttl_minutes)),
            fee_multiple_threshold: config.optimizer.fee_multiple_threshold,
            spread_penalty_enabled: config.optimizer.spread_penalty_enabled,
        }));

        let rate_limiter = Arc::new(OrderRateLimiter::new(RateLimiterConfig {
            max_per_second: config.order_flow.max_orders_per_second,
            max_per_minute: config.order_flow.max_orders_per_minute,
        }));

        let trade_store = Arc::new(TradeStore::new());
        let trade_manager = Arc::new(TradeManager::new(
            broker.clone(),
            trade_store.clone(),
            calendar.clone(),
            risk.clone(),
            governor.clone(),
            optimizer.clone(),
            rate_limiter.clone(),
            ChronoDuration::minutes(ORDER_UPDATE_DEDUP_MINUTES),
        ));

        let mut registry = StrategyRegistry::new();
        family::register_all(&mut registry);
        let strategies = Arc::new(registry);
        let selector = Arc::new(Selector::new(SelectorConfig::default()));

        let cache = Arc::new(SyncMutex::new(CandleCache::new(CANDLE_CACHE_CAPACITY)));
        let store = Arc::new(SyncMutex::new(InMemoryCandleStore::new(ChronoDuration::days(30))));
        let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
        let (ingestor, tick_queue) = TickIngestor::new(
            TICK_QUEUE_CAPACITY,
            store,
            cache.clone(),
            events_tx,
            ChronoDuration::seconds(30),
        );

        let system = Arc::new(System {
            broker,
            repo: Arc::new(SyncMutex::new(repo)),
            calendar,
            risk,
            governor,
            optimizer,
            rate_limiter,
            trade_manager,
            trade_store,
            strategies,
            selector,
            cache,
            ingestor,
            tick_queue,
            halt,
            config: Arc::new(config),
            recent_candidates: TelemetryRing::new(CANDIDATE_RING_CAPACITY),
        });

        Ok((system, events_rx))
    }
}

impl<B: BrokerAdapter + 'static> System<B> {
    /// Spawns the tick-drain, broker-event dispatch and exit-reconcile
    /// tasks. Consumes the receivers `SystemBuilder::build` handed back;
    /// call exactly once per running system.
    pub fn spawn(self: Arc<Self>, events_rx: UnboundedReceiver<IngestEvent>) {
        tokio::spawn(self.ingestor.clone().run());
        tokio::spawn(Self::drive_signal_pipeline(self.clone(), events_rx));
        tokio::spawn(Self::drive_broker_events(self.clone()));
        tokio::spawn(Self::drive_exit_reconcile(self.clone()));
    }

    /// Consumes [`IngestEvent::CandleClose`] events: classifies the regime,
    /// evaluates the active strategy set, sizes the winner, and tries to
    /// open a trade. `Tick` events are ignored here — exit management reads
    /// LTP straight from the ingestor on its own reconcile cadence.
    async fn drive_signal_pipeline(system: Arc<Self>, mut events_rx: UnboundedReceiver<IngestEvent>) {
        while let Some(event) = events_rx.recv().await {
            let IngestEvent::CandleClose { candle } = event else {
                continue;
            };
            if system.halt.is_halted() {
                continue;
            }

            let token = candle.instrument_token;
            let interval = candle.interval_minutes;
            let instrument = system.repo.lock().by_token(token).cloned();
            let Some(instrument) = instrument else {
                warn!(?token, "candle close for an instrument not in the repo");
                continue;
            };

            let candles: Vec<_> = system
                .cache
                .lock()
                .recent(token, interval, system.config.strategy.min_candles)
                .into_iter()
                .cloned()
                .collect();
            if candles.len() < system.config.strategy.min_candles && !system.config.strategy.allow_synthetic_signals {
                continue;
            }

            let now = candle.timestamp;
            let minutes_since_open = system.calendar.minutes_since_open(now);
            let regime = system.selector.classify(&candles, minutes_since_open);
            let active_styles = system.selector.active_styles(regime);
            let (candidates, winner) = system.strategies.evaluate(&candles, regime, &active_styles);
            for candidate in candidates {
                system.recent_candidates.push(candidate);
            }

            let Some(signal) = winner else { continue };
            if signal.confidence < system.config.strategy.min_confidence {
                continue;
            }

            system.try_open_from_signal(&signal, &candles, &instrument, now).await;
        }
    }

    async fn try_open_from_signal(
        &self,
        signal: &ixtrade_strategies::Signal,
        candles: &[ixtrade_data::Candle],
        instrument: &Instrument,
        now: DateTime<Utc>,
    ) {
        let bucket = self.calendar.bucket(now);
        let fee_per_lot = Decimal::ZERO;
        let Some(plan): Option<EntryPlan> = build_entry_plan(
            signal,
            candles,
            instrument,
            bucket,
            &self.config.risk_budget,
            &self.config.dynamic_exit,
            fee_per_lot,
        ) else {
            return;
        };

        let underlying = underlying_symbol(instrument);
        let result = self
            .trade_manager
            .try_open_trade(
                &signal.strategy_id,
                &underlying,
                instrument.exchange,
                instrument.token,
                bucket,
                SpreadRegime::Normal,
                self.config.optimizer.spread_penalty_enabled,
                plan,
                now,
            )
            .await;

        match result {
            Ok(Some(trade_id)) => info!(trade_id, strategy_id = %signal.strategy_id, "trade opened"),
            Ok(None) => {}
            Err(err) => error!(strategy_id = %signal.strategy_id, %err, "failed to open trade"),
        }
    }

    /// Forwards the connected broker's tick and order-update events: ticks
    /// go to the ingestor, order updates drive the owning trade's state
    /// machine, and connectivity events get logged (and, on reconnect,
    /// trigger a full resubscribe).
    async fn drive_broker_events(system: Arc<Self>) {
        let mut rx = system.broker.events();
        while let Some(event) = rx.recv().await {
            match event {
                BrokerEvent::Ticks(ticks) => system.ingestor.on_ticks(ticks),
                BrokerEvent::OrderUpdate(update) => {
                    let Some(trade_id) = update.client_order_id.clone() else {
                        warn!("order update with no client_order_id, cannot route to a trade");
                        continue;
                    };
                    if let Err(err) = system.trade_manager.on_order_update(update, &trade_id.0, Utc::now()) {
                        error!(%err, "order update dispatch failed");
                    }
                }
                BrokerEvent::Connected => info!("broker connected"),
                BrokerEvent::Disconnected => warn!("broker disconnected"),
                BrokerEvent::Reconnected => {
                    info!("broker reconnected, resubscribing tracked tokens");
                    system.ingestor.resubscribe_all(&BrokerResubscriber(system.broker.clone()));
                }
                BrokerEvent::Error(message) => {
                    system.halt.report("BROKER_EVENT_ERROR", "broker", &message);
                }
            }
        }
    }

    /// Fixed-cadence loop: recomputes the exit plan for every live trade
    /// against its current LTP, applies SL/target patches, and places a
    /// market exit order the moment a rule says `ExitNow`.
    async fn drive_exit_reconcile(system: Arc<Self>) {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            ticker.tick().await;
            let now = Utc::now();
            for trade in system.trade_store.all_live() {
                let Some(ltp) = system.ingestor.ltp(trade.instrument_token) else {
                    continue;
                };
                let underlying_ltp = trade
                    .option
                    .as_ref()
                    .and_then(|o| system.ingestor.ltp(o.underlying_token));
                let plan = DynamicExitManager::compute_exit_plan(
                    &trade,
                    ltp,
                    now,
                    &system.config.dynamic_exit,
                    underlying_ltp,
                );

                let trade_id = trade.trade_id.clone();
                let apply_result = system.trade_store.with_trade(&trade_id, |t| {
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
                    if plan.patch.profit_lock_armed_at.is_some() {
                        t.profit_lock_armed_at = plan.patch.profit_lock_armed_at;
                        t.profit_lock_inr = plan.patch.profit_lock_inr;
                        t.profit_lock_r = plan.patch.profit_lock_r;
                    }
                });
                if let Err(err) = apply_result {
                    error!(trade_id, %err, "failed to apply exit patch");
                    continue;
                }

                if let ExitAction::ExitNow { reason } = plan.action {
                    system.place_exit_order(&trade_id, &trade, reason, ltp, now).await;
                }
            }
        }
    }

    /// Places the exit market order and, on success, closes the trade out
    /// immediately rather than waiting for a broker order-update: a market
    /// order's fill price isn't known synchronously, but the admission
    /// chain already treats `place_order`'s success as the entry fact, so
    /// closing symmetrically on the exit side keeps one commit point
    /// instead of two.
    async fn place_exit_order(
        &self,
        trade_id: &str,
        trade: &Trade,
        reason: ExitReason,
        ltp: Decimal,
        now: DateTime<Utc>,
    ) {
        let exit_side = match trade.side {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        };
        let instrument = self.repo.lock().by_token(trade.instrument_token).cloned();
        let Some(instrument) = instrument else {
            error!(trade_id, "cannot place exit order, instrument missing from repo");
            return;
        };

        let placed = self
            .broker
            .place_order(PlaceOrderParams {
                client_order_id: ClientOrderId(format!("{trade_id}-exit")),
                exchange: instrument.exchange,
                instrument_token: instrument.token,
                side: exit_side,
                quantity: trade.filled_qty,
                kind: OrderKind::Market,
                price: None,
                trigger_price: None,
                time_in_force: TimeInForce::Day,
            })
            .await;

        let Ok(_broker_order_id) = placed else {
            error!(trade_id, "exit order placement failed");
            return;
        };

        info!(trade_id, ?reason, %ltp, "exit order placed");
        let terminal = match reason {
            ExitReason::Target => TradeState::ExitedTarget,
            ExitReason::StopLoss | ExitReason::IvCrush => TradeState::ExitedSl,
            ExitReason::TimeStopNoProgress | ExitReason::TimeStopMaxHold => TradeState::ExitedManual,
        };
        let realized_r = trade.pnl_in_r(trade.unrealized_pnl_inr(ltp));
        // Neutral until real per-trade fee accounting is wired through
        // from the broker's contract note.
        let fee_multiple = Decimal::ONE;

        let closed = self.trade_store.with_trade(trade_id, |t| {
            let _ = t.transition(terminal, now);
            let _ = t.transition(TradeState::Closed, now);
        });
        if let Err(err) = closed {
            error!(trade_id, %err, "failed to transition trade to closed after exit fill");
            return;
        }

        self.governor.record_trade_closed(trade_id, realized_r);
        self.risk.record_position_closed(trade.instrument_token);
        self.optimizer.record_closed_trade(
            &trade.underlying,
            &trade.strategy_id,
            self.calendar.bucket(now),
            fee_multiple,
            now,
        );
    }
}

fn underlying_symbol(instrument: &Instrument) -> String {
    instrument.tradingsymbol.clone()
}

/// Adapts a [`BrokerAdapter`] to the narrow [`ixtrade_data::TokenResubscriber`]
/// capability the ingestor needs, without handing it the whole broker
/// surface.
struct BrokerResubscriber<B: BrokerAdapter>(Arc<B>);

impl<B: BrokerAdapter + 'static> ixtrade_data::TokenResubscriber for BrokerResubscriber<B> {
    fn resubscribe(&self, tokens: &[InstrumentToken]) {
        let broker = self.0.clone();
        let tokens = tokens.to_vec();
        tokio::spawn(async move {
            if let Err(err) = broker.subscribe(&tokens).await {
                error!(%err, "resubscribe failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use ixtrade_data::candle::CandleSource;
    use ixtrade_data::Candle;
    use ixtrade_execution::MockBrokerAdapter;
    use ixtrade_markets::{ExchangeId, InstrumentType};
    use ixtrade_strategies::signal::{Regime, Style};
    use ixtrade_strategies::Signal;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn instrument(token: InstrumentToken) -> Instrument {
        Instrument::new(token, "NIFTY", ExchangeId::Nse, "NSE", InstrumentType::Eq, dec!(0.05), 1).unwrap()
    }

    fn candles(token: InstrumentToken) -> Vec<Candle> {
        (0..20)
            .map(|i| {
                Candle::new(
                    token,
                    5,
                    now() + chrono::Duration::minutes(i),
                    dec!(100),
                    dec!(101),
                    dec!(99),
                    dec!(100) + Decimal::new(i % 3, 1),
                    1_000,
                    CandleSource::Live,
                )
                .unwrap()
            })
            .collect()
    }

    fn build_system() -> (Arc<System<MockBrokerAdapter>>, UnboundedReceiver<IngestEvent>) {
        build_system_with_config(EngineConfig::default())
    }

    fn build_system_with_config(
        config: EngineConfig,
    ) -> (Arc<System<MockBrokerAdapter>>, UnboundedReceiver<IngestEvent>) {
        let broker = Arc::new(MockBrokerAdapter::default());
        let halt = HaltBus::new(10);
        SystemBuilder::build(config, broker, InstrumentRepo::new(), halt).unwrap()
    }

    #[tokio::test]
    async fn build_wires_every_component_without_starting_any_task() {
        let (system, _events_rx) = build_system();
        assert!(system.trade_store.all_live().is_empty());
        assert_eq!(system.config.strategy.min_candles, 50);
    }

    #[tokio::test]
    async fn signal_pipeline_ignores_candle_close_for_an_instrument_not_in_the_repo() {
        let (system, _events_rx) = build_system();
        let token = InstrumentToken(42);
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(IngestEvent::CandleClose { candle: candles(token).pop().unwrap() }).unwrap();
        drop(tx);

        System::drive_signal_pipeline(system.clone(), rx).await;
        assert!(system.trade_store.all_live().is_empty());
    }

    #[tokio::test]
    async fn signal_pipeline_stays_quiet_while_halted() {
        let (system, _events_rx) = build_system();
        let token = InstrumentToken(7);
        system.repo.lock().insert(instrument(token));
        system.halt.halt("test", "manual halt");

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(IngestEvent::CandleClose { candle: candles(token).pop().unwrap() }).unwrap();
        drop(tx);

        System::drive_signal_pipeline(system.clone(), rx).await;
        assert!(system.trade_store.all_live().is_empty());
    }

    #[tokio::test]
    async fn try_open_from_signal_places_an_order_and_creates_a_live_trade() {
        let (system, _events_rx) = build_system();
        let token = InstrumentToken(7);
        system.repo.lock().insert(instrument(token));
        system.broker.set_ltp(token, dec!(100));

        let history = candles(token);
        let signal = Signal {
            strategy_id: "STRAT-A".to_string(),
            style: Style::Trend,
            side: Side::Buy,
            confidence: 90,
            reason: "test".to_string(),
            candle: history.last().cloned().unwrap(),
            regime: Regime::Trend,
            produced_at: now(),
        };

        system.try_open_from_signal(&signal, &history, &instrument(token), now()).await;

        let live = system.trade_store.all_live();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].strategy_id, "STRAT-A");
    }

    #[tokio::test]
    async fn recent_candidates_ring_records_every_evaluation_round() {
        let mut config = EngineConfig::default();
        config.strategy.min_candles = 20;
        let (system, events_rx) = build_system_with_config(config);
        let token = InstrumentToken(7);
        system.repo.lock().insert(instrument(token));

        let mut cache = system.cache.lock();
        for candle in candles(token) {
            cache.push(candle);
        }
        drop(cache);

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(IngestEvent::CandleClose { candle: candles(token).pop().unwrap() }).unwrap();
        drop(tx);
        drop(events_rx);

        System::drive_signal_pipeline(system.clone(), rx).await;
        assert!(!system.recent_candidates.is_empty());
    }
}

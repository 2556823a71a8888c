//! [`TradeManager`] — runs the entry admission chain, places and tracks
//! orders through a [`BrokerAdapter`], and drives [`Trade`] transitions
//! from broker order-update events.

use crate::error::TradeError;
use crate::store::TradeStore;
use crate::trade::{Trade, TradeState};
use chrono::{DateTime, Utc};
use ixtrade_execution::{
    classify_rejection, BrokerAdapter, ClientOrderId, OrderKind, OrderStatus, OrderUpdate,
    OrderUpdateDedup, PlaceOrderParams, RejectionKind, TimeInForce,
};
use ixtrade_markets::{ExchangeId, InstrumentToken, Side};
use ixtrade_risk::{
    AdaptiveOptimizer, GovernorDenialReason, MarketCalendar, OptimizerVerdict, OrderRateLimiter,
    PortfolioGovernor, RiskDenialReason, RiskEngine, RiskKey, SpreadRegime,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

/// Which admission-chain stage refused the signal, and why. Every denial
/// is terminal for that signal: the chain stops at the first refusal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDenial {
    Halted,
    TradingDisabled,
    OutsideSession,
    Risk(RiskDenialReason),
    Governor(GovernorDenialReason),
    OptimizerBlocked { reason: String },
    RateLimited,
}

/// Everything the sizing step needs beyond the signal itself: the
/// strategy's raw entry/stop/target anchors and the budget to size against.
#[derive(Debug, Clone, Copy)]
pub struct EntryPlan {
    pub side: Side,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub target_price: Option<Decimal>,
    pub tick_size: Decimal,
    pub session_risk_inr: Decimal,
    pub fee_per_lot: Decimal,
    pub lot_size: Decimal,
    pub confidence_mult: Decimal,
    pub qty_mult: Decimal,
}

impl EntryPlan {
    fn risk_per_share(&self) -> Decimal {
        (self.entry_price - self.stop_loss).abs()
    }

    /// `(entry−stop)·qty + fee_per_lot·lots ≤ sessionRiskInr`, solved for
    /// the largest `qty` (in whole lots) that respects the budget, then
    /// scaled down by the optimizer's confidence/qty multipliers.
    fn size_quantity(&self) -> Decimal {
        let risk_per_share = self.risk_per_share();
        if risk_per_share.is_zero() || self.lot_size.is_zero() {
            return Decimal::ZERO;
        }
        let budget = self.session_risk_inr * self.confidence_mult * self.qty_mult;
        let risk_per_lot = risk_per_share * self.lot_size;
        let mut lots = Decimal::ZERO;
        let mut total_cost = Decimal::ZERO;
        loop {
            let next_cost = total_cost + risk_per_lot + self.fee_per_lot;
            if next_cost > budget {
                break;
            }
            total_cost = next_cost;
            lots += Decimal::ONE;
        }
        lots * self.lot_size
    }
}

pub struct TradeManager<B: BrokerAdapter> {
    broker: Arc<B>,
    store: Arc<TradeStore>,
    calendar: Arc<MarketCalendar>,
    risk: Arc<RiskEngine>,
    governor: Arc<PortfolioGovernor>,
    optimizer: Arc<AdaptiveOptimizer>,
    rate_limiter: Arc<OrderRateLimiter>,
    dedup: parking_lot::Mutex<OrderUpdateDedup>,
    trading_enabled: std::sync::atomic::AtomicBool,
    next_trade_seq: std::sync::atomic::AtomicU64,
}

impl<B: BrokerAdapter> TradeManager<B> {
    pub fn new(
        broker: Arc<B>,
        store: Arc<TradeStore>,
        calendar: Arc<MarketCalendar>,
        risk: Arc<RiskEngine>,
        governor: Arc<PortfolioGovernor>,
        optimizer: Arc<AdaptiveOptimizer>,
        rate_limiter: Arc<OrderRateLimiter>,
        dedup_ttl: chrono::Duration,
    ) -> Self {
        Self {
            broker,
            store,
            calendar,
            risk,
            governor,
            optimizer,
            rate_limiter,
            dedup: parking_lot::Mutex::new(OrderUpdateDedup::new(dedup_ttl)),
            trading_enabled: std::sync::atomic::AtomicBool::new(true),
            next_trade_seq: std::sync::atomic::AtomicU64::new(1),
        }
    }

    pub fn set_trading_enabled(&self, enabled: bool) {
        self.trading_enabled.store(enabled, std::sync::atomic::Ordering::SeqCst);
    }

    fn fresh_trade_id(&self) -> String {
        let n = self.next_trade_seq.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        format!("T{n}")
    }

    /// Runs admission-chain stages 1-5 in order. The first stage to refuse
    /// wins; nothing downstream is evaluated.
    fn admit(
        &self,
        symbol: &str,
        strategy_id: &str,
        token: InstrumentToken,
        bucket: ixtrade_risk::SessionBucket,
        spread_regime: SpreadRegime,
        spread_hard_block_enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<(Decimal, Decimal), AdmissionDenial> {
        if !self.trading_enabled.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AdmissionDenial::TradingDisabled);
        }
        if !self.calendar.allows_entry(now) {
            return Err(AdmissionDenial::OutsideSession);
        }
        self.risk.can_trade(token, now).map_err(AdmissionDenial::Risk)?;
        self.governor.can_open_new_trade().map_err(AdmissionDenial::Governor)?;

        let verdict = self.optimizer.evaluate_signal(
            symbol,
            strategy_id,
            bucket,
            spread_regime,
            spread_hard_block_enabled,
            now,
        );
        let (confidence_mult, qty_mult) = match verdict {
            OptimizerVerdict::Blocked { reason, .. } => {
                return Err(AdmissionDenial::OptimizerBlocked { reason });
            }
            OptimizerVerdict::Ok { confidence_mult, qty_mult } => (confidence_mult, qty_mult),
        };

        if !self.rate_limiter.check(now) {
            return Err(AdmissionDenial::RateLimited);
        }

        Ok((confidence_mult, qty_mult))
    }

    /// Runs the admission chain and, if it passes, sizes and places the
    /// entry order. Logs a `BLOCKED` line with stage/reason on refusal
    /// instead of propagating an error — a blocked signal is routine, not
    /// exceptional.
    pub async fn try_open_trade(
        &self,
        strategy_id: &str,
        underlying: &str,
        exchange: ExchangeId,
        token: InstrumentToken,
        bucket: ixtrade_risk::SessionBucket,
        spread_regime: SpreadRegime,
        spread_hard_block_enabled: bool,
        mut plan: EntryPlan,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, TradeError> {
        let (confidence_mult, qty_mult) = match self.admit(
            underlying,
            strategy_id,
            token,
            bucket,
            spread_regime,
            spread_hard_block_enabled,
            now,
        ) {
            Ok(mults) => mults,
            Err(denial) => {
                info!(stage = ?denial, strategy_id, underlying, "BLOCKED");
                return Ok(None);
            }
        };
        plan.confidence_mult = confidence_mult;
        plan.qty_mult = qty_mult;

        let qty = plan.size_quantity();
        if qty.is_zero() {
            return Err(TradeError::NonPositiveQuantity(strategy_id.to_string()));
        }

        let risk_per_share = plan.risk_per_share();
        let risk_inr = risk_per_share * qty;
        let rr = plan
            .target_price
            .filter(|_| !risk_per_share.is_zero())
            .map(|target| (target - plan.entry_price).abs() / risk_per_share)
            .unwrap_or(Decimal::ONE);
        let trade_id = self.fresh_trade_id();
        let mut new_trade = Trade::new(
            trade_id.clone(),
            plan.side,
            strategy_id,
            underlying,
            token,
            qty,
            rr,
            risk_inr,
            plan.tick_size,
            now,
        );
        new_trade.stop_loss = Some(plan.stop_loss);
        new_trade.target_price = plan.target_price;
        self.store.insert(new_trade);

        let client_order_id = ClientOrderId(trade_id.clone());
        let placed = self
            .broker
            .place_order(PlaceOrderParams {
                client_order_id,
                exchange,
                instrument_token: token,
                side: plan.side,
                quantity: qty,
                kind: OrderKind::Market,
                price: None,
                trigger_price: None,
                time_in_force: TimeInForce::Day,
            })
            .await;

        match placed {
            Ok(broker_order_id) => {
                self.store.with_trade(&trade_id, |t| {
                    t.entry_order_id = Some(broker_order_id.clone());
                    let _ = t.transition(TradeState::EntryPlaced, now);
                })?;
                self.risk.record_trade_opened();
                self.governor.record_trade_opened(trade_id.clone(), Decimal::ONE);
                self.risk.record_position_opened(token);
            }
            Err(err) => {
                self.store.with_trade(&trade_id, |t| {
                    let _ = t.transition(TradeState::EntryFailed, now);
                })?;
                self.risk.record_order_failure();
                return Err(TradeError::Execution(err));
            }
        }

        Ok(Some(trade_id))
    }

    /// Deduplicates and dispatches a broker order-update event, driving
    /// the owning [`Trade`]'s state machine and, on a circuit-breaker
    /// rejection, arming a per-(strategy, underlying, token) cooldown.
    pub fn on_order_update(
        &self,
        update: OrderUpdate,
        trade_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TradeError> {
        let admitted = self.dedup.lock().admit(&update, now);
        if !admitted {
            return Ok(());
        }

        match update.status {
            OrderStatus::Filled | OrderStatus::PartiallyFilled => {
                let fill_price = update.average_price.unwrap_or(Decimal::ZERO);
                self.store.with_trade(trade_id, |t| {
                    if update.status == OrderStatus::Filled {
                        t.record_entry_fill(fill_price, update.filled_quantity, t.stop_loss.unwrap_or(fill_price), t.target_price);
                        let _ = t.transition(TradeState::EntryFilled, now);
                        let _ = t.transition(TradeState::Live, now);
                    }
                })?;
                self.risk.record_order_success();
            }
            OrderStatus::Rejected => {
                let trade = self.store.get(trade_id).ok_or_else(|| TradeError::NotFound(trade_id.to_string()))?;
                let message = update.rejection_message.clone().unwrap_or_default();
                let kind = classify_rejection(&message);
                if kind == RejectionKind::CircuitBreaker {
                    self.risk.set_cooldown(
                        &RiskKey::StrategyUnderlyingToken {
                            strategy_id: trade.strategy_id.clone(),
                            underlying: trade.underlying.clone(),
                            token: trade.instrument_token,
                        },
                        now,
                        chrono::Duration::seconds(60),
                    );
                }
                self.store.with_trade(trade_id, |t| {
                    let _ = t.transition(TradeState::EntryFailed, now);
                })?;
                self.risk.record_order_failure();
                self.risk.record_position_closed(trade.instrument_token);
                warn!(trade_id, ?kind, "order rejected");
            }
            OrderStatus::Cancelled => {
                let trade = self.store.get(trade_id).ok_or_else(|| TradeError::NotFound(trade_id.to_string()))?;
                self.store.with_trade(trade_id, |t| {
                    let _ = t.transition(TradeState::EntryCancelled, now);
                })?;
                self.risk.record_position_closed(trade.instrument_token);
            }
            OrderStatus::Open => {}
        }
        Ok(())
    }

    /// Whether every known LIVE trade has a broker-confirmed entry fact.
    /// New entries are blocked until this holds (global fact-recovery
    /// gate): a LIVE trade with no `entry_order_id` means the broker's
    /// view and ours have diverged and must be reconciled first.
    pub fn fact_recovery_gate_clear(&self) -> bool {
        self.store
            .all_live()
            .iter()
            .all(|t| t.entry_order_id.is_some() && t.entry_price.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ixtrade_execution::MockBrokerAdapter;
    use ixtrade_risk::{
        GovernorConfig, MarketCalendar, OptimizerConfigParams, RateLimiterConfig, RiskEngineConfig,
        SessionBucket,
    };
    use rust_decimal_macros::dec;

    fn manager() -> TradeManager<MockBrokerAdapter> {
        let calendar = Arc::new(
            MarketCalendar::new("Asia/Kolkata", "00:00", "23:59", "23:59", "00:00", "23:59", &[])
                .unwrap(),
        );
        TradeManager::new(
            Arc::new(MockBrokerAdapter::default()),
            Arc::new(TradeStore::new()),
            calendar,
            Arc::new(RiskEngine::new(RiskEngineConfig::default())),
            Arc::new(PortfolioGovernor::new(GovernorConfig {
                max_loss_r: dec!(4),
                max_loss_streak: 3,
                max_open_risk_r: dec!(3),
                profit_goal_r: dec!(6),
            })),
            Arc::new(AdaptiveOptimizer::new(OptimizerConfigParams {
                lookback_n: 20,
                min_samples: 8,
                block_ttl: chrono::Duration::minutes(60),
                fee_multiple_threshold: Decimal::ONE,
                spread_penalty_enabled: true,
            })),
            Arc::new(OrderRateLimiter::new(RateLimiterConfig { max_per_second: 3, max_per_minute: 60 })),
            chrono::Duration::seconds(30),
        )
    }

    fn plan() -> EntryPlan {
        EntryPlan {
            side: Side::Buy,
            entry_price: dec!(100),
            stop_loss: dec!(90),
            target_price: Some(dec!(110)),
            tick_size: dec!(0.05),
            session_risk_inr: dec!(10000),
            fee_per_lot: dec!(20),
            lot_size: Decimal::ONE,
            confidence_mult: Decimal::ONE,
            qty_mult: Decimal::ONE,
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn admitted_signal_opens_a_live_trade() {
        let mgr = manager();
        let token = InstrumentToken(1);
        mgr.broker.set_ltp(token, dec!(100));
        let trade_id = mgr
            .try_open_trade(
                "STRAT-A",
                "NIFTY",
                ExchangeId::Simulated,
                token,
                SessionBucket::Mid,
                SpreadRegime::Normal,
                true,
                plan(),
                now(),
            )
            .await
            .unwrap()
            .expect("trade opened");

        let trade = mgr.store.get(&trade_id).unwrap();
        assert_eq!(trade.state, TradeState::Live);
        assert_eq!(trade.entry_price, Some(dec!(100)));
    }

    #[tokio::test]
    async fn kill_switch_blocks_new_entries() {
        let mgr = manager();
        mgr.risk.set_kill_switch(true);
        let token = InstrumentToken(2);
        let result = mgr
            .try_open_trade(
                "STRAT-A",
                "NIFTY",
                ExchangeId::Simulated,
                token,
                SessionBucket::Mid,
                SpreadRegime::Normal,
                true,
                plan(),
                now(),
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn circuit_breaker_rejection_sets_scoped_cooldown() {
        let mgr = manager();
        let token = InstrumentToken(260226);
        mgr.store.insert(Trade::new(
            "T1", Side::Buy, "STRAT-A", "NIFTY", token,
            dec!(10), Decimal::ONE, dec!(100), dec!(0.05), now(),
        ));

        mgr.on_order_update(
            OrderUpdate {
                broker_order_id: ixtrade_execution::BrokerOrderId("B1".into()),
                client_order_id: None,
                instrument_token: token,
                status: OrderStatus::Rejected,
                filled_quantity: Decimal::ZERO,
                average_price: None,
                rejection_message: Some("price band exceeded / circuit".to_string()),
                exchange_timestamp: now(),
            },
            "T1",
            now(),
        )
        .unwrap();

        let key = RiskKey::StrategyUnderlyingToken {
            strategy_id: "STRAT-A".to_string(),
            underlying: "NIFTY".to_string(),
            token,
        };
        assert!(mgr.risk.is_cooling_down(&key, now() + chrono::Duration::seconds(30)));
        assert!(!mgr.risk.is_cooling_down(&key, now() + chrono::Duration::seconds(61)));
    }
}

//! [`PortfolioGovernor`] — admission chain stage 3: daily max
//! loss in R, daily profit goal, loss-streak cap, max open-risk-R, and the
//! order-error breaker.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernorDenialReason {
    DailyMaxLoss,
    LossStreak,
    MaxOpenRisk,
    OrderErrorBreakerArmed,
    ProfitGoalReached,
}

#[derive(Debug, Clone)]
pub struct GovernorConfig {
    pub max_loss_r: Decimal,
    pub max_loss_streak: u32,
    pub max_open_risk_r: Decimal,
    pub profit_goal_r: Decimal,
}

#[derive(Debug, Default)]
struct GovernorState {
    realized_r_today: Decimal,
    loss_streak: u32,
    open_risk_by_trade: HashMap<String, Decimal>,
    order_error_breaker_armed: bool,
    processed_closed_trade_ids: HashSet<String>,
}

#[derive(Debug)]
pub struct PortfolioGovernor {
    config: GovernorConfig,
    state: RwLock<GovernorState>,
}

impl PortfolioGovernor {
    pub fn new(config: GovernorConfig) -> Self {
        Self { config, state: RwLock::new(GovernorState::default()) }
    }

    pub fn can_open_new_trade(&self) -> Result<(), GovernorDenialReason> {
        let state = self.state.read();
        if state.realized_r_today <= -self.config.max_loss_r.abs() {
            return Err(GovernorDenialReason::DailyMaxLoss);
        }
        if state.loss_streak >= self.config.max_loss_streak {
            return Err(GovernorDenialReason::LossStreak);
        }
        if self.open_risk_sum(&state) >= self.config.max_open_risk_r {
            return Err(GovernorDenialReason::MaxOpenRisk);
        }
        if state.order_error_breaker_armed {
            return Err(GovernorDenialReason::OrderErrorBreakerArmed);
        }
        if state.realized_r_today >= self.config.profit_goal_r {
            return Err(GovernorDenialReason::ProfitGoalReached);
        }
        Ok(())
    }

    pub fn has_hit_profit_goal(&self) -> bool {
        self.state.read().realized_r_today >= self.config.profit_goal_r
    }

    fn open_risk_sum(&self, state: &GovernorState) -> Decimal {
        state.open_risk_by_trade.values().sum()
    }

    pub fn record_trade_opened(&self, trade_id: impl Into<String>, risk_r: Decimal) {
        self.state.write().open_risk_by_trade.insert(trade_id.into(), risk_r);
    }

    /// Updates daily counters for a closed trade exactly once per
    /// `trade_id` — a close replayed twice must not double-count.
    pub fn record_trade_closed(&self, trade_id: impl Into<String>, realized_r: Decimal) {
        let trade_id = trade_id.into();
        let mut state = self.state.write();
        if !state.processed_closed_trade_ids.insert(trade_id.clone()) {
            return;
        }
        state.open_risk_by_trade.remove(&trade_id);
        state.realized_r_today += realized_r;
        if realized_r < Decimal::ZERO {
            state.loss_streak += 1;
        } else {
            state.loss_streak = 0;
        }
    }

    pub fn arm_order_error_breaker(&self) {
        self.state.write().order_error_breaker_armed = true;
    }

    pub fn reset_order_error_breaker(&self) {
        self.state.write().order_error_breaker_armed = false;
    }

    pub fn open_risk_r(&self) -> Decimal {
        self.open_risk_sum(&self.state.read())
    }

    pub fn reset_daily(&self) {
        let mut state = self.state.write();
        state.realized_r_today = Decimal::ZERO;
        state.loss_streak = 0;
        state.processed_closed_trade_ids.clear();
    }
}

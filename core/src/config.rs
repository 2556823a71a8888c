//! Flat key/value configuration read at startup.
//! Grouped the way the surface describes them; defaults live alongside each
//! struct rather than scattered through call sites.

use ixtrade_risk::SessionBucket;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub strategy: StrategyConfig,
    pub risk_budget: RiskBudgetConfig,
    pub daily_limits: DailyLimitsConfig,
    pub dynamic_exit: DynamicExitConfig,
    pub order_flow: OrderFlowConfig,
    pub market_calendar: MarketCalendarConfig,
    pub optimizer: OptimizerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyConfig::default(),
            risk_budget: RiskBudgetConfig::default(),
            daily_limits: DailyLimitsConfig::default(),
            dynamic_exit: DynamicExitConfig::default(),
            order_flow: OrderFlowConfig::default(),
            market_calendar: MarketCalendarConfig::default(),
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Loads config from a TOML file, falling back to field defaults for
    /// anything the file omits (`#[serde(default)]` on every nested field).
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub intervals_minutes: Vec<u32>,
    pub min_confidence: u8,
    pub allow_synthetic_signals: bool,
    pub min_candles: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            intervals_minutes: vec![1, 5],
            min_confidence: 55,
            allow_synthetic_signals: false,
            min_candles: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RiskBudgetConfig {
    pub equity_inr: Decimal,
    pub per_trade_risk_pct: Decimal,
    pub volatility_target_bps: Decimal,
    pub per_trade_risk_min_inr: Decimal,
    pub per_trade_risk_max_inr: Decimal,
    pub day_state_multiplier_open: Decimal,
    pub day_state_multiplier_mid: Decimal,
    pub day_state_multiplier_close: Decimal,
    /// Target distance from entry, expressed as a multiple of the per-share
    /// risk computed from the stop-loss anchor.
    pub target_rr_multiple: Decimal,
}

impl Default for RiskBudgetConfig {
    fn default() -> Self {
        Self {
            equity_inr: Decimal::from(1_000_000),
            per_trade_risk_pct: Decimal::new(5, 3),
            volatility_target_bps: Decimal::from(50),
            per_trade_risk_min_inr: Decimal::from(500),
            per_trade_risk_max_inr: Decimal::from(20_000),
            day_state_multiplier_open: Decimal::new(8, 1),
            day_state_multiplier_mid: Decimal::ONE,
            day_state_multiplier_close: Decimal::new(6, 1),
            target_rr_multiple: Decimal::new(15, 1),
        }
    }
}

impl RiskBudgetConfig {
    /// The INR risk budget for one new trade, scaled by day-state and
    /// clamped to the configured min/max.
    pub fn session_risk_inr(&self, bucket: SessionBucket) -> Decimal {
        let multiplier = match bucket {
            SessionBucket::Open => self.day_state_multiplier_open,
            SessionBucket::Mid => self.day_state_multiplier_mid,
            SessionBucket::Close => self.day_state_multiplier_close,
        };
        (self.equity_inr * self.per_trade_risk_pct * multiplier)
            .clamp(self.per_trade_risk_min_inr, self.per_trade_risk_max_inr)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DailyLimitsConfig {
    pub max_loss_r: Decimal,
    pub max_loss_streak: u32,
    pub max_trades_per_day: u32,
    pub max_open_risk_r: Decimal,
    pub profit_goal_r: Decimal,
    pub profit_lock_r: Decimal,
}

impl Default for DailyLimitsConfig {
    fn default() -> Self {
        Self {
            max_loss_r: Decimal::from(-4),
            max_loss_streak: 3,
            max_trades_per_day: 12,
            max_open_risk_r: Decimal::from(3),
            profit_goal_r: Decimal::from(6),
            profit_lock_r: Decimal::ONE,
        }
    }
}

// `DynamicExitManager::compute_exit_plan` and its config struct live next
// to each other in `ixtrade-trader`; re-exported here so it nests into
// `EngineConfig` like every other section instead of being duplicated.
pub use ixtrade_trader::exit::DynamicExitConfig;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OrderFlowConfig {
    pub max_orders_per_second: u32,
    pub max_orders_per_minute: u32,
    pub order_error_breaker_window: Duration,
    pub order_error_breaker_max: u32,
    pub cooldown_circuit_breaker_secs: u64,
    pub cooldown_margin_secs: u64,
    pub cooldown_session_closed_secs: u64,
    pub cooldown_other_secs: u64,
}

impl Default for OrderFlowConfig {
    fn default() -> Self {
        Self {
            max_orders_per_second: 3,
            max_orders_per_minute: 60,
            order_error_breaker_window: Duration::from_secs(300),
            order_error_breaker_max: 5,
            cooldown_circuit_breaker_secs: 60,
            cooldown_margin_secs: 30,
            cooldown_session_closed_secs: 120,
            cooldown_other_secs: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketCalendarConfig {
    pub timezone: String,
    pub session_open: String,
    pub session_close: String,
    pub entry_cutoff: String,
    pub open_end: String,
    pub close_start: String,
    pub holidays: Vec<String>,
}

impl Default for MarketCalendarConfig {
    fn default() -> Self {
        Self {
            timezone: "Asia/Kolkata".to_string(),
            session_open: "09:15".to_string(),
            session_close: "15:30".to_string(),
            entry_cutoff: "15:00".to_string(),
            open_end: "09:30".to_string(),
            close_start: "15:00".to_string(),
            holidays: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub lookback_days: u32,
    pub min_samples: usize,
    pub block_ttl_minutes: u32,
    pub fee_multiple_threshold: Decimal,
    pub spread_penalty_enabled: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            lookback_days: 20,
            min_samples: 8,
            block_ttl_minutes: 60,
            fee_multiple_threshold: Decimal::ONE,
            spread_penalty_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = EngineConfig::default();
        let raw = toml::to_string(&config).unwrap();
        let parsed = EngineConfig::from_toml_str(&raw).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let parsed: EngineConfig = toml::from_str("[strategy]\nmin_confidence = 70\n").unwrap();
        assert_eq!(parsed.strategy.min_confidence, 70);
        assert_eq!(parsed.strategy.intervals_minutes, vec![1, 5]);
    }

    #[test]
    fn session_risk_scales_by_day_state_and_clamps() {
        let budget = RiskBudgetConfig {
            equity_inr: Decimal::from(1_000_000),
            per_trade_risk_pct: Decimal::new(5, 3),
            per_trade_risk_min_inr: Decimal::from(500),
            per_trade_risk_max_inr: Decimal::from(3_000),
            ..Default::default()
        };
        // 0.5% of 1,000,000 = 5,000, clamped down to the 3,000 max regardless of day state.
        assert_eq!(budget.session_risk_inr(SessionBucket::Mid), Decimal::from(3_000));
        assert_eq!(budget.session_risk_inr(SessionBucket::Open), Decimal::from(3_000));
    }
}

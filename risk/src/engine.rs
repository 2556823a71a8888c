//! [`RiskEngine`] — admission chain stage 2: kill state,
//! per-token cooldown, existing position, max open positions, max trades
//! per day, consecutive-failure cap.

use chrono::{DateTime, Utc};
use ixtrade_markets::InstrumentToken;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskDenialReason {
    KillSwitch,
    Cooldown,
    ExistingPosition,
    MaxOpenPositions,
    MaxTradesPerDay,
    ConsecutiveFailures,
}

#[derive(Debug, Clone)]
pub struct RiskEngineConfig {
    pub max_open_positions: u32,
    pub max_trades_per_day: u32,
    pub max_consecutive_failures: u32,
}

impl Default for RiskEngineConfig {
    fn default() -> Self {
        Self { max_open_positions: 3, max_trades_per_day: 12, max_consecutive_failures: 3 }
    }
}

#[derive(Debug, Default)]
struct RiskEngineState {
    kill_switch: bool,
    cooldowns: HashMap<String, DateTime<Utc>>,
    open_positions: HashMap<InstrumentToken, ()>,
    trades_today: u32,
    consecutive_failures: u32,
}

/// A risk key identifies the scope a cooldown applies to: either a bare
/// token or a `(strategy, underlying, token)` triple, scoped to the
/// rejection that set the cooldown.
#[derive(Debug, Clone)]
pub enum RiskKey {
    Token(InstrumentToken),
    StrategyUnderlyingToken { strategy_id: String, underlying: String, token: InstrumentToken },
}

impl RiskKey {
    fn as_string(&self) -> String {
        match self {
            RiskKey::Token(t) => format!("token:{}", t.0),
            RiskKey::StrategyUnderlyingToken { strategy_id, underlying, token } => {
                format!("{strategy_id}:{underlying}:{}", token.0)
            }
        }
    }
}

#[derive(Debug)]
pub struct RiskEngine {
    config: RiskEngineConfig,
    state: RwLock<RiskEngineState>,
}

impl RiskEngine {
    pub fn new(config: RiskEngineConfig) -> Self {
        Self { config, state: RwLock::new(RiskEngineState::default()) }
    }

    pub fn set_kill_switch(&self, on: bool) {
        self.state.write().kill_switch = on;
    }

    pub fn is_killed(&self) -> bool {
        self.state.read().kill_switch
    }

    /// Sets a cooldown on `key` until `now + duration`. Only one cooldown
    /// surface should fire per rejection event.
    pub fn set_cooldown(&self, key: &RiskKey, now: DateTime<Utc>, duration: chrono::Duration) {
        self.state.write().cooldowns.insert(key.as_string(), now + duration);
    }

    /// Checks whether an arbitrary [`RiskKey`] is currently cooling down.
    /// `can_trade` only inspects the bare-token cooldown surface; callers
    /// that also key cooldowns by `(strategy, underlying, token)` — e.g.
    /// after a circuit-breaker rejection — check that surface separately.
    pub fn is_cooling_down(&self, key: &RiskKey, now: DateTime<Utc>) -> bool {
        match self.state.read().cooldowns.get(&key.as_string()) {
            Some(until) => now < *until,
            None => false,
        }
    }

    pub fn record_position_opened(&self, token: InstrumentToken) {
        self.state.write().open_positions.insert(token, ());
    }

    pub fn record_position_closed(&self, token: InstrumentToken) {
        self.state.write().open_positions.remove(&token);
    }

    pub fn record_trade_opened(&self) {
        self.state.write().trades_today += 1;
    }

    pub fn record_order_failure(&self) {
        self.state.write().consecutive_failures += 1;
    }

    pub fn record_order_success(&self) {
        self.state.write().consecutive_failures = 0;
    }

    pub fn reset_daily_counters(&self) {
        let mut state = self.state.write();
        state.trades_today = 0;
    }

    pub fn can_trade(&self, token: InstrumentToken, now: DateTime<Utc>) -> Result<(), RiskDenialReason> {
        let state = self.state.read();
        if state.kill_switch {
            return Err(RiskDenialReason::KillSwitch);
        }
        if let Some(until) = state.cooldowns.get(&RiskKey::Token(token).as_string()) {
            if now < *until {
                return Err(RiskDenialReason::Cooldown);
            }
        }
        if state.open_positions.contains_key(&token) {
            return Err(RiskDenialReason::ExistingPosition);
        }
        if state.open_positions.len() as u32 >= self.config.max_open_positions {
            return Err(RiskDenialReason::MaxOpenPositions);
        }
        if state.trades_today >= self.config.max_trades_per_day {
            return Err(RiskDenialReason::MaxTradesPerDay);
        }
        if state.consecutive_failures >= self.config.max_consecutive_failures {
            return Err(RiskDenialReason::ConsecutiveFailures);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> InstrumentToken {
        InstrumentToken(1)
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn kill_switch_denies() {
        let engine = RiskEngine::new(RiskEngineConfig::default());
        engine.set_kill_switch(true);
        assert_eq!(engine.can_trade(token(), now()), Err(RiskDenialReason::KillSwitch));
    }

    #[test]
    fn existing_position_denies() {
        let engine = RiskEngine::new(RiskEngineConfig::default());
        engine.record_position_opened(token());
        assert_eq!(engine.can_trade(token(), now()), Err(RiskDenialReason::ExistingPosition));
    }

    #[test]
    fn max_trades_per_day_denies() {
        let engine = RiskEngine::new(RiskEngineConfig { max_trades_per_day: 1, ..RiskEngineConfig::default() });
        engine.record_trade_opened();
        assert_eq!(engine.can_trade(InstrumentToken(2), now()), Err(RiskDenialReason::MaxTradesPerDay));
    }

    #[test]
    fn cooldown_expires() {
        let engine = RiskEngine::new(RiskEngineConfig::default());
        engine.set_cooldown(&RiskKey::Token(token()), now(), chrono::Duration::seconds(60));
        assert_eq!(engine.can_trade(token(), now()), Err(RiskDenialReason::Cooldown));
        assert!(engine.can_trade(token(), now() + chrono::Duration::seconds(61)).is_ok());
    }
}

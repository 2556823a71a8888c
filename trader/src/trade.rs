//! [`Trade`] — the aggregate entity for one managed position, and its
//! lifecycle state machine:
//!
//! `NEW → ENTRY_PLACED → (ENTRY_OPEN ↔ ENTRY_REPLACED)* → ENTRY_FILLED →
//! LIVE → (EXITED_TARGET | EXITED_SL | EXITED_MANUAL | CLOSED)`
//!
//! with fault terminals `ENTRY_FAILED | ENTRY_CANCELLED | GUARD_FAILED`.

use crate::error::TradeError;
use chrono::{DateTime, Duration, Utc};
use ixtrade_execution::BrokerOrderId;
use ixtrade_markets::{InstrumentToken, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeState {
    New,
    EntryPlaced,
    EntryOpen,
    EntryReplaced,
    EntryFilled,
    Live,
    ExitedTarget,
    ExitedSl,
    ExitedManual,
    Closed,
    EntryFailed,
    EntryCancelled,
    GuardFailed,
}

impl TradeState {
    /// Whether `to` is a legal next state from `self`, per the lifecycle
    /// graph: linear happy path, a replace loop while the entry order is
    /// resting, and fault terminals reachable from any open-entry state.
    fn can_transition_to(self, to: TradeState) -> bool {
        use TradeState::*;
        matches!(
            (self, to),
            (New, EntryPlaced)
                | (EntryPlaced, EntryOpen)
                | (EntryPlaced, EntryFilled)
                | (EntryPlaced, EntryFailed)
                | (EntryPlaced, EntryCancelled)
                | (EntryOpen, EntryReplaced)
                | (EntryOpen, EntryFilled)
                | (EntryOpen, EntryCancelled)
                | (EntryOpen, EntryFailed)
                | (EntryReplaced, EntryOpen)
                | (EntryReplaced, EntryFilled)
                | (EntryReplaced, EntryCancelled)
                | (EntryReplaced, EntryFailed)
                | (EntryFilled, Live)
                | (Live, ExitedTarget)
                | (Live, ExitedSl)
                | (Live, ExitedManual)
                | (Live, GuardFailed)
                | (ExitedTarget, Closed)
                | (ExitedSl, Closed)
                | (ExitedManual, Closed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionMeta {
    pub option_type: OptionType,
    pub strike: Decimal,
    pub underlying_token: InstrumentToken,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: String,
    pub side: Side,
    pub strategy_id: String,
    pub underlying: String,
    pub instrument_token: InstrumentToken,
    pub state: TradeState,

    pub requested_qty: Decimal,
    pub filled_qty: Decimal,
    pub entry_price: Option<Decimal>,
    pub initial_stop_loss: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub target_price: Option<Decimal>,
    pub rr: Decimal,
    pub risk_inr: Decimal,
    pub tick_size: Decimal,

    pub peak_ltp: Option<Decimal>,
    pub peak_pnl_inr: Decimal,
    pub be_locked: bool,
    pub be_locked_at: Option<DateTime<Utc>>,
    pub trail_locked: bool,
    pub trail_locked_at: Option<DateTime<Utc>>,
    pub time_stop_triggered: bool,
    pub time_stop_triggered_at: Option<DateTime<Utc>>,
    pub profit_lock_armed_at: Option<DateTime<Utc>>,
    pub profit_lock_inr: Option<Decimal>,
    pub profit_lock_r: Option<Decimal>,

    pub underlying_ref_price_at_entry: Option<Decimal>,
    pub option: Option<OptionMeta>,

    pub entry_order_id: Option<BrokerOrderId>,
    pub stop_order_id: Option<BrokerOrderId>,
    pub target_order_id: Option<BrokerOrderId>,

    pub created_at: DateTime<Utc>,
    pub entry_placed_at: Option<DateTime<Utc>>,
    pub entry_filled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,

    pub realized_gross_pnl_inr: Option<Decimal>,
    pub realized_cost_inr: Option<Decimal>,
    pub realized_net_pnl_inr: Option<Decimal>,
}

impl Trade {
    pub fn new(
        trade_id: impl Into<String>,
        side: Side,
        strategy_id: impl Into<String>,
        underlying: impl Into<String>,
        instrument_token: InstrumentToken,
        requested_qty: Decimal,
        rr: Decimal,
        risk_inr: Decimal,
        tick_size: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            trade_id: trade_id.into(),
            side,
            strategy_id: strategy_id.into(),
            underlying: underlying.into(),
            instrument_token,
            state: TradeState::New,
            requested_qty,
            filled_qty: Decimal::ZERO,
            entry_price: None,
            initial_stop_loss: None,
            stop_loss: None,
            target_price: None,
            rr,
            risk_inr,
            tick_size,
            peak_ltp: None,
            peak_pnl_inr: Decimal::ZERO,
            be_locked: false,
            be_locked_at: None,
            trail_locked: false,
            trail_locked_at: None,
            time_stop_triggered: false,
            time_stop_triggered_at: None,
            profit_lock_armed_at: None,
            profit_lock_inr: None,
            profit_lock_r: None,
            underlying_ref_price_at_entry: None,
            option: None,
            entry_order_id: None,
            stop_order_id: None,
            target_order_id: None,
            created_at: now,
            entry_placed_at: None,
            entry_filled_at: None,
            updated_at: now,
            closed_at: None,
            realized_gross_pnl_inr: None,
            realized_cost_inr: None,
            realized_net_pnl_inr: None,
        }
    }

    pub fn is_option(&self) -> bool {
        self.option.is_some()
    }

    pub fn transition(&mut self, to: TradeState, now: DateTime<Utc>) -> Result<(), TradeError> {
        if !self.state.can_transition_to(to) {
            return Err(TradeError::InvalidTransition {
                from: format!("{:?}", self.state),
                to: format!("{to:?}"),
            });
        }
        self.state = to;
        self.updated_at = now;
        match to {
            TradeState::EntryPlaced => self.entry_placed_at = Some(now),
            TradeState::EntryFilled => self.entry_filled_at = Some(now),
            TradeState::Closed => self.closed_at = Some(now),
            _ => {}
        }
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            TradeState::Closed | TradeState::EntryFailed | TradeState::EntryCancelled
        )
    }

    /// `(entry − stop) · qty` style risk is already fixed at fill time in
    /// `risk_inr`; this converts a P&L figure in INR to multiples of R.
    pub fn pnl_in_r(&self, pnl_inr: Decimal) -> Decimal {
        if self.risk_inr.is_zero() {
            Decimal::ZERO
        } else {
            pnl_inr / self.risk_inr
        }
    }

    pub fn unrealized_pnl_inr(&self, ltp: Decimal) -> Decimal {
        let Some(entry) = self.entry_price else {
            return Decimal::ZERO;
        };
        let per_share = match self.side {
            Side::Buy => ltp - entry,
            Side::Sell => entry - ltp,
        };
        per_share * self.filled_qty
    }

    pub fn hold_duration(&self, now: DateTime<Utc>) -> Duration {
        match self.entry_filled_at {
            Some(filled_at) => now - filled_at,
            None => Duration::zero(),
        }
    }

    pub fn true_breakeven(&self, cost_per_share: Decimal, multiplier: Decimal) -> Option<Decimal> {
        let entry = self.entry_price?;
        let offset = cost_per_share * multiplier;
        Some(match self.side {
            Side::Buy => entry + offset,
            Side::Sell => entry - offset,
        })
    }

    /// Records an entry fill: sets `entry_price`/`filled_qty` and, the
    /// first time only, `initial_stop_loss`. Once set it is never
    /// overwritten — the risk distance a trade was sized against must stay
    /// fixed for its lifetime.
    pub fn record_entry_fill(
        &mut self,
        fill_price: Decimal,
        fill_qty: Decimal,
        stop_loss: Decimal,
        target_price: Option<Decimal>,
    ) {
        self.entry_price = Some(fill_price);
        self.filled_qty = fill_qty;
        if self.initial_stop_loss.is_none() {
            self.initial_stop_loss = Some(stop_loss);
            self.stop_loss = Some(stop_loss);
        }
        self.target_price = target_price;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade() -> Trade {
        Trade::new(
            "T1",
            Side::Buy,
            "STRAT-A",
            "NIFTY",
            InstrumentToken(1),
            Decimal::from(10),
            Decimal::ONE,
            Decimal::from(100),
            Decimal::new(5, 1),
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        )
    }

    #[test]
    fn happy_path_transitions_succeed() {
        let mut t = trade();
        let now = t.created_at;
        t.transition(TradeState::EntryPlaced, now).unwrap();
        t.transition(TradeState::EntryFilled, now).unwrap();
        t.transition(TradeState::Live, now).unwrap();
        t.transition(TradeState::ExitedTarget, now).unwrap();
        t.transition(TradeState::Closed, now).unwrap();
        assert_eq!(t.state, TradeState::Closed);
    }

    #[test]
    fn skipping_a_state_is_rejected() {
        let mut t = trade();
        let now = t.created_at;
        assert!(t.transition(TradeState::Live, now).is_err());
    }

    #[test]
    fn initial_stop_loss_is_set_once() {
        let mut t = trade();
        t.record_entry_fill(Decimal::from(100), Decimal::from(10), Decimal::from(90), None);
        t.record_entry_fill(Decimal::from(101), Decimal::from(10), Decimal::from(95), None);
        assert_eq!(t.initial_stop_loss, Some(Decimal::from(90)));
    }
}

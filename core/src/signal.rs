//! Turns a winning [`Signal`] into an [`EntryPlan`]: the stop-loss anchor
//! comes from the strategy's candle plus an ATR-scaled liquidity buffer and
//! a round-number guard, and the target is the RR multiple applied to that
//! risk distance.

use ixtrade_data::Candle;
use ixtrade_markets::{Instrument, Side};
use ixtrade_risk::SessionBucket;
use ixtrade_strategies::indicators::atr;
use ixtrade_strategies::Signal;
use ixtrade_trader::EntryPlan;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::config::{DynamicExitConfig, RiskBudgetConfig};

const ATR_PERIOD: usize = 14;

/// Nudges `price` away from the nearest multiple of `step` by at least
/// `step / 4`, in the direction that widens the stop (further from
/// `reference`) — a tight round number is exactly where market makers park
/// resting orders, so a stop planted right on one gets run more often than
/// one planted just past it.
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

/// Builds the sizing/anchor inputs a [`TradeManager`](ixtrade_trader::TradeManager)
/// needs from a strategy signal. Returns `None` when there isn't enough
/// trailing history to compute an ATR, since an un-buffered stop has no
/// grounding in recent volatility.
pub fn build_entry_plan(
    signal: &Signal,
    candles: &[Candle],
    instrument: &Instrument,
    bucket: SessionBucket,
    risk_budget: &RiskBudgetConfig,
    exit_config: &DynamicExitConfig,
    fee_per_lot: Decimal,
) -> Option<EntryPlan> {
    let entry_price = signal.candle.close;
    let atr_value = atr(candles, ATR_PERIOD)?;
    let atr_decimal = Decimal::from_f64(atr_value).unwrap_or(Decimal::ZERO);

    let buffer_from_atr = atr_decimal * exit_config.liquidity_buffer_atr_pct;
    let buffer_from_ticks = instrument.tick_size * Decimal::from(exit_config.liquidity_buffer_ticks);
    let buffer = buffer_from_atr.max(buffer_from_ticks);
    if buffer.is_zero() {
        return None;
    }

    let raw_stop = match signal.side {
        Side::Buy => entry_price - buffer,
        Side::Sell => entry_price + buffer,
    };
    let stop_loss = avoid_round_level(raw_stop, entry_price, exit_config.round_level_avoid_step);
    let risk_per_share = (entry_price - stop_loss).abs();
    if risk_per_share.is_zero() {
        return None;
    }

    let target_price = match signal.side {
        Side::Buy => entry_price + risk_per_share * risk_budget.target_rr_multiple,
        Side::Sell => entry_price - risk_per_share * risk_budget.target_rr_multiple,
    };

    Some(EntryPlan {
        side: signal.side,
        entry_price,
        stop_loss,
        target_price: Some(target_price),
        tick_size: instrument.tick_size,
        session_risk_inr: risk_budget.session_risk_inr(bucket),
        fee_per_lot,
        lot_size: Decimal::from(instrument.lot_size),
        confidence_mult: Decimal::ONE,
        qty_mult: Decimal::ONE,
    })
}

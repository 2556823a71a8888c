use crate::indicators::{closes, ema_last, scale_confidence, average_volume};
use crate::registry::Strategy;
use crate::signal::{Regime, Signal, Style};
use ixtrade_data::Candle;
use ixtrade_markets::Side;
use rust_decimal::prelude::ToPrimitive;

/// Trend continuation: price pulls back to the trend EMA and the latest
/// candle reclaims it in the prevailing direction.
pub struct EmaPullbackReclaim {
    pub trend_ema: usize,
    pub lookback: usize,
    pub volume_lookback: usize,
}

impl Default for EmaPullbackReclaim {
    fn default() -> Self {
        Self { trend_ema: 20, lookback: 5, volume_lookback: 20 }
    }
}

impl Strategy for EmaPullbackReclaim {
    fn id(&self) -> &str {
        "ema_pullback_reclaim"
    }

    fn style(&self) -> Style {
        Style::Trend
    }

    fn min_candles(&self) -> usize {
        self.trend_ema + self.lookback + 1
    }

    fn evaluate(&self, candles: &[Candle], regime: Regime) -> Option<Signal> {
        let values = closes(candles);
        let ema_now = ema_last(&values, self.trend_ema)?;
        let ema_prev = ema_last(&values[..values.len() - self.lookback], self.trend_ema)?;
        let trend_up = ema_now > ema_prev;

        let last = candles.last().unwrap();
        let last_close = last.close.to_f64().unwrap_or(0.0);
        let last_low = last.low.to_f64().unwrap_or(0.0);
        let last_high = last.high.to_f64().unwrap_or(0.0);

        let touched_ema = if trend_up {
            last_low <= ema_now
        } else {
            last_high >= ema_now
        };
        if !touched_ema {
            return None;
        }

        let reclaimed = if trend_up {
            last_close > ema_now
        } else {
            last_close < ema_now
        };
        if !reclaimed {
            return None;
        }

        let side = if trend_up { Side::Buy } else { Side::Sell };
        let magnitude_bps = ((last_close - ema_now).abs() / ema_now.abs().max(f64::EPSILON)) * 10_000.0;
        let vol_avg = average_volume(candles, self.volume_lookback).unwrap_or(0.0);
        let rel_volume = if vol_avg > 0.0 { last.volume as f64 / vol_avg } else { 0.0 };

        Some(Signal {
            strategy_id: self.id().to_string(),
            style: self.style(),
            side,
            confidence: scale_confidence(magnitude_bps, true, rel_volume),
            reason: format!("pullback to ema{} reclaimed {:?}", self.trend_ema, side),
            candle: last.clone(),
            regime,
            produced_at: chrono::Utc::now(),
        })
    }
}

use crate::indicators::{closes, ema_last, scale_confidence, average_volume};
use crate::registry::Strategy;
use crate::signal::{Regime, Signal, Style};
use ixtrade_data::Candle;
use ixtrade_markets::Side;

/// Fires when the fast EMA crosses the slow EMA, confirmed by above-average
/// volume on the crossing candle.
pub struct EmaCross {
    pub fast: usize,
    pub slow: usize,
    pub volume_lookback: usize,
}

impl Default for EmaCross {
    fn default() -> Self {
        Self { fast: 9, slow: 21, volume_lookback: 20 }
    }
}

impl Strategy for EmaCross {
    fn id(&self) -> &str {
        "ema_cross"
    }

    fn style(&self) -> Style {
        Style::Trend
    }

    fn min_candles(&self) -> usize {
        self.slow + 2
    }

    fn evaluate(&self, candles: &[Candle], regime: Regime) -> Option<Signal> {
        let values = closes(candles);
        let fast_now = ema_last(&values, self.fast)?;
        let slow_now = ema_last(&values, self.slow)?;
        let prev = &values[..values.len() - 1];
        let fast_prev = ema_last(prev, self.fast)?;
        let slow_prev = ema_last(prev, self.slow)?;

        let crossed_up = fast_prev <= slow_prev && fast_now > slow_now;
        let crossed_down = fast_prev >= slow_prev && fast_now < slow_now;
        if !crossed_up && !crossed_down {
            return None;
        }

        let side = if crossed_up { Side::Buy } else { Side::Sell };
        let magnitude_bps = ((fast_now - slow_now).abs() / slow_now.abs().max(f64::EPSILON)) * 10_000.0;
        let vol_avg = average_volume(candles, self.volume_lookback).unwrap_or(0.0);
        let rel_volume = if vol_avg > 0.0 {
            candles.last().unwrap().volume as f64 / vol_avg
        } else {
            0.0
        };

        Some(Signal {
            strategy_id: self.id().to_string(),
            style: self.style(),
            side,
            confidence: scale_confidence(magnitude_bps, true, rel_volume),
            reason: format!("ema{}/{} cross {:?}", self.fast, self.slow, side),
            candle: candles.last().cloned().unwrap(),
            regime,
            produced_at: chrono::Utc::now(),
        })
    }
}

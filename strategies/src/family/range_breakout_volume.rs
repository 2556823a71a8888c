use crate::indicators::{average_volume, scale_confidence};
use crate::registry::Strategy;
use crate::signal::{Regime, Signal, Style};
use ixtrade_data::Candle;
use ixtrade_markets::Side;
use rust_decimal::prelude::ToPrimitive;

/// Breaks the trailing range high/low on a close, confirmed by volume
/// above the trailing average.
pub struct RangeBreakoutVolume {
    pub range_lookback: usize,
    pub volume_lookback: usize,
    pub min_rel_volume: f64,
}

impl Default for RangeBreakoutVolume {
    fn default() -> Self {
        Self { range_lookback: 20, volume_lookback: 20, min_rel_volume: 1.5 }
    }
}

impl Strategy for RangeBreakoutVolume {
    fn id(&self) -> &str {
        "range_breakout_volume"
    }

    fn style(&self) -> Style {
        Style::Range
    }

    fn min_candles(&self) -> usize {
        self.range_lookback.max(self.volume_lookback) + 1
    }

    fn evaluate(&self, candles: &[Candle], regime: Regime) -> Option<Signal> {
        let last = candles.last().unwrap();
        let window = &candles[candles.len() - 1 - self.range_lookback..candles.len() - 1];
        let range_high = window
            .iter()
            .map(|c| c.high.to_f64().unwrap_or(0.0))
            .fold(f64::MIN, f64::max);
        let range_low = window
            .iter()
            .map(|c| c.low.to_f64().unwrap_or(0.0))
            .fold(f64::MAX, f64::min);

        let close = last.close.to_f64().unwrap_or(0.0);
        let vol_avg = average_volume(&candles[..candles.len() - 1], self.volume_lookback).unwrap_or(0.0);
        let rel_volume = if vol_avg > 0.0 { last.volume as f64 / vol_avg } else { 0.0 };
        if rel_volume < self.min_rel_volume {
            return None;
        }

        let (side, edge) = if close > range_high {
            (Side::Buy, close - range_high)
        } else if close < range_low {
            (Side::Sell, range_low - close)
        } else {
            return None;
        };

        let magnitude_bps = edge / close.abs().max(f64::EPSILON) * 10_000.0;

        Some(Signal {
            strategy_id: self.id().to_string(),
            style: self.style(),
            side,
            confidence: scale_confidence(magnitude_bps, true, rel_volume),
            reason: format!("range breakout {:?} vol {:.1}x", side, rel_volume),
            candle: last.clone(),
            regime,
            produced_at: chrono::Utc::now(),
        })
    }
}

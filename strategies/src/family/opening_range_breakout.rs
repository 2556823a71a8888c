use crate::indicators::{average_volume, scale_confidence};
use crate::registry::Strategy;
use crate::signal::{Regime, Signal, Style};
use ixtrade_data::Candle;
use ixtrade_markets::Side;
use rust_decimal::prelude::ToPrimitive;

/// Breaks the high/low established during the opening-range candles
/// (the candles the [`crate::selector::Selector`] tags [`Regime::Open`]).
pub struct OpeningRangeBreakout {
    pub opening_range_candles: usize,
    pub volume_lookback: usize,
}

impl Default for OpeningRangeBreakout {
    fn default() -> Self {
        Self { opening_range_candles: 3, volume_lookback: 20 }
    }
}

impl Strategy for OpeningRangeBreakout {
    fn id(&self) -> &str {
        "opening_range_breakout"
    }

    fn style(&self) -> Style {
        Style::Open
    }

    fn min_candles(&self) -> usize {
        self.opening_range_candles + 1
    }

    fn evaluate(&self, candles: &[Candle], regime: Regime) -> Option<Signal> {
        if candles.len() <= self.opening_range_candles {
            return None;
        }
        let opening = &candles[..self.opening_range_candles];
        let range_high = opening.iter().map(|c| c.high.to_f64().unwrap_or(0.0)).fold(f64::MIN, f64::max);
        let range_low = opening.iter().map(|c| c.low.to_f64().unwrap_or(0.0)).fold(f64::MAX, f64::min);

        let last = candles.last().unwrap();
        let close = last.close.to_f64().unwrap_or(0.0);

        let (side, edge) = if close > range_high {
            (Side::Buy, close - range_high)
        } else if close < range_low {
            (Side::Sell, range_low - close)
        } else {
            return None;
        };

        let magnitude_bps = edge / close.abs().max(f64::EPSILON) * 10_000.0;
        let vol_avg = average_volume(candles, self.volume_lookback).unwrap_or(0.0);
        let rel_volume = if vol_avg > 0.0 { last.volume as f64 / vol_avg } else { 0.0 };

        Some(Signal {
            strategy_id: self.id().to_string(),
            style: self.style(),
            side,
            confidence: scale_confidence(magnitude_bps, true, rel_volume),
            reason: format!("opening range breakout {:?}", side),
            candle: last.clone(),
            regime,
            produced_at: chrono::Utc::now(),
        })
    }
}

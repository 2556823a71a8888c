use crate::indicators::scale_confidence;
use crate::registry::Strategy;
use crate::signal::{Regime, Signal, Style};
use ixtrade_data::Candle;
use ixtrade_markets::Side;
use rust_decimal::prelude::ToPrimitive;

/// A breakout beyond the trailing range that immediately reverses back
/// inside it within the same candle — trades the reversal, not the break.
pub struct FakeoutFade {
    pub range_lookback: usize,
    pub min_penetration_bps: f64,
}

impl Default for FakeoutFade {
    fn default() -> Self {
        Self { range_lookback: 20, min_penetration_bps: 5.0 }
    }
}

impl Strategy for FakeoutFade {
    fn id(&self) -> &str {
        "fakeout_fade"
    }

    fn style(&self) -> Style {
        Style::Range
    }

    fn min_candles(&self) -> usize {
        self.range_lookback + 1
    }

    fn evaluate(&self, candles: &[Candle], regime: Regime) -> Option<Signal> {
        let last = candles.last().unwrap();
        let window = &candles[candles.len() - 1 - self.range_lookback..candles.len() - 1];
        let range_high = window.iter().map(|c| c.high.to_f64().unwrap_or(0.0)).fold(f64::MIN, f64::max);
        let range_low = window.iter().map(|c| c.low.to_f64().unwrap_or(0.0)).fold(f64::MAX, f64::min);

        let high = last.high.to_f64().unwrap_or(0.0);
        let low = last.low.to_f64().unwrap_or(0.0);
        let close = last.close.to_f64().unwrap_or(0.0);

        let (side, penetration) = if high > range_high && close < range_high {
            (Side::Sell, high - range_high)
        } else if low < range_low && close > range_low {
            (Side::Buy, range_low - low)
        } else {
            return None;
        };

        let magnitude_bps = penetration / close.abs().max(f64::EPSILON) * 10_000.0;
        if magnitude_bps < self.min_penetration_bps {
            return None;
        }

        Some(Signal {
            strategy_id: self.id().to_string(),
            style: self.style(),
            side,
            confidence: scale_confidence(magnitude_bps, true, 1.0),
            reason: format!("fakeout fade {:?}", side),
            candle: last.clone(),
            regime,
            produced_at: chrono::Utc::now(),
        })
    }
}

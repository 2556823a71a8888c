use crate::indicators::{average_volume, scale_confidence};
use crate::registry::Strategy;
use crate::signal::{Regime, Signal, Style};
use ixtrade_data::Candle;
use ixtrade_markets::Side;
use rust_decimal::prelude::ToPrimitive;

/// A long rejection wick against the recent direction, confirmed by
/// above-average volume on the wick candle.
pub struct WickReversal {
    pub min_wick_to_range: f64,
    pub volume_lookback: usize,
}

impl Default for WickReversal {
    fn default() -> Self {
        Self { min_wick_to_range: 0.6, volume_lookback: 20 }
    }
}

impl Strategy for WickReversal {
    fn id(&self) -> &str {
        "wick_reversal"
    }

    fn style(&self) -> Style {
        Style::Range
    }

    fn min_candles(&self) -> usize {
        self.volume_lookback + 1
    }

    fn evaluate(&self, candles: &[Candle], regime: Regime) -> Option<Signal> {
        let last = candles.last().unwrap();
        let open = last.open.to_f64().unwrap_or(0.0);
        let close = last.close.to_f64().unwrap_or(0.0);
        let high = last.high.to_f64().unwrap_or(0.0);
        let low = last.low.to_f64().unwrap_or(0.0);
        let range = (high - low).max(f64::EPSILON);

        let upper_wick = high - open.max(close);
        let lower_wick = open.min(close) - low;

        let side = if lower_wick / range >= self.min_wick_to_range {
            Side::Buy
        } else if upper_wick / range >= self.min_wick_to_range {
            Side::Sell
        } else {
            return None;
        };

        let vol_avg = average_volume(&candles[..candles.len() - 1], self.volume_lookback).unwrap_or(0.0);
        let rel_volume = if vol_avg > 0.0 { last.volume as f64 / vol_avg } else { 0.0 };
        if rel_volume < 1.0 {
            return None;
        }

        let wick_ratio = if side == Side::Buy { lower_wick / range } else { upper_wick / range };

        Some(Signal {
            strategy_id: self.id().to_string(),
            style: self.style(),
            side,
            confidence: scale_confidence(wick_ratio * 100.0, true, rel_volume),
            reason: format!("wick reversal {:?} ratio {:.2}", side, wick_ratio),
            candle: last.clone(),
            regime,
            produced_at: chrono::Utc::now(),
        })
    }
}

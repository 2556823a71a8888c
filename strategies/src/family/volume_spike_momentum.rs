use crate::indicators::{average_volume, scale_confidence};
use crate::registry::Strategy;
use crate::signal::{Regime, Signal, Style};
use ixtrade_data::Candle;
use ixtrade_markets::Side;
use rust_decimal::prelude::ToPrimitive;

/// Momentum burst: a volume spike well above the trailing average,
/// confirmed by a same-direction strong-bodied candle.
pub struct VolumeSpikeMomentum {
    pub volume_lookback: usize,
    pub spike_multiple: f64,
    pub min_body_ratio: f64,
}

impl Default for VolumeSpikeMomentum {
    fn default() -> Self {
        Self { volume_lookback: 20, spike_multiple: 2.5, min_body_ratio: 0.6 }
    }
}

impl Strategy for VolumeSpikeMomentum {
    fn id(&self) -> &str {
        "volume_spike_momentum"
    }

    fn style(&self) -> Style {
        Style::Trend
    }

    fn min_candles(&self) -> usize {
        self.volume_lookback + 1
    }

    fn evaluate(&self, candles: &[Candle], regime: Regime) -> Option<Signal> {
        let last = candles.last().unwrap();
        let vol_avg = average_volume(&candles[..candles.len() - 1], self.volume_lookback)?;
        if vol_avg <= 0.0 {
            return None;
        }
        let rel_volume = last.volume as f64 / vol_avg;
        if rel_volume < self.spike_multiple {
            return None;
        }

        let open = last.open.to_f64().unwrap_or(0.0);
        let close = last.close.to_f64().unwrap_or(0.0);
        let high = last.high.to_f64().unwrap_or(0.0);
        let low = last.low.to_f64().unwrap_or(0.0);
        let range = (high - low).max(f64::EPSILON);
        let body_ratio = (close - open).abs() / range;
        if body_ratio < self.min_body_ratio {
            return None;
        }

        let side = if close > open { Side::Buy } else { Side::Sell };
        let magnitude_bps = (close - open).abs() / open.abs().max(f64::EPSILON) * 10_000.0;

        Some(Signal {
            strategy_id: self.id().to_string(),
            style: self.style(),
            side,
            confidence: scale_confidence(magnitude_bps, true, rel_volume),
            reason: format!("volume spike {:.1}x avg, body {:.0}%", rel_volume, body_ratio * 100.0),
            candle: last.clone(),
            regime,
            produced_at: chrono::Utc::now(),
        })
    }
}

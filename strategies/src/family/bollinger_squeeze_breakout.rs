use crate::indicators::{average_volume, closes, scale_confidence, sma, stdev};
use crate::registry::Strategy;
use crate::signal::{Regime, Signal, Style};
use ixtrade_data::Candle;
use ixtrade_markets::Side;
use rust_decimal::prelude::ToPrimitive;

/// Band-width contraction followed by an expansion breakout through the
/// upper/lower band.
pub struct BollingerSqueezeBreakout {
    pub period: usize,
    pub k: f64,
    pub squeeze_lookback: usize,
    pub volume_lookback: usize,
}

impl Default for BollingerSqueezeBreakout {
    fn default() -> Self {
        Self { period: 20, k: 2.0, squeeze_lookback: 10, volume_lookback: 20 }
    }
}

impl Strategy for BollingerSqueezeBreakout {
    fn id(&self) -> &str {
        "bollinger_squeeze_breakout"
    }

    fn style(&self) -> Style {
        Style::Range
    }

    fn min_candles(&self) -> usize {
        self.period + self.squeeze_lookback + 1
    }

    fn evaluate(&self, candles: &[Candle], regime: Regime) -> Option<Signal> {
        let values = closes(candles);
        let mean = sma(&values, self.period)?;
        let sd = stdev(&values, self.period)?;
        let upper = mean + self.k * sd;
        let lower = mean - self.k * sd;
        let width_now = upper - lower;

        let prior_values = &values[..values.len() - self.squeeze_lookback];
        let prior_mean = sma(prior_values, self.period)?;
        let prior_sd = stdev(prior_values, self.period)?;
        let width_prior = 2.0 * self.k * prior_sd;
        let _ = prior_mean;

        if width_prior <= 0.0 || width_now <= width_prior {
            return None;
        }

        let last = candles.last().unwrap();
        let close = last.close.to_f64().unwrap_or(0.0);
        let side = if close > upper {
            Side::Buy
        } else if close < lower {
            Side::Sell
        } else {
            return None;
        };

        let magnitude_bps = (width_now - width_prior) / width_prior.max(f64::EPSILON) * 10_000.0 / 100.0;
        let vol_avg = average_volume(candles, self.volume_lookback).unwrap_or(0.0);
        let rel_volume = if vol_avg > 0.0 { last.volume as f64 / vol_avg } else { 0.0 };

        Some(Signal {
            strategy_id: self.id().to_string(),
            style: self.style(),
            side,
            confidence: scale_confidence(magnitude_bps, true, rel_volume),
            reason: format!("bollinger squeeze release {:?}", side),
            candle: last.clone(),
            regime,
            produced_at: chrono::Utc::now(),
        })
    }
}

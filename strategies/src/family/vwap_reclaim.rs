use crate::indicators::{scale_confidence, vwap};
use crate::registry::Strategy;
use crate::signal::{Regime, Signal, Style};
use ixtrade_data::Candle;
use ixtrade_markets::Side;
use rust_decimal::prelude::ToPrimitive;

/// Mean-reversion back toward session VWAP: price dipped below (or spiked
/// above) VWAP and the latest candle closes back on the VWAP side it came
/// from.
pub struct VwapReclaim {
    pub min_deviation_bps: f64,
}

impl Default for VwapReclaim {
    fn default() -> Self {
        Self { min_deviation_bps: 10.0 }
    }
}

impl Strategy for VwapReclaim {
    fn id(&self) -> &str {
        "vwap_reclaim"
    }

    fn style(&self) -> Style {
        Style::Range
    }

    fn min_candles(&self) -> usize {
        3
    }

    fn evaluate(&self, candles: &[Candle], regime: Regime) -> Option<Signal> {
        let vwap_now = vwap(candles)?;
        let last = candles.last().unwrap();
        let prev = &candles[candles.len() - 2];

        let prev_close = prev.close.to_f64().unwrap_or(0.0);
        let close = last.close.to_f64().unwrap_or(0.0);
        let low = last.low.to_f64().unwrap_or(0.0);
        let high = last.high.to_f64().unwrap_or(0.0);

        let side = if prev_close < vwap_now && low < vwap_now && close > vwap_now {
            Side::Buy
        } else if prev_close > vwap_now && high > vwap_now && close < vwap_now {
            Side::Sell
        } else {
            return None;
        };

        let deviation_bps = (close - vwap_now).abs() / vwap_now.abs().max(f64::EPSILON) * 10_000.0;
        if deviation_bps < self.min_deviation_bps {
            return None;
        }

        Some(Signal {
            strategy_id: self.id().to_string(),
            style: self.style(),
            side,
            confidence: scale_confidence(deviation_bps, true, 1.0),
            reason: format!("vwap reclaim {:?}", side),
            candle: last.clone(),
            regime,
            produced_at: chrono::Utc::now(),
        })
    }
}

use crate::indicators::{closes, rsi, scale_confidence, vwap};
use crate::registry::Strategy;
use crate::signal::{Regime, Signal, Style};
use ixtrade_data::Candle;
use ixtrade_markets::Side;
use rust_decimal::prelude::ToPrimitive;

/// Fades RSI extremes, but only when price sits on the VWAP side that
/// agrees with the fade direction (avoids fading a strong trend day).
pub struct RsiFadeVwapFilter {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for RsiFadeVwapFilter {
    fn default() -> Self {
        Self { period: 14, overbought: 70.0, oversold: 30.0 }
    }
}

impl Strategy for RsiFadeVwapFilter {
    fn id(&self) -> &str {
        "rsi_fade_vwap_filter"
    }

    fn style(&self) -> Style {
        Style::Range
    }

    fn min_candles(&self) -> usize {
        self.period + 2
    }

    fn evaluate(&self, candles: &[Candle], regime: Regime) -> Option<Signal> {
        let values = closes(candles);
        let rsi_now = rsi(&values, self.period)?;
        let vwap_now = vwap(candles)?;
        let last = candles.last().unwrap();
        let close = last.close.to_f64().unwrap_or(0.0);

        let side = if rsi_now >= self.overbought && close > vwap_now {
            Side::Sell
        } else if rsi_now <= self.oversold && close < vwap_now {
            Side::Buy
        } else {
            return None;
        };

        let extreme_distance = (rsi_now - 50.0).abs();

        Some(Signal {
            strategy_id: self.id().to_string(),
            style: self.style(),
            side,
            confidence: scale_confidence(extreme_distance * 2.0, true, 1.0),
            reason: format!("rsi {:.0} fade {:?} above/below vwap", rsi_now, side),
            candle: last.clone(),
            regime,
            produced_at: chrono::Utc::now(),
        })
    }
}

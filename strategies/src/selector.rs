//! [`Selector`] — the regime classifier. Narrows the
//! active strategy set to the union of `ALWAYS` strategies with the
//! strategies declared for the detected regime.

use crate::indicators::{atr, closes, ema_last, stdev};
use crate::signal::{Regime, Style};
use ixtrade_data::Candle;

#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Minutes after session open during which the regime is forced OPEN.
    pub open_window_minutes: i64,
    /// EMA period for the trend-slope check.
    pub trend_ema_period: usize,
    /// Lookback for the Bollinger-style band-width check.
    pub band_period: usize,
    /// ATR period used to normalize band width.
    pub atr_period: usize,
    /// Band-width ÷ ATR below this value reads as RANGE; at or above reads
    /// as TREND.
    pub range_band_atr_ratio: f64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            open_window_minutes: 15,
            trend_ema_period: 20,
            band_period: 20,
            atr_period: 14,
            range_band_atr_ratio: 2.0,
        }
    }
}

/// Strategies tagged `ALWAYS` run in every regime. The selector itself
/// only ever classifies OPEN/TREND/RANGE; `ALWAYS` union happens in
/// [`Selector::active_styles`].
#[derive(Debug)]
pub struct Selector {
    config: SelectorConfig,
    always: Vec<Style>,
}

impl Selector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config, always: Vec::new() }
    }

    /// Registers a style that should always be active regardless of the
    /// detected regime.
    pub fn with_always(mut self, style: Style) -> Self {
        self.always.push(style);
        self
    }

    /// Classifies the current regime from the trailing candle window and
    /// minutes elapsed since session open.
    pub fn classify(&self, candles: &[Candle], minutes_since_open: i64) -> Regime {
        if minutes_since_open >= 0 && minutes_since_open < self.config.open_window_minutes {
            return Regime::Open;
        }

        let closes = closes(candles);
        let band_width = stdev(&closes, self.config.band_period).unwrap_or(0.0) * 2.0;
        let atr_value = atr(candles, self.config.atr_period).unwrap_or(0.0);

        if atr_value <= 0.0 {
            return Regime::Range;
        }

        let ratio = band_width / atr_value;
        if ratio >= self.config.range_band_atr_ratio {
            Regime::Trend
        } else {
            self.confirm_with_slope(&closes).unwrap_or(Regime::Range)
        }
    }

    /// When the band/ATR ratio is inconclusive, fall back to EMA slope
    /// direction: a strongly-sloped EMA still reads as TREND even inside a
    /// narrow band.
    fn confirm_with_slope(&self, closes: &[f64]) -> Option<Regime> {
        let period = self.config.trend_ema_period;
        if closes.len() < period + 2 {
            return None;
        }
        let ema_now = ema_last(closes, period)?;
        let ema_prev = ema_last(&closes[..closes.len() - 1], period)?;
        let slope_bps = if ema_prev.abs() > f64::EPSILON {
            (ema_now - ema_prev) / ema_prev * 10_000.0
        } else {
            0.0
        };
        if slope_bps.abs() >= 5.0 {
            Some(Regime::Trend)
        } else {
            Some(Regime::Range)
        }
    }

    /// Active styles for the given regime: the regime's own style plus
    /// every style registered via [`Selector::with_always`].
    pub fn active_styles(&self, regime: Regime) -> Vec<Style> {
        let mut styles = vec![Style::from(regime)];
        for style in &self.always {
            if !styles.contains(style) {
                styles.push(*style);
            }
        }
        styles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use ixtrade_data::CandleSource;
    use ixtrade_markets::InstrumentToken;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn candle(i: i64, close: Decimal) -> Candle {
        Candle::new(
            InstrumentToken(1),
            1,
            DateTime::from_timestamp(i * 60, 0).unwrap(),
            close,
            close + dec!(1),
            close - dec!(1),
            close,
            100,
            CandleSource::Live,
        )
        .unwrap()
    }

    #[test]
    fn within_open_window_is_open_regime() {
        let selector = Selector::new(SelectorConfig::default());
        let candles = vec![candle(0, dec!(100))];
        assert_eq!(selector.classify(&candles, 5), Regime::Open);
    }

    #[test]
    fn flat_tight_range_classifies_as_range() {
        let selector = Selector::new(SelectorConfig::default());
        let candles: Vec<_> = (0..30).map(|i| candle(i, dec!(100))).collect();
        assert_eq!(selector.classify(&candles, 60), Regime::Range);
    }

    #[test]
    fn active_styles_unions_always_with_regime() {
        let selector = Selector::new(SelectorConfig::default()).with_always(Style::Open);
        let styles = selector.active_styles(Regime::Trend);
        assert!(styles.contains(&Style::Trend));
        assert!(styles.contains(&Style::Open));
    }
}

//! Small technical-indicator helpers shared by the strategy family. Pure
//! functions over `&[Candle]`; callers never
//! mutate the candle slice they're given.

use ixtrade_data::Candle;
use rust_decimal::prelude::ToPrimitive;

fn close_f64(candle: &Candle) -> f64 {
    candle.close.to_f64().unwrap_or(0.0)
}

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(close_f64).collect()
}

pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if values.len() < period || period == 0 {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

pub fn stdev(values: &[f64], period: usize) -> Option<f64> {
    let mean = sma(values, period)?;
    let window = &values[values.len() - period..];
    let variance =
        window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
    Some(variance.sqrt())
}

/// Exponential moving average series (same length as `values`, smoothed
/// from the first element). Callers generally read only the last value.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() || period == 0 {
        return Vec::new();
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    out.push(values[0]);
    for &v in &values[1..] {
        let prev = *out.last().unwrap();
        out.push(alpha * v + (1.0 - alpha) * prev);
    }
    out
}

pub fn ema_last(values: &[f64], period: usize) -> Option<f64> {
    ema_series(values, period).last().copied()
}

/// Average True Range over the trailing `period` candles.
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    if candles.len() < period + 1 {
        return None;
    }
    let trs: Vec<f64> = candles
        .windows(2)
        .map(|w| {
            let prev_close = close_f64(&w[0]);
            let high = w[1].high.to_f64().unwrap_or(0.0);
            let low = w[1].low.to_f64().unwrap_or(0.0);
            (high - low)
                .max((high - prev_close).abs())
                .max((low - prev_close).abs())
        })
        .collect();
    sma(&trs, period)
}

/// Wilder's RSI over the trailing `period` candles.
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if values.len() < period + 1 {
        return None;
    }
    let window = &values[values.len() - period - 1..];
    let mut gains = 0.0;
    let mut losses = 0.0;
    for pair in window.windows(2) {
        let delta = pair[1] - pair[0];
        if delta >= 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }
    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}

/// Session-cumulative volume-weighted average price over the whole slice
/// given (callers pass the candles since session open).
pub fn vwap(candles: &[Candle]) -> Option<f64> {
    if candles.is_empty() {
        return None;
    }
    let mut pv = 0.0;
    let mut vol = 0.0;
    for c in candles {
        let typical = (c.high.to_f64().unwrap_or(0.0)
            + c.low.to_f64().unwrap_or(0.0)
            + close_f64(c))
            / 3.0;
        pv += typical * c.volume as f64;
        vol += c.volume as f64;
    }
    if vol == 0.0 {
        None
    } else {
        Some(pv / vol)
    }
}

pub fn average_volume(candles: &[Candle], period: usize) -> Option<f64> {
    if candles.len() < period || period == 0 {
        return None;
    }
    let window = &candles[candles.len() - period..];
    Some(window.iter().map(|c| c.volume as f64).sum::<f64>() / period as f64)
}

/// Combines magnitude-of-edge, slope alignment, and relative volume into a
/// calibrated 0-100 confidence score. `magnitude_bps` and
/// `rel_volume` are expected non-negative; `slope_aligned` rewards signals
/// that agree with the prevailing trend direction.
pub fn scale_confidence(magnitude_bps: f64, slope_aligned: bool, rel_volume: f64) -> u8 {
    let magnitude_score = (magnitude_bps / 2.0).min(50.0).max(0.0);
    let slope_score = if slope_aligned { 30.0 } else { 0.0 };
    let volume_score = (rel_volume.min(3.0) * 20.0 / 3.0).max(0.0);
    (magnitude_score + slope_score + volume_score).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_requires_full_period() {
        assert_eq!(sma(&[1.0, 2.0], 3), None);
        assert_eq!(sma(&[1.0, 2.0, 3.0], 3), Some(2.0));
    }

    #[test]
    fn rsi_is_100_when_no_losses() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(rsi(&values, 5), Some(100.0));
    }

    #[test]
    fn rsi_is_0_when_no_gains() {
        let values = vec![6.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        assert_eq!(rsi(&values, 5), Some(0.0));
    }
}

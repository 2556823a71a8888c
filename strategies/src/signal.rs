//! The [`Signal`] type and the regime taxonomy strategies and the
//! [`Selector`](crate::selector::Selector) share.

use chrono::{DateTime, Utc};
use ixtrade_data::Candle;
use ixtrade_markets::Side;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Style {
    Trend,
    Range,
    Open,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Regime {
    Open,
    Trend,
    Range,
}

impl From<Regime> for Style {
    fn from(regime: Regime) -> Self {
        match regime {
            Regime::Open => Style::Open,
            Regime::Trend => Style::Trend,
            Regime::Range => Style::Range,
        }
    }
}

/// A candidate or winning signal produced by a strategy evaluation.
#[derive(Debug, Clone)]
pub struct Signal {
    pub strategy_id: String,
    pub style: Style,
    pub side: Side,
    /// Calibrated 0-100.
    pub confidence: u8,
    pub reason: String,
    pub candle: Candle,
    pub regime: Regime,
    pub produced_at: DateTime<Utc>,
}

impl Signal {
    pub fn clamp_confidence(mut self) -> Self {
        self.confidence = self.confidence.min(100);
        self
    }
}

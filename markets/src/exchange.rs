//! Exchange and segment identifiers.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Venue an [`Instrument`](crate::Instrument) trades on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum ExchangeId {
    Nse,
    Bse,
    Nfo,
    Bfo,
    /// In-memory venue used by the mock broker adapter and the backtest harness.
    Simulated,
}

impl ExchangeId {
    pub fn is_derivatives(&self) -> bool {
        matches!(self, ExchangeId::Nfo | ExchangeId::Bfo)
    }
}

impl Display for ExchangeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeId::Nse => write!(f, "NSE"),
            ExchangeId::Bse => write!(f, "BSE"),
            ExchangeId::Nfo => write!(f, "NFO"),
            ExchangeId::Bfo => write!(f, "BFO"),
            ExchangeId::Simulated => write!(f, "SIM"),
        }
    }
}

/// Minimal exchange descriptor; kept distinct from [`ExchangeId`] so a future
/// multi-exchange routing layer can attach per-exchange metadata (segment
/// calendars, settlement cycle) without widening the identifier enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: ExchangeId,
    pub timezone: &'static str,
}

impl Exchange {
    pub const fn new(id: ExchangeId) -> Self {
        Self {
            id,
            timezone: "Asia/Kolkata",
        }
    }
}

//! Raw broker tick and the events the ingestor emits from it.

use crate::candle::Candle;
use chrono::{DateTime, Utc};
use ixtrade_markets::instrument::InstrumentToken;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Depth {
    pub best_bid: Decimal,
    pub best_ask: Decimal,
}

/// A single broker tick. `exchange_timestamp` and `volume_delta`/`depth` are
/// optional because cheaper subscription modes (LTP-only) omit them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub instrument_token: InstrumentToken,
    pub last_price: Decimal,
    pub exchange_timestamp: Option<DateTime<Utc>>,
    pub volume_delta: Option<u64>,
    pub depth: Option<Depth>,
}

impl Tick {
    pub fn new(instrument_token: InstrumentToken, last_price: Decimal) -> Self {
        Self {
            instrument_token,
            last_price,
            exchange_timestamp: None,
            volume_delta: None,
            depth: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TickBatch {
    pub received_at: DateTime<Utc>,
    pub ticks: Vec<Tick>,
}

/// Events published by the ingestor as it drains the tick queue.
#[derive(Debug, Clone)]
pub enum IngestEvent {
    /// LTP cache updated for `token`.
    Tick {
        token: InstrumentToken,
        last_price: Decimal,
    },
    /// A live candle bucket closed and was finalized; a new live candle for
    /// the next bucket has already started.
    CandleClose { candle: Candle },
}

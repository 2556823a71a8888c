//! Errors produced by the ingestion and candle-storage pipeline.

use ixtrade_markets::instrument::InstrumentToken;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("non-monotonic candle timestamp for token {token}: new={new} <= last={last}")]
    NonMonotonicCandle {
        token: InstrumentToken,
        new: i64,
        last: i64,
    },

    #[error("candle OHLC invariant violated for token {token} at ts {ts}: {detail}")]
    InvalidOhlc {
        token: InstrumentToken,
        ts: i64,
        detail: String,
    },

    #[error("tick queue capacity exceeded, dropped {dropped} oldest batches")]
    QueueOverflow { dropped: usize },

    #[error("no live candle open for token {token} interval {interval_minutes}m")]
    NoLiveCandle {
        token: InstrumentToken,
        interval_minutes: u32,
    },
}

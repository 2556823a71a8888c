//! The push surface: a subscription bus streaming status snapshots, trade
//! deltas, chart updates, and raw LTP ticks to authorized subscribers.
//! Authorization (a shared secret, per spec §6) is a transport concern and
//! out of scope here — this module only fixes the event shapes and the
//! [`PushBus`] contract a transport implements against.

use crate::admin::EngineStatus;
use async_trait::async_trait;
use ixtrade_data::{Candle, Tick};
use ixtrade_markets::InstrumentToken;
use ixtrade_trader::Trade;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleUpdate {
    pub token: InstrumentToken,
    pub interval_minutes: u32,
    /// `true` for the first candle snapshot sent after a subscriber joins;
    /// `false` for every live-bar delta after that.
    pub is_snapshot: bool,
    pub candle: Candle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PushEvent {
    Status(EngineStatus),
    TradeDelta(Box<Trade>),
    Chart(CandleUpdate),
    Tick(Tick),
}

/// One subscriber's interest: which instrument tokens it wants ticks and
/// chart updates for. Status and trade-delta events are broadcast to every
/// authorized subscriber regardless of this filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushFilter {
    pub tokens: Vec<InstrumentToken>,
}

impl PushFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn wants(&self, token: InstrumentToken) -> bool {
        self.tokens.is_empty() || self.tokens.contains(&token)
    }
}

/// A transport (WebSocket server, SSE endpoint) implements this to hand
/// subscribers a live stream of [`PushEvent`]s. `subscribe` returns
/// immediately; the returned receiver end is whatever async channel the
/// implementer's transport is built on, which is why this trait only
/// specifies the publish half — a transport owns its own subscriber
/// registry and fan-out.
#[async_trait]
pub trait PushBus: Send + Sync {
    async fn publish(&self, event: PushEvent);

    /// Registers a subscriber's [`PushFilter`]; returns a handle the
    /// subscriber later passes to [`Self::unsubscribe`]. No transport-level
    /// connection is implied — this only tracks interest.
    async fn subscribe(&self, filter: PushFilter) -> u64;

    async fn unsubscribe(&self, subscriber_id: u64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_wants_every_token() {
        let filter = PushFilter::all();
        assert!(filter.wants(InstrumentToken(1)));
        assert!(filter.wants(InstrumentToken(999)));
    }

    #[test]
    fn non_empty_filter_only_wants_listed_tokens() {
        let filter = PushFilter { tokens: vec![InstrumentToken(42)] };
        assert!(filter.wants(InstrumentToken(42)));
        assert!(!filter.wants(InstrumentToken(7)));
    }
}

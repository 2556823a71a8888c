//! [`TradeStore`] — owns every [`Trade`] by `tradeId`. Orders and positions
//! reference a trade by id, never by pointer, so the store is the single
//! place mutations happen and nothing holds a stale clone across an update.

use crate::error::TradeError;
use crate::trade::Trade;
use ixtrade_markets::InstrumentToken;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct TradeStore {
    trades: RwLock<HashMap<String, Trade>>,
}

impl TradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, trade: Trade) {
        self.trades.write().insert(trade.trade_id.clone(), trade);
    }

    pub fn with_trade<R>(&self, trade_id: &str, f: impl FnOnce(&mut Trade) -> R) -> Result<R, TradeError> {
        let mut trades = self.trades.write();
        let trade = trades
            .get_mut(trade_id)
            .ok_or_else(|| TradeError::NotFound(trade_id.to_string()))?;
        Ok(f(trade))
    }

    pub fn get(&self, trade_id: &str) -> Option<Trade> {
        self.trades.read().get(trade_id).cloned()
    }

    pub fn live_trade_for_token(&self, token: InstrumentToken) -> Option<Trade> {
        self.trades
            .read()
            .values()
            .find(|t| t.instrument_token == token && !t.is_terminal())
            .cloned()
    }

    pub fn has_open_position(&self, token: InstrumentToken) -> bool {
        self.live_trade_for_token(token).is_some()
    }

    pub fn all_live(&self) -> Vec<Trade> {
        self.trades.read().values().filter(|t| !t.is_terminal()).cloned().collect()
    }

    pub fn remove(&self, trade_id: &str) -> Option<Trade> {
        self.trades.write().remove(trade_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::TradeState;
    use chrono::DateTime;
    use ixtrade_markets::Side;
    use rust_decimal::Decimal;

    fn trade(id: &str, token: u64) -> Trade {
        Trade::new(
            id,
            Side::Buy,
            "STRAT-A",
            "NIFTY",
            InstrumentToken(token),
            Decimal::from(10),
            Decimal::ONE,
            Decimal::from(100),
            Decimal::new(5, 1),
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        )
    }

    #[test]
    fn finds_live_trade_by_token_excluding_terminal() {
        let store = TradeStore::new();
        let mut t = trade("T1", 1);
        t.state = TradeState::Closed;
        store.insert(t);
        assert!(!store.has_open_position(InstrumentToken(1)));

        store.insert(trade("T2", 2));
        assert!(store.has_open_position(InstrumentToken(2)));
    }

    #[test]
    fn with_trade_mutates_in_place() {
        let store = TradeStore::new();
        store.insert(trade("T1", 1));
        store
            .with_trade("T1", |t| t.filled_qty = Decimal::from(5))
            .unwrap();
        assert_eq!(store.get("T1").unwrap().filled_qty, Decimal::from(5));
    }
}

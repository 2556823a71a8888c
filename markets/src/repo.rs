//! `InstrumentRepo` — token <-> tradingsymbol lookup.

use crate::instrument::{Instrument, InstrumentToken};
use std::collections::HashMap;

/// In-memory mapping between instrument tokens and their immutable
/// [`Instrument`] records. Populated once at startup from the broker's
/// instrument dump and never mutated afterwards except to add instruments
/// discovered by broker-position reconciliation.
#[derive(Debug, Default)]
pub struct InstrumentRepo {
    by_token: HashMap<InstrumentToken, Instrument>,
    by_symbol: HashMap<String, InstrumentToken>,
}

impl InstrumentRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instrument: Instrument) {
        self.by_symbol
            .insert(instrument.tradingsymbol.clone(), instrument.token);
        self.by_token.insert(instrument.token, instrument);
    }

    pub fn by_token(&self, token: InstrumentToken) -> Option<&Instrument> {
        self.by_token.get(&token)
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&Instrument> {
        self.by_symbol
            .get(symbol)
            .and_then(|token| self.by_token.get(token))
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = InstrumentToken> + '_ {
        self.by_token.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ExchangeId;
    use crate::instrument::InstrumentType;
    use rust_decimal_macros::dec;

    #[test]
    fn round_trips_token_and_symbol_lookup() {
        let mut repo = InstrumentRepo::new();
        let inst = Instrument::new(
            InstrumentToken(738561),
            "RELIANCE",
            ExchangeId::Nse,
            "NSE-EQ",
            InstrumentType::Eq,
            dec!(0.05),
            1,
        )
        .unwrap();
        repo.insert(inst.clone());

        assert_eq!(repo.by_token(InstrumentToken(738561)), Some(&inst));
        assert_eq!(repo.by_symbol("RELIANCE"), Some(&inst));
        assert_eq!(repo.by_symbol("UNKNOWN"), None);
        assert_eq!(repo.len(), 1);
    }
}

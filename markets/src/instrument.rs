//! The tradable [`Instrument`] model.

use crate::exchange::ExchangeId;
use chrono::NaiveDate;
use ixtrade_macros::DisplayId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Broker-assigned numeric identifier for an instrument. Stable for the life
/// of the contract; the same token never refers to two different
/// instruments within a session.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Default, DisplayId,
)]
pub struct InstrumentToken(pub u64);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum InstrumentType {
    Eq,
    Fut,
    Ce,
    Pe,
    Index,
}

impl InstrumentType {
    pub fn is_option(&self) -> bool {
        matches!(self, InstrumentType::Ce | InstrumentType::Pe)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InstrumentError {
    #[error("tick_size must be > 0, got {0}")]
    NonPositiveTickSize(Decimal),
    #[error("lot_size must be >= 1, got {0}")]
    ZeroLotSize(u32),
    #[error("option instrument requires strike and expiry")]
    MissingOptionFields,
}

/// Immutable-once-cached tradable instrument.
///
/// Invariant: `tick_size > 0`, `lot_size >= 1`; options carry `strike` and
/// `expiry`, other kinds never do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub token: InstrumentToken,
    pub tradingsymbol: String,
    pub exchange: ExchangeId,
    pub segment: String,
    pub instrument_type: InstrumentType,
    pub tick_size: Decimal,
    pub lot_size: u32,
    pub expiry: Option<NaiveDate>,
    pub strike: Option<Decimal>,
}

impl Instrument {
    pub fn new(
        token: InstrumentToken,
        tradingsymbol: impl Into<String>,
        exchange: ExchangeId,
        segment: impl Into<String>,
        instrument_type: InstrumentType,
        tick_size: Decimal,
        lot_size: u32,
    ) -> Result<Self, InstrumentError> {
        if tick_size <= Decimal::ZERO {
            return Err(InstrumentError::NonPositiveTickSize(tick_size));
        }
        if lot_size == 0 {
            return Err(InstrumentError::ZeroLotSize(lot_size));
        }
        Ok(Self {
            token,
            tradingsymbol: tradingsymbol.into(),
            exchange,
            segment: segment.into(),
            instrument_type,
            tick_size,
            lot_size,
            expiry: None,
            strike: None,
        })
    }

    pub fn with_option_fields(
        mut self,
        strike: Decimal,
        expiry: NaiveDate,
    ) -> Result<Self, InstrumentError> {
        if !self.instrument_type.is_option() {
            return Err(InstrumentError::MissingOptionFields);
        }
        self.strike = Some(strike);
        self.expiry = Some(expiry);
        Ok(self)
    }

    pub fn with_future_expiry(mut self, expiry: NaiveDate) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Rounds `price` to the nearest valid multiple of `tick_size`.
    pub fn round_to_tick(&self, price: Decimal) -> Decimal {
        if self.tick_size.is_zero() {
            return price;
        }
        (price / self.tick_size).round() * self.tick_size
    }
}

impl Display for Instrument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.tradingsymbol, self.exchange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eq_instrument() -> Instrument {
        Instrument::new(
            InstrumentToken(1),
            "RELIANCE",
            ExchangeId::Nse,
            "NSE-EQ",
            InstrumentType::Eq,
            dec!(0.05),
            1,
        )
        .unwrap()
    }

    #[test]
    fn rejects_non_positive_tick_size() {
        let err = Instrument::new(
            InstrumentToken(1),
            "RELIANCE",
            ExchangeId::Nse,
            "NSE-EQ",
            InstrumentType::Eq,
            dec!(0),
            1,
        )
        .unwrap_err();
        assert_eq!(err, InstrumentError::NonPositiveTickSize(dec!(0)));
    }

    #[test]
    fn rejects_zero_lot_size() {
        let err = Instrument::new(
            InstrumentToken(1),
            "RELIANCE",
            ExchangeId::Nse,
            "NSE-EQ",
            InstrumentType::Eq,
            dec!(0.05),
            0,
        )
        .unwrap_err();
        assert_eq!(err, InstrumentError::ZeroLotSize(0));
    }

    #[test]
    fn option_requires_option_kind() {
        let err = eq_instrument()
            .with_option_fields(dec!(2500), NaiveDate::from_ymd_opt(2026, 8, 28).unwrap())
            .unwrap_err();
        assert_eq!(err, InstrumentError::MissingOptionFields);
    }

    #[test]
    fn round_to_tick_snaps_to_nearest_multiple() {
        let inst = eq_instrument();
        assert_eq!(inst.round_to_tick(dec!(100.03)), dec!(100.05));
        assert_eq!(inst.round_to_tick(dec!(100.02)), dec!(100.0));
    }
}

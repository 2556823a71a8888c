//! [`StrategyRegistry`] — named strategy evaluators keyed by declaration
//! order, which doubles as the required tie-break order
//! step 4 ("select the highest-confidence signal; break ties by strategy
//! declaration order").

use crate::signal::{Regime, Signal, Style};
use ixtrade_data::Candle;

/// A pure evaluator over the trailing candle window for one instrument.
/// Implementations must not mutate `candles`.
pub trait Strategy: Send + Sync {
    /// Stable identifier, used for telemetry and optimizer keys.
    fn id(&self) -> &str;

    /// Regime style this strategy belongs to. `ALWAYS`-style strategies are
    /// modeled by registering the same evaluator under more than one style
    /// via [`StrategyRegistry::register`] ("union of
    /// ALWAYS strategies with regime-specific strategies").
    fn style(&self) -> Style;

    /// Minimum candle count this strategy needs to produce a verdict.
    fn min_candles(&self) -> usize;

    /// Evaluate the trailing window and optionally emit a signal. `regime`
    /// is attached to the produced [`Signal`] but plays no role in the
    /// evaluator's own logic.
    fn evaluate(&self, candles: &[Candle], regime: Regime) -> Option<Signal>;
}

/// Every candidate signal a registry evaluation round produced, kept for
/// telemetry regardless of which one wins.
#[derive(Debug, Clone)]
pub struct StrategyCandidate {
    pub strategy_id: String,
    pub signal: Option<Signal>,
}

#[derive(Default)]
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn Strategy>>,
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.strategies.iter().map(|s| s.id()).collect::<Vec<_>>())
            .finish()
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a strategy. Registration order is the tie-break order.
    pub fn register(&mut self, strategy: Box<dyn Strategy>) -> &mut Self {
        self.strategies.push(strategy);
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Strategies active for `styles`, in declaration order.
    pub fn active<'a>(&'a self, styles: &'a [Style]) -> impl Iterator<Item = &'a dyn Strategy> {
        self.strategies
            .iter()
            .map(|s| s.as_ref())
            .filter(move |s| styles.contains(&s.style()))
    }

    /// Runs every active strategy, records every candidate, and returns the
    /// highest-confidence signal (ties broken by declaration order).
    pub fn evaluate(
        &self,
        candles: &[Candle],
        regime: Regime,
        active_styles: &[Style],
    ) -> (Vec<StrategyCandidate>, Option<Signal>) {
        let mut candidates = Vec::new();
        let mut winner: Option<Signal> = None;

        for strategy in self.active(active_styles) {
            let signal = if candles.len() >= strategy.min_candles() {
                strategy.evaluate(candles, regime)
            } else {
                None
            };

            if let Some(ref s) = signal {
                let beats_current = match &winner {
                    None => true,
                    Some(current) => s.confidence > current.confidence,
                };
                if beats_current {
                    winner = Some(s.clone().clamp_confidence());
                }
            }

            candidates.push(StrategyCandidate {
                strategy_id: strategy.id().to_string(),
                signal,
            });
        }

        (candidates, winner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ixtrade_data::CandleSource;
    use ixtrade_markets::{InstrumentToken, Side};
    use rust_decimal_macros::dec;

    struct Fixed {
        id: &'static str,
        confidence: u8,
        style: Style,
    }

    impl Strategy for Fixed {
        fn id(&self) -> &str {
            self.id
        }
        fn style(&self) -> Style {
            self.style
        }
        fn min_candles(&self) -> usize {
            1
        }
        fn evaluate(&self, candles: &[Candle], regime: Regime) -> Option<Signal> {
            Some(Signal {
                strategy_id: self.id.to_string(),
                style: self.style,
                side: Side::Buy,
                confidence: self.confidence,
                reason: "fixed".into(),
                candle: candles.last().cloned().unwrap(),
                regime,
                produced_at: Utc::now(),
            })
        }
    }

    fn candle() -> Candle {
        Candle::new(
            InstrumentToken(1),
            1,
            chrono::DateTime::from_timestamp(0, 0).unwrap(),
            dec!(100),
            dec!(101),
            dec!(99),
            dec!(100),
            10,
            CandleSource::Live,
        )
        .unwrap()
    }

    #[test]
    fn highest_confidence_wins_ties_by_declaration_order() {
        let mut reg = StrategyRegistry::new();
        reg.register(Box::new(Fixed { id: "a", confidence: 50, style: Style::Trend }));
        reg.register(Box::new(Fixed { id: "b", confidence: 50, style: Style::Trend }));
        reg.register(Box::new(Fixed { id: "c", confidence: 80, style: Style::Trend }));

        let candles = vec![candle()];
        let (candidates, winner) = reg.evaluate(&candles, Regime::Trend, &[Style::Trend]);
        assert_eq!(candidates.len(), 3);
        assert_eq!(winner.unwrap().strategy_id, "c");
    }

    #[test]
    fn inactive_style_is_excluded() {
        let mut reg = StrategyRegistry::new();
        reg.register(Box::new(Fixed { id: "a", confidence: 90, style: Style::Range }));
        let candles = vec![candle()];
        let (candidates, winner) = reg.evaluate(&candles, Regime::Trend, &[Style::Trend]);
        assert!(candidates.is_empty());
        assert!(winner.is_none());
    }
}

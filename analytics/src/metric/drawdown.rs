use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Largest peak-to-trough decline in cumulative net P&L, in INR.
///
/// Computed from a running equity curve rather than individual trades, so
/// it captures drawdown across a losing streak, not just within one trade.
#[derive(Debug, Clone, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
pub struct MaxDrawdown {
    pub value_inr: Decimal,
}

impl MaxDrawdown {
    /// `cumulative_pnl_inr` is the running sum of net P&L after each closed
    /// trade, in the order trades closed.
    pub fn calculate(cumulative_pnl_inr: &[Decimal]) -> Self {
        let mut peak = Decimal::ZERO;
        let mut worst = Decimal::ZERO;

        for &equity in cumulative_pnl_inr {
            if equity > peak {
                peak = equity;
            }
            let drawdown = peak - equity;
            if drawdown > worst {
                worst = drawdown;
            }
        }

        Self { value_inr: worst }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn no_trades_means_no_drawdown() {
        assert_eq!(MaxDrawdown::calculate(&[]).value_inr, Decimal::ZERO);
    }

    #[test]
    fn monotonically_rising_equity_has_no_drawdown() {
        let curve = [dec!(100), dec!(250), dec!(400)];
        assert_eq!(MaxDrawdown::calculate(&curve).value_inr, Decimal::ZERO);
    }

    #[test]
    fn finds_the_largest_decline_from_a_running_peak() {
        // peak 500 at index 1, trough 100 at index 3: drawdown 400
        // later peak 600 at index 4, trough 550 at index 5: drawdown 50
        let curve = [dec!(200), dec!(500), dec!(300), dec!(100), dec!(600), dec!(550)];
        assert_eq!(MaxDrawdown::calculate(&curve).value_inr, dec!(400));
    }

    #[test]
    fn an_all_losing_run_draws_down_from_the_zero_baseline() {
        let curve = [dec!(-50), dec!(-120), dec!(-80)];
        assert_eq!(MaxDrawdown::calculate(&curve).value_inr, dec!(120));
    }
}

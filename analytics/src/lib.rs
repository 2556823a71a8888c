//! Performance metrics, data-quality checks, and a backtest harness for the
//! intraday engine.
//!
//! - [`metric`] — win rate, profit factor, Sharpe ratio, and max drawdown,
//!   computed from a closed-trade series or a return series.
//! - [`time`] — named time intervals ([`time::Daily`], [`time::Annual252`],
//!   [`time::Annual365`]) a [`metric::sharpe::SharpeRatio`] can be expressed
//!   or rescaled in.
//! - [`quality`] — checks run over a candle series before it is replayed,
//!   catching non-monotonic timestamps, misaligned intervals, gaps, and
//!   out-of-session candles.
//! - [`backtest`] — [`backtest::BacktestHarness`] replays a candle series
//!   through the selector → strategy → admission-chain → dynamic-exit
//!   pipeline against a mock broker and produces a [`backtest::BacktestRun`]
//!   artifact.
//!
//! ```rust
//! use ixtrade_analytics::metric::sharpe::SharpeRatio;
//! use ixtrade_analytics::time::Daily;
//! use rust_decimal_macros::dec;
//!
//! let sharpe = SharpeRatio::calculate(dec!(0.0015), dec!(0.0025), dec!(0.02), Daily);
//! assert!(sharpe.value != rust_decimal::Decimal::ZERO);
//! ```

pub mod backtest;
pub mod metric;
pub mod quality;
pub mod time;

pub use backtest::{BacktestError, BacktestHarness, BacktestMetrics, BacktestParams, BacktestRun};
pub use quality::{DataQualityMode, Issue, QualityError};

//! Performance metrics computed from a closed-trade series: win rate,
//! profit factor, Sharpe ratio, and max drawdown. Each metric is a small
//! value type with a `calculate` constructor rather than a free function,
//! so a metric carries its own unit (ratio, INR, R) alongside its value.

pub mod drawdown;
pub mod profit_factor;
pub mod sharpe;
pub mod win_rate;

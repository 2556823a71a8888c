//! [`AdaptiveOptimizer`] — admission chain stage 4.
//! Rolling fee-multiple windows per `(symbol, strategy, bucket)` and
//! `(strategy, bucket)` key; auto-expiring blocks; soft de-weighting when
//! no block is active.

use crate::calendar::SessionBucket;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
pub struct OptimizerConfigParams {
    pub lookback_n: usize,
    pub min_samples: usize,
    pub block_ttl: Duration,
    pub fee_multiple_threshold: Decimal,
    pub spread_penalty_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadRegime {
    Normal,
    Wide,
    Extreme,
}

#[derive(Debug, Clone)]
pub enum OptimizerVerdict {
    Blocked { reason: String, until: DateTime<Utc> },
    Ok { confidence_mult: Decimal, qty_mult: Decimal },
}

#[derive(Debug, Clone)]
struct Block {
    reason: String,
    until: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct WindowSet {
    samples: HashMap<String, VecDeque<Decimal>>,
    blocks: HashMap<String, Block>,
}

#[derive(Debug)]
pub struct AdaptiveOptimizer {
    config: OptimizerConfigParams,
    windows: parking_lot::RwLock<WindowSet>,
}

fn key_symbol_strategy_bucket(symbol: &str, strategy_id: &str, bucket: SessionBucket) -> String {
    format!("{symbol}:{strategy_id}:{bucket:?}")
}

fn key_strategy_bucket(strategy_id: &str, bucket: SessionBucket) -> String {
    format!("{strategy_id}:{bucket:?}")
}

impl AdaptiveOptimizer {
    pub fn new(config: OptimizerConfigParams) -> Self {
        Self { config, windows: parking_lot::RwLock::new(WindowSet::default()) }
    }

    /// Pushes a closed trade's fee-multiple sample into both windows and,
    /// if the rolling average falls below threshold with enough samples,
    /// creates a time-bounded block.
    pub fn record_closed_trade(
        &self,
        symbol: &str,
        strategy_id: &str,
        bucket: SessionBucket,
        fee_multiple: Decimal,
        now: DateTime<Utc>,
    ) {
        let keys = [
            key_symbol_strategy_bucket(symbol, strategy_id, bucket),
            key_strategy_bucket(strategy_id, bucket),
        ];
        let mut windows = self.windows.write();
        for key in keys {
            let window = windows.samples.entry(key.clone()).or_default();
            window.push_back(fee_multiple);
            while window.len() > self.config.lookback_n {
                window.pop_front();
            }
            if window.len() >= self.config.min_samples {
                let avg = window.iter().sum::<Decimal>() / Decimal::from(window.len());
                if avg < self.config.fee_multiple_threshold {
                    windows.blocks.insert(
                        key,
                        Block {
                            reason: format!("fee multiple avg {avg} below threshold"),
                            until: now + self.config.block_ttl,
                        },
                    );
                }
            }
        }
    }

    pub fn evaluate_signal(
        &self,
        symbol: &str,
        strategy_id: &str,
        bucket: SessionBucket,
        spread_regime: SpreadRegime,
        spread_hard_block_enabled: bool,
        now: DateTime<Utc>,
    ) -> OptimizerVerdict {
        if spread_hard_block_enabled && spread_regime == SpreadRegime::Extreme {
            return OptimizerVerdict::Blocked {
                reason: "spread regime EXTREME".to_string(),
                until: now,
            };
        }

        // Expired blocks are GC'd lazily here, on lookup, rather than by a
        // background sweep — `blocks` never grows past the number of keys
        // with a currently-active block.
        let mut windows = self.windows.write();
        for key in [
            key_symbol_strategy_bucket(symbol, strategy_id, bucket),
            key_strategy_bucket(strategy_id, bucket),
        ] {
            if let Some(block) = windows.blocks.get(&key) {
                if now < block.until {
                    return OptimizerVerdict::Blocked { reason: block.reason.clone(), until: block.until };
                }
                windows.blocks.remove(&key);
            }
        }

        let avg = windows
            .samples
            .get(&key_symbol_strategy_bucket(symbol, strategy_id, bucket))
            .filter(|w| w.len() >= self.config.min_samples)
            .map(|w| w.iter().sum::<Decimal>() / Decimal::from(w.len()));

        let mut mult = match avg {
            Some(avg) if avg < self.config.fee_multiple_threshold * Decimal::new(2, 0) => {
                (avg / self.config.fee_multiple_threshold).clamp(Decimal::new(1, 1), Decimal::ONE)
            }
            _ => Decimal::ONE,
        };

        if self.config.spread_penalty_enabled && spread_regime == SpreadRegime::Wide {
            mult *= Decimal::new(8, 1);
        }

        OptimizerVerdict::Ok { confidence_mult: mult, qty_mult: mult }
    }

    /// Every key the optimizer has samples or an active block for, oldest
    /// insertion order is not preserved (backed by a `HashMap`). An admin
    /// surface's "optimizer snapshot" operation reads this.
    pub fn snapshot(&self) -> Vec<OptimizerKeySnapshot> {
        let windows = self.windows.read();
        windows
            .samples
            .keys()
            .map(|key| {
                let block = windows.blocks.get(key);
                OptimizerKeySnapshot {
                    key: key.clone(),
                    blocked: block.is_some(),
                    until: block.map(|b| b.until),
                    reason: block.map(|b| b.reason.clone()),
                }
            })
            .collect()
    }

    /// Discards every rolling window and block; the optimizer starts clean
    /// on the next [`Self::record_closed_trade`].
    pub fn reset(&self) {
        let mut windows = self.windows.write();
        windows.samples.clear();
        windows.blocks.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerKeySnapshot {
    pub key: String,
    pub blocked: bool,
    pub until: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

//! [`DynamicExitManager`] — the pure `compute_exit_plan` function:
//! per-tick breakeven, trailing-stop, profit-lock, time-stop, and
//! option-fallback recomputation. Takes a trade snapshot and returns a
//! patch plus an optional exit action; never mutates its inputs.

use crate::trade::Trade;
use chrono::{DateTime, Duration, Utc};
use ixtrade_markets::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DynamicExitConfig {
    pub be_arm_r: Decimal,
    pub be_arm_cost_multiple: Decimal,
    pub be_buffer_ticks: u32,
    pub be_keep_r: Option<Decimal>,
    pub trail_arm_r: Decimal,
    pub trail_gap_pct_pre_be: Decimal,
    pub trail_gap_pct_post_be: Decimal,
    pub trail_min_points: Decimal,
    pub trail_max_points: Decimal,
    pub trail_tighten_r: Decimal,
    pub step_ticks_pre_be: u32,
    pub step_ticks_post_be: u32,
    pub no_progress_min: u32,
    pub no_progress_mfe_r: Decimal,
    pub underlying_confirm_bps: Decimal,
    pub max_hold_min: u32,
    pub max_hold_skip_if_pnl_r: Decimal,
    pub max_hold_skip_if_peak_r: Decimal,
    pub max_hold_skip_if_locked: bool,
    pub profit_lock_enabled: bool,
    pub profit_lock_arm_r: Decimal,
    pub profit_lock_keep_r: Decimal,
    pub option_premium_pct_sl: Decimal,
    pub option_premium_pct_target: Decimal,
    pub option_iv_crush_drop_pct: Decimal,
    pub option_iv_spike_gain_pct: Decimal,
    pub option_early_widen_mult: Decimal,
    pub liquidity_buffer_ticks: u32,
    pub liquidity_buffer_atr_pct: Decimal,
    pub round_level_avoid_step: Decimal,
    pub allow_target_tighten: bool,
}

impl Default for DynamicExitConfig {
    fn default() -> Self {
        Self {
            be_arm_r: Decimal::new(5, 1),
            be_arm_cost_multiple: Decimal::from(3),
            be_buffer_ticks: 1,
            be_keep_r: None,
            trail_arm_r: Decimal::ONE,
            trail_gap_pct_pre_be: Decimal::new(6, 3),
            trail_gap_pct_post_be: Decimal::new(4, 3),
            trail_min_points: Decimal::new(5, 1),
            trail_max_points: Decimal::from(20),
            trail_tighten_r: Decimal::from(2),
            step_ticks_pre_be: 2,
            step_ticks_post_be: 1,
            no_progress_min: 8,
            no_progress_mfe_r: Decimal::new(2, 1),
            underlying_confirm_bps: Decimal::from(10),
            max_hold_min: 45,
            max_hold_skip_if_pnl_r: Decimal::ONE,
            max_hold_skip_if_peak_r: Decimal::ONE,
            max_hold_skip_if_locked: true,
            profit_lock_enabled: true,
            profit_lock_arm_r: Decimal::ONE,
            profit_lock_keep_r: Decimal::new(25, 2),
            option_premium_pct_sl: Decimal::new(25, 2),
            option_premium_pct_target: Decimal::new(50, 2),
            option_iv_crush_drop_pct: Decimal::new(30, 2),
            option_iv_spike_gain_pct: Decimal::new(40, 2),
            option_early_widen_mult: Decimal::new(15, 1),
            liquidity_buffer_ticks: 2,
            liquidity_buffer_atr_pct: Decimal::new(10, 2),
            round_level_avoid_step: Decimal::new(5, 1),
            allow_target_tighten: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TimeStopNoProgress,
    TimeStopMaxHold,
    Target,
    StopLoss,
    IvCrush,
}

/// The order the source checks max-hold bypass conditions in, asserted
/// literally by the scenario pair that requires PEAK_R to win when both the
/// peak and the lock condition would otherwise apply — preserve exactly
/// this sequence: PNL_R, then PEAK_R, then LOCKED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxHoldSkipReason {
    PnlR,
    PeakR,
    Locked,
}

#[derive(Debug, Clone, Copy)]
pub enum ExitAction {
    None,
    PatchSlTarget,
    ExitNow { reason: ExitReason },
}

#[derive(Debug, Clone, Default)]
pub struct ExitPlanPatch {
    pub stop_loss: Option<Decimal>,
    pub target_price: Option<Decimal>,
    pub peak_ltp: Option<Decimal>,
    pub peak_pnl_inr: Option<Decimal>,
    pub be_locked_at: Option<DateTime<Utc>>,
    pub trail_locked_at: Option<DateTime<Utc>>,
    pub time_stop_triggered_at: Option<DateTime<Utc>>,
    pub profit_lock_armed_at: Option<DateTime<Utc>>,
    pub profit_lock_inr: Option<Decimal>,
    pub profit_lock_r: Option<Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct ExitPlanMeta {
    pub max_hold_skip_reason: Option<MaxHoldSkipReason>,
}

#[derive(Debug, Clone)]
pub struct ExitPlan {
    pub action: ExitAction,
    pub patch: ExitPlanPatch,
    pub meta: ExitPlanMeta,
}

impl ExitPlan {
    fn none() -> Self {
        Self { action: ExitAction::None, patch: ExitPlanPatch::default(), meta: ExitPlanMeta::default() }
    }
}

/// Stateless: every call derives its decision from `trade` and the given
/// tick, never from manager-side state. Rule order is fixed; later rules may
/// patch fields earlier rules already patched but must never loosen SL past
/// `initial_stop_loss` — the one exception is the option early-widen window,
/// and even there the breakeven floor wins once BE is armed.
pub struct DynamicExitManager;

impl DynamicExitManager {
    pub fn compute_exit_plan(
        trade: &Trade,
        ltp: Decimal,
        now: DateTime<Utc>,
        config: &DynamicExitConfig,
        underlying_ltp: Option<Decimal>,
    ) -> ExitPlan {
        let (Some(entry), Some(risk_abs)) = (trade.entry_price, Self::risk_abs(trade)) else {
            return ExitPlan::none();
        };
        if risk_abs.is_zero() {
            return ExitPlan::none();
        }

        let pnl_inr = trade.unrealized_pnl_inr(ltp);
        let pnl_r = pnl_inr / trade.risk_inr;
        let peak_ltp = Self::peak_ltp(trade, ltp);
        let peak_pnl_inr = trade.unrealized_pnl_inr(peak_ltp).max(trade.peak_pnl_inr);
        let peak_r = peak_pnl_inr / trade.risk_inr;
        let hold = trade.hold_duration(now);

        if let Some(plan) = Self::time_stop_no_progress(trade, config, hold, peak_r, underlying_ltp, now) {
            return plan;
        }
        if let Some(plan) = Self::max_hold(trade, config, hold, pnl_r, peak_r) {
            return plan;
        }
        if trade.is_option() {
            if let Some(plan) = Self::option_iv_crush_exit(trade, config, entry, ltp, underlying_ltp, now) {
                return plan;
            }
        }

        let mut patch = ExitPlanPatch {
            peak_ltp: Some(peak_ltp),
            peak_pnl_inr: Some(peak_pnl_inr),
            ..Default::default()
        };

        let be_armed_now = !trade.be_locked
            && pnl_inr >= (config.be_arm_r * trade.risk_inr).max(Decimal::ZERO)
            && pnl_r >= config.be_arm_r;
        let be_locked = trade.be_locked || be_armed_now;
        if be_armed_now {
            patch.be_locked_at = Some(now);
        }

        let trail_armed_now = !trade.trail_locked && pnl_r >= config.trail_arm_r;
        let trail_locked = trade.trail_locked || trail_armed_now;
        if trail_armed_now {
            patch.trail_locked_at = Some(now);
        }

        let tick = trade.tick_size;
        let mut sl_floor: Option<Decimal> = trade.stop_loss;

        if be_locked {
            let be_buffer = tick * Decimal::from(config.be_buffer_ticks);
            if let Some(true_be) = trade.true_breakeven(be_buffer, Decimal::ONE) {
                let be_floor = match trade.side {
                    Side::Buy => true_be + be_buffer,
                    Side::Sell => true_be - be_buffer,
                };
                sl_floor = Some(Self::tighten_only(trade.side, sl_floor, be_floor));
            }
        }

        if trade.is_option() {
            sl_floor = Self::option_sl_floor(trade, config, entry, risk_abs, hold, sl_floor, be_locked);
            if let Some(spike_floor) = Self::option_iv_spike_lock(trade, config, entry, ltp, underlying_ltp) {
                sl_floor = Some(Self::tighten_only(trade.side, sl_floor, spike_floor));
            }
            let target = match trade.side {
                Side::Buy => entry + entry * config.option_premium_pct_target,
                Side::Sell => entry - entry * config.option_premium_pct_target,
            };
            if trade.target_price.is_none() {
                patch.target_price = Some(target);
            } else if config.allow_target_tighten {
                patch.target_price = Some(match trade.side {
                    Side::Buy => trade.target_price.unwrap().min(target),
                    Side::Sell => trade.target_price.unwrap().max(target),
                });
            }
        } else {
            if config.profit_lock_enabled && peak_r >= config.profit_lock_arm_r {
                let lock_inr = config.profit_lock_keep_r * trade.risk_inr;
                let lock_price = match trade.side {
                    Side::Buy => entry + (lock_inr / trade.filled_qty.max(Decimal::ONE)),
                    Side::Sell => entry - (lock_inr / trade.filled_qty.max(Decimal::ONE)),
                };
                sl_floor = Some(Self::tighten_only(trade.side, sl_floor, lock_price));
                if trade.profit_lock_armed_at.is_none() {
                    patch.profit_lock_armed_at = Some(now);
                    patch.profit_lock_inr = Some(lock_inr);
                    patch.profit_lock_r = Some(config.profit_lock_keep_r);
                }
            }

            if trail_locked {
                let gap_pct = if be_locked { config.trail_gap_pct_post_be } else { config.trail_gap_pct_pre_be };
                let mut gap = (peak_ltp * gap_pct).clamp(config.trail_min_points, config.trail_max_points);
                if peak_r >= config.trail_tighten_r {
                    gap = (gap * Decimal::new(5, 1)).max(config.trail_min_points);
                }
                let trail_price = match trade.side {
                    Side::Buy => peak_ltp - gap,
                    Side::Sell => peak_ltp + gap,
                };
                sl_floor = Some(Self::tighten_only(trade.side, sl_floor, trail_price));
            }
        }

        if let Some(new_sl) = sl_floor {
            let step = tick
                * Decimal::from(if be_locked { config.step_ticks_post_be } else { config.step_ticks_pre_be });
            let moved_enough = trade.stop_loss.is_none_or(|cur| (new_sl - cur).abs() >= step);
            let lock_floor_changed = patch.be_locked_at.is_some() || patch.profit_lock_armed_at.is_some();
            if moved_enough || lock_floor_changed {
                patch.stop_loss = Some(new_sl);
            }
        }

        let action = if patch.stop_loss.is_some() || patch.target_price.is_some() {
            ExitAction::PatchSlTarget
        } else {
            ExitAction::None
        };

        ExitPlan { action, patch, meta: ExitPlanMeta::default() }
    }

    fn risk_abs(trade: &Trade) -> Option<Decimal> {
        let entry = trade.entry_price?;
        let initial_sl = trade.initial_stop_loss?;
        Some((entry - initial_sl).abs())
    }

    fn peak_ltp(trade: &Trade, ltp: Decimal) -> Decimal {
        match (trade.peak_ltp, trade.side) {
            (Some(peak), Side::Buy) => peak.max(ltp),
            (Some(peak), Side::Sell) => peak.min(ltp),
            (None, _) => ltp,
        }
    }

    /// Moves `current` toward `candidate` only if that tightens risk (never
    /// loosens past the current floor).
    fn tighten_only(side: Side, current: Option<Decimal>, candidate: Decimal) -> Decimal {
        match current {
            None => candidate,
            Some(cur) => match side {
                Side::Buy => cur.max(candidate),
                Side::Sell => cur.min(candidate),
            },
        }
    }

    fn time_stop_no_progress(
        trade: &Trade,
        config: &DynamicExitConfig,
        hold: Duration,
        peak_r: Decimal,
        underlying_ltp: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Option<ExitPlan> {
        if trade.time_stop_triggered {
            return None;
        }
        if hold < Duration::minutes(i64::from(config.no_progress_min)) {
            return None;
        }
        if peak_r >= config.no_progress_mfe_r {
            return None;
        }
        if trade.is_option() {
            let underlying_entry = trade.underlying_ref_price_at_entry?;
            let underlying_now = underlying_ltp?;
            let move_bps = ((underlying_now - underlying_entry) / underlying_entry).abs()
                * Decimal::from(10_000);
            if move_bps >= config.underlying_confirm_bps {
                return None;
            }
        }
        Some(ExitPlan {
            action: ExitAction::ExitNow { reason: ExitReason::TimeStopNoProgress },
            patch: ExitPlanPatch { time_stop_triggered_at: Some(now), ..Default::default() },
            meta: ExitPlanMeta::default(),
        })
    }

    fn max_hold(
        trade: &Trade,
        config: &DynamicExitConfig,
        hold: Duration,
        pnl_r: Decimal,
        peak_r: Decimal,
    ) -> Option<ExitPlan> {
        if hold < Duration::minutes(i64::from(config.max_hold_min)) {
            return None;
        }
        let locked = trade.be_locked || trade.trail_locked;

        let skip_reason = if pnl_r >= config.max_hold_skip_if_pnl_r {
            Some(MaxHoldSkipReason::PnlR)
        } else if peak_r >= config.max_hold_skip_if_peak_r {
            Some(MaxHoldSkipReason::PeakR)
        } else if config.max_hold_skip_if_locked && locked {
            Some(MaxHoldSkipReason::Locked)
        } else {
            None
        };

        match skip_reason {
            Some(reason) => Some(ExitPlan {
                action: ExitAction::None,
                patch: ExitPlanPatch::default(),
                meta: ExitPlanMeta { max_hold_skip_reason: Some(reason) },
            }),
            None => Some(ExitPlan {
                action: ExitAction::ExitNow { reason: ExitReason::TimeStopMaxHold },
                patch: ExitPlanPatch::default(),
                meta: ExitPlanMeta::default(),
            }),
        }
    }

    /// True when the underlying has stayed roughly flat while premium moved —
    /// the confirmation that a premium swing is IV, not direction.
    fn underlying_flat(config: &DynamicExitConfig, underlying_ltp: Option<Decimal>, underlying_entry: Option<Decimal>) -> bool {
        match (underlying_ltp, underlying_entry) {
            (Some(now), Some(entry)) if !entry.is_zero() => {
                let move_bps = ((now - entry) / entry).abs() * Decimal::from(10_000);
                move_bps < config.underlying_confirm_bps
            }
            _ => true,
        }
    }

    /// Premium collapsed by `option_iv_crush_drop_pct` with the underlying
    /// flat: IV crush, not a directional loss, so this exits outright rather
    /// than riding the premium-percent stop down further.
    fn option_iv_crush_exit(
        trade: &Trade,
        config: &DynamicExitConfig,
        entry: Decimal,
        ltp: Decimal,
        underlying_ltp: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Option<ExitPlan> {
        if entry.is_zero() {
            return None;
        }
        let drop_pct = match trade.side {
            Side::Buy => (entry - ltp) / entry,
            Side::Sell => (ltp - entry) / entry,
        };
        if drop_pct < config.option_iv_crush_drop_pct {
            return None;
        }
        if !Self::underlying_flat(config, underlying_ltp, trade.underlying_ref_price_at_entry) {
            return None;
        }
        Some(ExitPlan {
            action: ExitAction::ExitNow { reason: ExitReason::IvCrush },
            patch: ExitPlanPatch { time_stop_triggered_at: Some(now), ..Default::default() },
            meta: ExitPlanMeta::default(),
        })
    }

    /// Premium jumped by `option_iv_spike_gain_pct` with the underlying flat:
    /// locks in most of the spike rather than trusting it to hold.
    fn option_iv_spike_lock(
        trade: &Trade,
        config: &DynamicExitConfig,
        entry: Decimal,
        ltp: Decimal,
        underlying_ltp: Option<Decimal>,
    ) -> Option<Decimal> {
        if entry.is_zero() {
            return None;
        }
        let gain_pct = match trade.side {
            Side::Buy => (ltp - entry) / entry,
            Side::Sell => (entry - ltp) / entry,
        };
        if gain_pct < config.option_iv_spike_gain_pct {
            return None;
        }
        if !Self::underlying_flat(config, underlying_ltp, trade.underlying_ref_price_at_entry) {
            return None;
        }
        let move_price = match trade.side {
            Side::Buy => ltp - entry,
            Side::Sell => entry - ltp,
        };
        let keep = move_price * config.profit_lock_keep_r;
        Some(match trade.side {
            Side::Buy => entry + keep,
            Side::Sell => entry - keep,
        })
    }

    /// The option SL floor: a premium-percent stop, ratcheted tighter over
    /// time like the cash floor, but for a capped early-widen window right
    /// after entry it is allowed to sit looser than the premium-percent
    /// level — never looser than `option_early_widen_mult * risk_abs` from
    /// entry — so normal opening-minute IV settling doesn't stop the trade
    /// out. Once breakeven is armed the widen window no longer applies: the
    /// BE floor (already folded into `current` by the caller) wins.
    fn option_sl_floor(
        trade: &Trade,
        config: &DynamicExitConfig,
        entry: Decimal,
        risk_abs: Decimal,
        hold: Duration,
        current: Option<Decimal>,
        be_locked: bool,
    ) -> Option<Decimal> {
        let premium_sl = match trade.side {
            Side::Buy => entry - entry * config.option_premium_pct_sl,
            Side::Sell => entry + entry * config.option_premium_pct_sl,
        };
        let in_widen_window = !be_locked && hold < Duration::minutes(i64::from(config.no_progress_min));
        if in_widen_window {
            let widened_bound = match trade.side {
                Side::Buy => entry - config.option_early_widen_mult * risk_abs,
                Side::Sell => entry + config.option_early_widen_mult * risk_abs,
            };
            return Some(widened_bound);
        }
        Some(Self::tighten_only(trade.side, current, premium_sl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::{OptionMeta, OptionType, Trade};
    use ixtrade_markets::InstrumentToken;
    use rust_decimal_macros::dec;

    fn base_trade(now: DateTime<Utc>) -> Trade {
        let mut t = Trade::new(
            "T1", Side::Buy, "STRAT-A", "NIFTY", InstrumentToken(1),
            dec!(10), Decimal::ONE, dec!(100), dec!(0.05), now,
        );
        t.record_entry_fill(dec!(100), dec!(10), dec!(90), None);
        t.entry_filled_at = Some(now);
        t
    }

    /// An option trade: `is_option()` true and an underlying reference price
    /// recorded at entry, so `time_stop_no_progress`'s underlying-confirm
    /// gate actually runs instead of being skipped for a cash trade.
    fn option_trade(now: DateTime<Utc>) -> Trade {
        let mut t = base_trade(now);
        t.option = Some(OptionMeta {
            option_type: OptionType::Call,
            strike: dec!(20000),
            underlying_token: InstrumentToken(2),
        });
        t.underlying_ref_price_at_entry = Some(dec!(20000));
        t
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn scenario_1_no_progress_time_stop_fires() {
        let t0 = at(0);
        let mut t = option_trade(t0);
        let config = DynamicExitConfig { no_progress_min: 5, no_progress_mfe_r: dec!(0.2), underlying_confirm_bps: dec!(12), ..Default::default() };

        let first = DynamicExitManager::compute_exit_plan(&t, dec!(100.05), at(60), &config, Some(dec!(20002)));
        assert!(matches!(first.action, ExitAction::None | ExitAction::PatchSlTarget));
        if let Some(peak) = first.patch.peak_ltp { t.peak_ltp = Some(peak); }
        if let Some(peak_pnl) = first.patch.peak_pnl_inr { t.peak_pnl_inr = peak_pnl; }

        // Underlying barely moved (20000 -> 20002, 1bps) — below the 12bps
        // confirm threshold, so the no-progress time stop still fires.
        let second = DynamicExitManager::compute_exit_plan(&t, dec!(100.10), at(360), &config, Some(dec!(20002)));
        assert!(matches!(second.action, ExitAction::ExitNow { reason: ExitReason::TimeStopNoProgress }));
        assert!(second.patch.time_stop_triggered_at.is_some());
    }

    #[test]
    fn scenario_2_no_progress_skipped_by_underlying_move() {
        let t0 = at(0);
        let t = option_trade(t0);
        let config = DynamicExitConfig { no_progress_min: 5, no_progress_mfe_r: dec!(0.2), underlying_confirm_bps: dec!(12), ..Default::default() };
        // Underlying moved 20000 -> 20100 (50bps), past the confirm
        // threshold — the premium stall is attributed to the underlying
        // actually moving, so the no-progress time stop is suppressed.
        let plan = DynamicExitManager::compute_exit_plan(&t, dec!(100.10), at(360), &config, Some(dec!(20100)));
        assert!(!matches!(plan.action, ExitAction::ExitNow { .. }));
    }

    #[test]
    fn scenario_3_max_hold_fires_on_low_pnl() {
        let t0 = at(0);
        let t = base_trade(t0);
        let config = DynamicExitConfig { no_progress_min: 0, max_hold_min: 10, ..Default::default() };
        let plan = DynamicExitManager::compute_exit_plan(&t, dec!(101), at(12 * 60), &config, Some(dec!(20005)));
        assert!(matches!(plan.action, ExitAction::ExitNow { reason: ExitReason::TimeStopMaxHold }));
    }

    #[test]
    fn scenario_4_max_hold_skipped_on_peak_r() {
        let t0 = at(0);
        let mut t = base_trade(t0);
        t.peak_pnl_inr = dec!(100);
        let config = DynamicExitConfig { no_progress_min: 0, max_hold_min: 10, ..Default::default() };
        let plan = DynamicExitManager::compute_exit_plan(&t, dec!(101), at(12 * 60), &config, Some(dec!(20005)));
        assert!(!matches!(plan.action, ExitAction::ExitNow { .. }));
        assert_eq!(plan.meta.max_hold_skip_reason, Some(MaxHoldSkipReason::PeakR));
    }

    #[test]
    fn scenario_5_profit_lock_arms_at_plus_one_r() {
        let t0 = at(0);
        let t = base_trade(t0);
        let config = DynamicExitConfig { profit_lock_enabled: true, profit_lock_arm_r: Decimal::ONE, profit_lock_keep_r: dec!(0.25), ..Default::default() };
        let plan = DynamicExitManager::compute_exit_plan(&t, dec!(110), at(60), &config, None);
        assert_eq!(plan.patch.profit_lock_armed_at, Some(at(60)));
        assert_eq!(plan.patch.profit_lock_inr, Some(dec!(25)));
        assert_eq!(plan.patch.profit_lock_r, Some(dec!(0.25)));
        let sl = plan.patch.stop_loss.expect("sl patched");
        assert!(sl >= dec!(102.5));
        assert!(sl < dec!(110));
    }

    fn option_trade_premium(now: DateTime<Utc>) -> Trade {
        let mut t = Trade::new(
            "O1", Side::Buy, "STRAT-A", "NIFTY", InstrumentToken(2),
            dec!(75), Decimal::ONE, dec!(1500), dec!(0.05), now,
        );
        t.option = Some(crate::trade::OptionMeta {
            option_type: crate::trade::OptionType::Call,
            strike: dec!(20000),
            underlying_token: InstrumentToken(1),
        });
        t.underlying_ref_price_at_entry = Some(dec!(20000));
        t.record_entry_fill(dec!(100), dec!(75), dec!(75), None);
        t.entry_filled_at = Some(now);
        t
    }

    #[test]
    fn option_iv_crush_exits_when_underlying_is_flat() {
        let t0 = at(0);
        let t = option_trade_premium(t0);
        let config = DynamicExitConfig { option_iv_crush_drop_pct: dec!(0.3), underlying_confirm_bps: dec!(10), ..Default::default() };
        let plan = DynamicExitManager::compute_exit_plan(&t, dec!(65), at(120), &config, Some(dec!(20005)));
        assert!(matches!(plan.action, ExitAction::ExitNow { reason: ExitReason::IvCrush }));
    }

    #[test]
    fn option_iv_crush_does_not_fire_on_directional_underlying_move() {
        let t0 = at(0);
        let t = option_trade_premium(t0);
        let config = DynamicExitConfig { option_iv_crush_drop_pct: dec!(0.3), underlying_confirm_bps: dec!(10), ..Default::default() };
        let plan = DynamicExitManager::compute_exit_plan(&t, dec!(65), at(120), &config, Some(dec!(20100)));
        assert!(!matches!(plan.action, ExitAction::ExitNow { reason: ExitReason::IvCrush }));
    }

    #[test]
    fn option_iv_spike_locks_in_most_of_the_gain() {
        let t0 = at(0);
        let t = option_trade_premium(t0);
        let config = DynamicExitConfig { option_iv_spike_gain_pct: dec!(0.3), underlying_confirm_bps: dec!(10), profit_lock_keep_r: dec!(0.5), no_progress_min: 0, ..Default::default() };
        let plan = DynamicExitManager::compute_exit_plan(&t, dec!(140), at(600), &config, Some(dec!(20005)));
        let sl = plan.patch.stop_loss.expect("sl patched");
        assert!(sl > dec!(100));
        assert!(sl < dec!(140));
    }

    #[test]
    fn option_early_widen_window_allows_a_looser_floor_than_premium_pct() {
        let t0 = at(0);
        let t = option_trade_premium(t0);
        let config = DynamicExitConfig {
            option_premium_pct_sl: dec!(0.25),
            option_early_widen_mult: dec!(1.5),
            no_progress_min: 10,
            ..Default::default()
        };
        let plan = DynamicExitManager::compute_exit_plan(&t, dec!(98), at(60), &config, Some(dec!(20001)));
        let sl = plan.patch.stop_loss.expect("sl patched");
        // premium-pct floor alone would be 75; the widen cap (entry - 1.5*risk) is looser.
        assert!(sl < dec!(75));
    }

    #[test]
    fn option_floor_reverts_to_premium_pct_after_widen_window_closes() {
        let t0 = at(0);
        let mut t = option_trade_premium(t0);
        let config = DynamicExitConfig {
            option_premium_pct_sl: dec!(0.25),
            option_early_widen_mult: dec!(1.5),
            no_progress_min: 10,
            no_progress_mfe_r: dec!(5),
            ..Default::default()
        };
        let widened = DynamicExitManager::compute_exit_plan(&t, dec!(98), at(60), &config, Some(dec!(20001)));
        t.stop_loss = widened.patch.stop_loss;
        // underlying has clearly moved by the second tick, so the no-progress
        // time-stop (which would otherwise fire first) does not apply.
        let later = DynamicExitManager::compute_exit_plan(&t, dec!(98), at(700), &config, Some(dec!(20300)));
        let sl = later.patch.stop_loss.expect("sl patched");
        assert_eq!(sl, dec!(75));
    }

    #[test]
    fn never_loosens_stop_loss_below_initial() {
        let t0 = at(0);
        let mut t = base_trade(t0);
        t.stop_loss = Some(dec!(95));
        let config = DynamicExitConfig::default();
        let plan = DynamicExitManager::compute_exit_plan(&t, dec!(99), at(30), &config, None);
        if let Some(sl) = plan.patch.stop_loss {
            assert!(sl >= dec!(90));
        }
    }
}

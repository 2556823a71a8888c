//! Concrete strategy family: ten pure evaluators grouped by
//! the regime style they run under.

mod bollinger_squeeze_breakout;
mod ema_cross;
mod ema_pullback_reclaim;
mod fakeout_fade;
mod opening_range_breakout;
mod range_breakout_volume;
mod rsi_fade_vwap_filter;
mod volume_spike_momentum;
mod vwap_reclaim;
mod wick_reversal;

pub use bollinger_squeeze_breakout::BollingerSqueezeBreakout;
pub use ema_cross::EmaCross;
pub use ema_pullback_reclaim::EmaPullbackReclaim;
pub use fakeout_fade::FakeoutFade;
pub use opening_range_breakout::OpeningRangeBreakout;
pub use range_breakout_volume::RangeBreakoutVolume;
pub use rsi_fade_vwap_filter::RsiFadeVwapFilter;
pub use volume_spike_momentum::VolumeSpikeMomentum;
pub use vwap_reclaim::VwapReclaim;
pub use wick_reversal::WickReversal;

use crate::registry::StrategyRegistry;

/// Registers all ten family strategies in the declaration order used to
/// break confidence ties.
pub fn register_all(registry: &mut StrategyRegistry) {
    registry
        .register(Box::new(EmaCross::default()))
        .register(Box::new(EmaPullbackReclaim::default()))
        .register(Box::new(VolumeSpikeMomentum::default()))
        .register(Box::new(RangeBreakoutVolume::default()))
        .register(Box::new(VwapReclaim::default()))
        .register(Box::new(BollingerSqueezeBreakout::default()))
        .register(Box::new(RsiFadeVwapFilter::default()))
        .register(Box::new(FakeoutFade::default()))
        .register(Box::new(WickReversal::default()))
        .register(Box::new(OpeningRangeBreakout::default()));
}

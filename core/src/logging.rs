//! Standardized logging configuration. Provides structured logs with a
//! filter to reduce per-tick span noise.
//!
//! ```rust,ignore
//! use ixtrade_core::logging::init_logging;
//!
//! fn main() {
//!     init_logging();
//!     tracing::info!("engine started");
//! }
//! ```
//!
//! ```bash
//! export RUST_LOG=debug
//! export RUST_LOG=ixtrade_core=info,ixtrade_data=debug,ixtrade_trader=warn
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Span name used by [`crate::System`] around per-tick processing; logging
/// inside this span is filtered out at INFO level to avoid one log line
/// per tick during market hours.
pub const TICK_SPAN_NAME: &str = "on_tick";

pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(TickSpanFilter)
        .init()
}

pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .with(TickSpanFilter)
        .init()
}

struct TickSpanFilter;

impl<S> tracing_subscriber::layer::Layer<S> for TickSpanFilter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn event_enabled(
        &self,
        _: &tracing::Event<'_>,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> bool {
        match ctx.lookup_current() {
            Some(span) => span.name() != TICK_SPAN_NAME,
            None => true,
        }
    }
}

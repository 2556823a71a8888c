//! The admin surface: a set of named operations an external transport (HTTP,
//! a CLI, a gRPC service — none of which lives in this workspace) exposes
//! over a running [`ixtrade_core::System`]. Every operation returns
//! [`AdminResult<T>`], which serializes as `{"ok": true, ...}` on success and
//! `{"ok": false, "error": "..."}` on failure, so a transport can forward the
//! payload verbatim without reshaping it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ixtrade_core::halt::HaltCause;
use ixtrade_markets::InstrumentToken;
use ixtrade_risk::OptimizerKeySnapshot;
use ixtrade_trader::{Trade, TradeState};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// `Ok(value)` serializes as `{"ok": true, ...value}`; `Err(e)` serializes as
/// `{"ok": false, "error": e}`. The actual `{"ok": ...}` envelope is a
/// transport-layer concern (untagged/flattened serialization, or a thin
/// wrapper struct) — this alias only fixes the Rust-side contract.
pub type AdminResult<T> = Result<T, AdminError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub ok: bool,
    pub halted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalHealthSnapshot {
    pub ok: bool,
    pub halted: bool,
    pub halt_cause: Option<HaltCause>,
    pub kill_switch_engaged: bool,
    pub open_trades: usize,
    pub recent_errors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub halted: bool,
    pub halt_cause: Option<HaltCause>,
    pub kill_switch_engaged: bool,
    pub open_trades: usize,
    pub trades_today: usize,
    pub as_of: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub token: InstrumentToken,
    pub mode: String,
}

/// The named operations spec §6's admin surface lists. Every method is
/// `async` since a real implementer reads through locks held by a running
/// [`ixtrade_core::System`] shared across tasks; no transport implements
/// this trait in this workspace — it exists so one can, without inventing
/// the contract.
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn health(&self) -> AdminResult<HealthSnapshot>;

    async fn critical_health(&self) -> AdminResult<CriticalHealthSnapshot>;

    async fn status(&self) -> AdminResult<EngineStatus>;

    /// Toggles the risk engine's kill switch; `on = true` blocks every new
    /// entry until toggled off again or cleared by [`Self::reset_halt`].
    async fn set_kill_switch(&self, on: bool) -> AdminResult<()>;

    /// Clears the process-wide HALT flag. Never touches the kill switch —
    /// that is a separate, explicit operation.
    async fn reset_halt(&self) -> AdminResult<()>;

    async fn recent_trades(&self, limit: usize) -> AdminResult<Vec<Trade>>;

    async fn subscriptions(&self) -> AdminResult<Vec<SubscriptionSnapshot>>;

    /// All state transitions a [`Trade`] with the given id has observed;
    /// `NotFound` if the trade is unknown to the store.
    async fn trade_state(&self, trade_id: &str) -> AdminResult<TradeState>;

    async fn optimizer_snapshot(&self) -> AdminResult<Vec<OptimizerKeySnapshot>>;

    /// Discards every persisted optimizer window/block and starts clean.
    async fn optimizer_reset(&self) -> AdminResult<()>;

    /// Reloads optimizer windows/blocks from whatever store backs them;
    /// a no-op for an in-memory-only deployment.
    async fn optimizer_reload(&self) -> AdminResult<()>;
}

//! Process-wide HALT flag with cause metadata and the error
//! bus every component reports to. Reset clears HALT but never the
//! kill-switch — the kill-switch is a [`RiskEngine`](ixtrade_risk)
//! concern, orthogonal to this bus.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaltCause {
    pub reason: String,
    pub component: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub code: String,
    pub component: String,
    pub detail: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct HaltState {
    cause: Option<HaltCause>,
}

/// Shared handle; clone freely, every clone observes the same state.
#[derive(Debug, Clone)]
pub struct HaltBus {
    state: Arc<RwLock<HaltState>>,
    reports: Arc<RwLock<Vec<ErrorReport>>>,
    max_reports: usize,
}

impl HaltBus {
    pub fn new(max_reports: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(HaltState::default())),
            reports: Arc::new(RwLock::new(Vec::new())),
            max_reports,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.state.read().cause.is_some()
    }

    pub fn cause(&self) -> Option<HaltCause> {
        self.state.read().cause.clone()
    }

    /// Sets HALT. Idempotent: the first cause to set HALT wins and is kept
    /// until an admin reset, so a cascade of downstream failures after the
    /// triggering one doesn't overwrite the original kill reason.
    pub fn halt(&self, component: impl Into<String>, reason: impl Into<String>) {
        let mut state = self.state.write();
        if state.cause.is_none() {
            state.cause = Some(HaltCause {
                reason: reason.into(),
                component: component.into(),
                at: Utc::now(),
            });
        }
    }

    /// Admin reset: clears HALT. Does not touch any kill-switch state held
    /// by the risk engine.
    pub fn reset(&self) {
        self.state.write().cause = None;
    }

    /// Every component reports here; never silently swallow an error.
    pub fn report(&self, code: impl Into<String>, component: impl Into<String>, detail: impl Into<String>) {
        let mut reports = self.reports.write();
        reports.push(ErrorReport {
            code: code.into(),
            component: component.into(),
            detail: detail.into(),
            at: Utc::now(),
        });
        let overflow = reports.len().saturating_sub(self.max_reports);
        if overflow > 0 {
            reports.drain(0..overflow);
        }
    }

    pub fn recent_reports(&self) -> Vec<ErrorReport> {
        self.reports.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_halt_cause_is_sticky() {
        let bus = HaltBus::new(10);
        bus.halt("broker", "auth_failed");
        bus.halt("risk", "unrelated");
        assert_eq!(bus.cause().unwrap().reason, "auth_failed");
    }

    #[test]
    fn reset_clears_halt() {
        let bus = HaltBus::new(10);
        bus.halt("broker", "auth_failed");
        bus.reset();
        assert!(!bus.is_halted());
    }

    #[test]
    fn reports_are_bounded() {
        let bus = HaltBus::new(2);
        bus.report("E1", "data", "x");
        bus.report("E2", "data", "y");
        bus.report("E3", "data", "z");
        let reports = bus.recent_reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].code, "E2");
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("transient broker error: {0}")]
    Transient(String),
    #[error("broker auth/session expired: {0}")]
    Auth(String),
    #[error("order rejected: {0}")]
    Rejected(String),
    #[error("broker request timed out")]
    Timeout,
    #[error("not connected to broker")]
    NotConnected,
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl ExecutionError {
    /// Whether a [`crate::retry::RetryingClient`] may retry the request that
    /// produced this error. Auth failures must surface immediately so the
    /// caller can trip HALT and re-establish the session instead of looping.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExecutionError::Transient(_) | ExecutionError::Timeout)
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("invalid trade state transition from {from:?} to {to:?}")]
    InvalidTransition { from: String, to: String },
    #[error("trade {0} not found")]
    NotFound(String),
    #[error("risk budget produced non-positive quantity for trade {0}")]
    NonPositiveQuantity(String),
    #[error("execution error: {0}")]
    Execution(#[from] ixtrade_execution::ExecutionError),
}

//! Central error type aggregating every subsystem's error enum, plus the
//! "receiver dropped" and task-join failures that only make sense at the
//! wiring layer.

use ixtrade_data::DataError;
use ixtrade_execution::ExecutionError;
use ixtrade_markets::InstrumentError;
use ixtrade_risk::RiskError;
use ixtrade_trader::TradeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("instrument error: {0}")]
    Instrument(#[from] InstrumentError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("risk error: {0}")]
    Risk(#[from] RiskError),

    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("trade error: {0}")]
    Trade(#[from] TradeError),

    #[error("config error: {0}")]
    Config(String),

    #[error("receiver dropped")]
    RxDropped,

    #[error("task join error: {0}")]
    JoinError(String),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for EngineError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::RxDropped
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::JoinError(format!("{value:?}"))
    }
}

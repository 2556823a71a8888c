use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("invalid market calendar time string: {0}")]
    InvalidCalendarTime(String),
}

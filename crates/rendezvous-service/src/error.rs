use rendezvous_core::appointment::InvalidTransition;
use rendezvous_core::error::CoreError;
use thiserror::Error;

/// Service layer errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<CoreError> for ServiceError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::InvalidSchedule(message) | CoreError::ConfigError(message) => {
                Self::InvalidSchedule(message)
            }
            CoreError::InvalidInput(message) => Self::InvalidRequest(message),
            CoreError::InvariantViolation(message) => Self::Unavailable(message.to_owned()),
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

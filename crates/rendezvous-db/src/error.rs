use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

/// Name of the exclusion constraint that keeps an agent's active appointments apart.
pub const NO_DOUBLE_BOOKING_CONSTRAINT: &str = "appointment_no_double_booking";

/// Database layer errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),

    #[error("Pool error: {0}")]
    PoolError(#[from] diesel_async::pooled_connection::bb8::RunError),

    #[error("Duplicate appointment id: {0}")]
    DuplicateKey(uuid::Uuid),

    #[error("Appointment not found: {0}")]
    MissingRow(uuid::Uuid),
}

impl DbError {
    /// ## Summary
    /// Whether retrying the same operation on a fresh transaction may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::PoolError(_) => true,
            Self::DatabaseError(DieselError::DatabaseError(kind, _)) => matches!(
                kind,
                DatabaseErrorKind::SerializationFailure | DatabaseErrorKind::ClosedConnection
            ),
            Self::DatabaseError(DieselError::BrokenTransactionManager) => true,
            _ => false,
        }
    }

    /// ## Summary
    /// Whether the write was rejected by the double-booking exclusion constraint.
    #[must_use]
    pub fn is_overlap(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(DieselError::DatabaseError(_, info))
                if info.constraint_name() == Some(NO_DOUBLE_BOOKING_CONSTRAINT)
        )
    }
}

pub type DbResult<T> = std::result::Result<T, DbError>;

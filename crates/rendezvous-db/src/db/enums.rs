//! Database enum types with Diesel serialization.
//!
//! Each enum implements `ToSql` and `FromSql` for automatic conversion between Rust and `PostgreSQL`.

use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use std::fmt;
use std::io::Write;

/// Appointment lifecycle state.
///
/// Maps to `appointment.status` CHECK constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
pub enum AppointmentStatus {
    Confirmed,
    Completed,
    Cancelled,
    Missed,
}

impl ToSql<Text, Pg> for AppointmentStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for AppointmentStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match bytes.as_bytes() {
            b"confirmed" => Ok(Self::Confirmed),
            b"completed" => Ok(Self::Completed),
            b"cancelled" => Ok(Self::Cancelled),
            b"missed" => Ok(Self::Missed),
            _ => Err("Unrecognized enum variant".into()),
        }
    }
}

impl AppointmentStatus {
    /// Returns the database string representation of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Missed => "missed",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AppointmentStatus> for rendezvous_core::appointment::AppointmentStatus {
    fn from(db_status: AppointmentStatus) -> Self {
        match db_status {
            AppointmentStatus::Confirmed => Self::Confirmed,
            AppointmentStatus::Completed => Self::Completed,
            AppointmentStatus::Cancelled => Self::Cancelled,
            AppointmentStatus::Missed => Self::Missed,
        }
    }
}

impl From<rendezvous_core::appointment::AppointmentStatus> for AppointmentStatus {
    fn from(status: rendezvous_core::appointment::AppointmentStatus) -> Self {
        use rendezvous_core::appointment::AppointmentStatus as Core;
        match status {
            Core::Confirmed => Self::Confirmed,
            Core::Completed => Self::Completed,
            Core::Cancelled => Self::Cancelled,
            Core::Missed => Self::Missed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rendezvous_core::appointment::AppointmentStatus as Core;

    #[test]
    fn test_db_strings_match_core_strings() {
        for status in [Core::Confirmed, Core::Completed, Core::Cancelled, Core::Missed] {
            let db = AppointmentStatus::from(status);
            assert_eq!(db.as_str(), status.as_str());
            assert_eq!(Core::from(db), status);
        }
    }
}

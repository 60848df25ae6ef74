use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::{pg::Pg, prelude::*};

use crate::db::{enums::AppointmentStatus, schema};
use rendezvous_core::appointment::Appointment;

/// One row of the `appointment` table.
#[derive(
    Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Insertable, AsChangeset,
)]
#[diesel(table_name = schema::appointment)]
#[diesel(check_for_backend(Pg))]
#[diesel(treat_none_as_null = true)]
pub struct AppointmentRow {
    pub id: uuid::Uuid,
    pub organization_id: uuid::Uuid,
    pub service_id: uuid::Uuid,
    pub agent_id: uuid::Uuid,
    pub attendee_id: uuid::Uuid,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub rescheduled_from_id: Option<uuid::Uuid>,
}

impl From<&Appointment> for AppointmentRow {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id,
            organization_id: appointment.organization_id,
            service_id: appointment.service_id,
            agent_id: appointment.agent_id,
            attendee_id: appointment.attendee_id,
            appointment_date: appointment.date,
            start_time: appointment.start_time,
            end_time: appointment.end_time,
            status: appointment.status.into(),
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
            cancelled_at: appointment.cancelled_at,
            cancel_reason: appointment.cancel_reason.clone(),
            rescheduled_from_id: appointment.rescheduled_from_id,
        }
    }
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Self {
            id: row.id,
            organization_id: row.organization_id,
            service_id: row.service_id,
            agent_id: row.agent_id,
            attendee_id: row.attendee_id,
            date: row.appointment_date,
            start_time: row.start_time,
            end_time: row.end_time,
            status: row.status.into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
            cancelled_at: row.cancelled_at,
            cancel_reason: row.cancel_reason,
            rescheduled_from_id: row.rescheduled_from_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use rendezvous_core::appointment::NewAppointment;
    use rendezvous_core::interval::Interval;

    use super::*;

    #[test]
    fn test_row_conversion_preserves_every_field() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let start = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let mut appointment = Appointment::confirm(
            NewAppointment {
                organization_id: uuid::Uuid::new_v4(),
                service_id: uuid::Uuid::new_v4(),
                agent_id: uuid::Uuid::new_v4(),
                attendee_id: uuid::Uuid::new_v4(),
                interval: Interval::starting_at(date, start, TimeDelta::minutes(45)).unwrap(),
                rescheduled_from_id: Some(uuid::Uuid::new_v4()),
            },
            Utc::now(),
        );
        appointment.cancel_reason = Some("weather".to_string());
        appointment.cancelled_at = Some(Utc::now());

        let row = AppointmentRow::from(&appointment);
        assert_eq!(row.appointment_date, date);
        assert_eq!(row.status, AppointmentStatus::Confirmed);
        assert_eq!(Appointment::from(row), appointment);
    }
}

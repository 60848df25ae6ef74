use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use rendezvous_core::interval::Interval;
use rendezvous_service::engine::{BookingRequest, RescheduleRequest};

use crate::error::AppResult;

/// ## Summary
/// POST /appointments payload. Times are local to the organization.
#[derive(Debug, Deserialize)]
pub struct BookAppointmentBody {
    pub organization_id: Uuid,
    pub service_id: Uuid,
    pub attendee_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub preferred_agent_id: Option<Uuid>,
    pub country_code: Option<String>,
}

impl BookAppointmentBody {
    /// ## Errors
    /// `InvalidInput` if the end is not after the start.
    pub fn into_request(self, now: DateTime<Utc>) -> AppResult<BookingRequest> {
        Ok(BookingRequest {
            organization_id: self.organization_id,
            service_id: self.service_id,
            attendee_id: self.attendee_id,
            interval: Interval::new(self.date, self.start_time, self.end_time)?,
            preferred_agent_id: self.preferred_agent_id,
            country_code: self.country_code,
            not_before: Some(now),
        })
    }
}

/// POST /appointments/{id}/reschedule payload.
#[derive(Debug, Deserialize)]
pub struct RescheduleBody {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub agent_id: Option<Uuid>,
    pub country_code: Option<String>,
}

impl RescheduleBody {
    /// ## Errors
    /// `InvalidInput` if the end is not after the start.
    pub fn into_request(
        self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<RescheduleRequest> {
        Ok(RescheduleRequest {
            appointment_id,
            interval: Interval::new(self.date, self.start_time, self.end_time)?,
            agent_id: self.agent_id,
            country_code: self.country_code,
            not_before: Some(now),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelBody {
    pub reason: Option<String>,
}

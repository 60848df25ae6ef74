//! Booking a slot.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use rendezvous_core::appointment::{Appointment, NewAppointment};
use rendezvous_core::event::DomainEvent;
use rendezvous_core::interval::Interval;
use rendezvous_core::schedule::Schedule;
use rendezvous_core::types::CalendarScope;

use super::{Attempt, SchedulingEngine, Staged};
use crate::availability;
use crate::conflict;
use crate::directory::ServiceInfo;
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub organization_id: Uuid,
    pub service_id: Uuid,
    pub attendee_id: Uuid,
    pub interval: Interval,
    /// Book with this agent or not at all.
    pub preferred_agent_id: Option<Uuid>,
    /// Selects a country-specific schedule when the organization has one.
    pub country_code: Option<String>,
    /// Refuse intervals starting before this instant.
    pub not_before: Option<DateTime<Utc>>,
}

impl SchedulingEngine {
    /// ## Summary
    /// Books `request.interval` for the attendee.
    ///
    /// Without a preferred agent the first qualified agent, by ascending id,
    /// whose calendar is free is chosen. Each candidate's calendar for the day
    /// is re-read and checked inside a transaction holding that agent's scope,
    /// so two concurrent bookings can never both win the same agent and time.
    ///
    /// ## Side Effects
    /// Publishes `AppointmentBooked` after the appointment is stored.
    ///
    /// ## Errors
    /// - `InvalidRequest` if the interval is not one of the service's tiles
    ///   on that date, starts before `request.not_before`, or the preferred
    ///   agent is not qualified
    /// - `SlotUnavailable` if no candidate agent is free
    /// - `NotFound` for unknown organizations or services
    /// - `Unavailable` if the store keeps failing
    #[tracing::instrument(skip(self, request), fields(
        organization_id = %request.organization_id,
        service_id = %request.service_id,
        attendee_id = %request.attendee_id,
        interval = %request.interval,
        preferred_agent_id = ?request.preferred_agent_id
    ))]
    pub async fn book(&self, request: &BookingRequest) -> ServiceResult<Appointment> {
        tracing::debug!("Processing booking");

        let service = self
            .directory
            .service(request.service_id, request.organization_id)
            .await?;
        let organization = self
            .schedules
            .schedule_for(request.organization_id, request.country_code.as_deref())
            .await?;
        validate_tile(&organization.schedule, &service, &request.interval)?;
        ensure_not_before(request.not_before, organization.timezone, &request.interval)?;

        let candidates = candidate_agents(&service, request.preferred_agent_id)?;
        let candidates = candidates.as_slice();
        tracing::trace!(candidates = candidates.len(), "Booking candidates resolved");

        let appointment = self
            .guarded_write("book", || self.try_book(request, candidates))
            .await?;

        tracing::info!(
            appointment_id = %appointment.id,
            agent_id = %appointment.agent_id,
            "Appointment booked"
        );
        self.publish(DomainEvent::AppointmentBooked {
            appointment: appointment.clone(),
        });
        Ok(appointment)
    }

    async fn try_book(
        &self,
        request: &BookingRequest,
        candidates: &[Uuid],
    ) -> Attempt<Staged<Appointment>> {
        let date = request.interval.date();

        for &agent_id in candidates {
            let scope = [CalendarScope::new(agent_id, date)];
            let mut tx = self.store.begin(&scope).await?;

            let calendar = tx.active_for_agent_on(agent_id, date).await?;
            if let Some(existing) = conflict::first_conflict(&request.interval, &calendar, None) {
                tracing::debug!(
                    %agent_id,
                    conflicting_id = %existing.id,
                    "Agent is busy, trying next candidate"
                );
                tx.rollback().await?;
                continue;
            }

            let appointment = Appointment::confirm(
                NewAppointment {
                    organization_id: request.organization_id,
                    service_id: request.service_id,
                    agent_id,
                    attendee_id: request.attendee_id,
                    interval: request.interval,
                    rescheduled_from_id: None,
                },
                Utc::now(),
            );
            tx.insert(&appointment).await?;
            return Ok(Staged::new(tx, appointment));
        }

        tracing::warn!("No candidate agent is free for the requested slot");
        Err(ServiceError::SlotUnavailable(format!(
            "no agent is free for {}",
            request.interval
        ))
        .into())
    }
}

/// ## Summary
/// Rejects intervals the schedule would never have offered for `service`.
///
/// ## Errors
/// `InvalidRequest` on a duration mismatch, a closed day or an off-grid start.
pub(super) fn validate_tile(
    schedule: &Schedule,
    service: &ServiceInfo,
    interval: &Interval,
) -> ServiceResult<()> {
    if interval.duration() != service.duration {
        tracing::warn!(%interval, "Interval length does not match the service");
        return Err(ServiceError::InvalidRequest(format!(
            "interval {interval} lasts {} minutes, the service takes {}",
            interval.duration().num_minutes(),
            service.duration.num_minutes()
        )));
    }
    if !availability::is_tile(schedule, service.duration, interval) {
        tracing::warn!(%interval, "Interval is not an offered slot");
        return Err(ServiceError::InvalidRequest(format!(
            "interval {interval} is not an offered slot"
        )));
    }
    Ok(())
}

/// ## Summary
/// Rejects intervals that start before `not_before`, compared in the
/// organization's local time.
///
/// ## Errors
/// `InvalidRequest` for an interval that has already started.
pub(super) fn ensure_not_before(
    not_before: Option<DateTime<Utc>>,
    timezone: Tz,
    interval: &Interval,
) -> ServiceResult<()> {
    let Some(earliest) = not_before.map(|instant| instant.with_timezone(&timezone).naive_local())
    else {
        return Ok(());
    };
    if interval.start() < earliest {
        tracing::warn!(%interval, %earliest, "Interval is in the past");
        return Err(ServiceError::InvalidRequest(format!(
            "interval {interval} starts in the past"
        )));
    }
    Ok(())
}

/// ## Summary
/// Agents to try, in order.
///
/// ## Errors
/// `InvalidRequest` if `preferred` is not qualified for the service,
/// `SlotUnavailable` if nobody is.
pub(super) fn candidate_agents(
    service: &ServiceInfo,
    preferred: Option<Uuid>,
) -> ServiceResult<Vec<Uuid>> {
    match preferred {
        Some(agent_id) if service.is_qualified(agent_id) => Ok(vec![agent_id]),
        Some(agent_id) => {
            tracing::warn!(%agent_id, "Requested agent is not qualified");
            Err(ServiceError::InvalidRequest(format!(
                "agent {agent_id} is not qualified for service {}",
                service.service_id
            )))
        }
        None if service.qualified_agent_ids.is_empty() => Err(ServiceError::SlotUnavailable(
            format!("no agent is qualified for service {}", service.service_id),
        )),
        None => Ok(service.qualified_agent_ids.clone()),
    }
}

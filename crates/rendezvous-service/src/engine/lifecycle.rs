//! Transitions of booked appointments.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use rendezvous_core::appointment::{Appointment, InvalidTransition, LifecycleAction, NewAppointment};
use rendezvous_core::event::DomainEvent;
use rendezvous_core::interval::Interval;
use rendezvous_core::types::CalendarScope;

use super::booking::{candidate_agents, ensure_not_before, validate_tile};
use super::{Attempt, SchedulingEngine, Staged};
use crate::conflict;
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct RescheduleRequest {
    pub appointment_id: Uuid,
    pub interval: Interval,
    /// Move to this agent; otherwise the first free qualified agent by id.
    pub agent_id: Option<Uuid>,
    pub country_code: Option<String>,
    /// Refuse new intervals starting before this instant.
    pub not_before: Option<DateTime<Utc>>,
}

impl SchedulingEngine {
    /// ## Summary
    /// Cancels a confirmed appointment, freeing its interval immediately.
    ///
    /// ## Errors
    /// `NotFound` for unknown ids, `InvalidTransition` unless the appointment
    /// is `CONFIRMED`.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        reason: Option<&str>,
    ) -> ServiceResult<Appointment> {
        self.apply(appointment_id, LifecycleAction::Cancel, None, reason, |appointment| {
            DomainEvent::AppointmentCancelled { appointment }
        })
        .await
    }

    /// ## Summary
    /// Records that the appointment took place.
    ///
    /// ## Errors
    /// `Unauthorized` unless `actor_id` is the assigned agent,
    /// `InvalidTransition` unless the appointment is `CONFIRMED`.
    #[tracing::instrument(skip(self))]
    pub async fn complete(
        &self,
        appointment_id: Uuid,
        actor_id: Uuid,
    ) -> ServiceResult<Appointment> {
        self.apply(
            appointment_id,
            LifecycleAction::Complete,
            Some(actor_id),
            None,
            |appointment| DomainEvent::AppointmentCompleted { appointment },
        )
        .await
    }

    /// ## Summary
    /// Records that the attendee did not show up.
    ///
    /// ## Errors
    /// Same as [`SchedulingEngine::complete`].
    #[tracing::instrument(skip(self))]
    pub async fn mark_missed(
        &self,
        appointment_id: Uuid,
        actor_id: Uuid,
    ) -> ServiceResult<Appointment> {
        self.apply(
            appointment_id,
            LifecycleAction::MarkMissed,
            Some(actor_id),
            None,
            |appointment| DomainEvent::AppointmentMissed { appointment },
        )
        .await
    }

    /// ## Summary
    /// Moves a confirmed appointment to a new slot.
    ///
    /// The replacement is booked under the same re-check as a fresh booking,
    /// ignoring the appointment being replaced. The old appointment is
    /// cancelled with reason `rescheduled` in the same transaction, which holds
    /// the scopes of both the old and the new `(agent, day)`. On any failure
    /// the old appointment is left exactly as it was.
    ///
    /// ## Side Effects
    /// Publishes `AppointmentRescheduled` with both appointments.
    ///
    /// ## Errors
    /// - `NotFound` for unknown ids
    /// - `InvalidTransition` unless the appointment is `CONFIRMED`
    /// - `InvalidRequest` for an off-grid or past interval, or an unqualified
    ///   agent
    /// - `SlotUnavailable` if no candidate agent is free
    #[tracing::instrument(skip(self, request), fields(
        appointment_id = %request.appointment_id,
        interval = %request.interval,
        agent_id = ?request.agent_id
    ))]
    pub async fn reschedule(&self, request: &RescheduleRequest) -> ServiceResult<Appointment> {
        tracing::debug!("Processing reschedule");

        let current = self.get_appointment(request.appointment_id).await?;
        ensure_confirmed(&current, LifecycleAction::Reschedule)?;

        let service = self
            .directory
            .service(current.service_id, current.organization_id)
            .await?;
        let organization = self
            .schedules
            .schedule_for(current.organization_id, request.country_code.as_deref())
            .await?;
        validate_tile(&organization.schedule, &service, &request.interval)?;
        ensure_not_before(request.not_before, organization.timezone, &request.interval)?;

        let candidates = candidate_agents(&service, request.agent_id)?;
        let candidates = candidates.as_slice();
        let current = &current;

        let (previous, replacement) = self
            .guarded_write("reschedule", || {
                self.try_reschedule(current, request.interval, candidates)
            })
            .await?;

        tracing::info!(
            replacement_id = %replacement.id,
            agent_id = %replacement.agent_id,
            "Appointment rescheduled"
        );
        self.publish(DomainEvent::AppointmentRescheduled {
            previous,
            replacement: replacement.clone(),
        });
        Ok(replacement)
    }

    async fn try_reschedule(
        &self,
        current: &Appointment,
        interval: Interval,
        candidates: &[Uuid],
    ) -> Attempt<Staged<(Appointment, Appointment)>> {
        let date = interval.date();

        for &agent_id in candidates {
            let scopes = [current.scope(), CalendarScope::new(agent_id, date)];
            let mut tx = self.store.begin(&scopes).await?;

            let mut previous = tx
                .get(current.id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("appointment {}", current.id)))?;
            let now = Utc::now();
            previous.transition(LifecycleAction::Reschedule, now, None)?;

            let calendar = tx.active_for_agent_on(agent_id, date).await?;
            let conflicting = conflict::first_conflict(&interval, &calendar, Some(current.id));
            if let Some(existing) = conflicting {
                tracing::debug!(
                    %agent_id,
                    conflicting_id = %existing.id,
                    "Agent is busy, trying next candidate"
                );
                tx.rollback().await?;
                continue;
            }

            let replacement = Appointment::confirm(
                NewAppointment {
                    organization_id: previous.organization_id,
                    service_id: previous.service_id,
                    agent_id,
                    attendee_id: previous.attendee_id,
                    interval,
                    rescheduled_from_id: Some(previous.id),
                },
                now,
            );
            // The old interval must be released before the new one is claimed.
            tx.update(&previous).await?;
            tx.insert(&replacement).await?;
            return Ok(Staged::new(tx, (previous, replacement)));
        }

        tracing::warn!("No candidate agent is free for the new slot");
        Err(ServiceError::SlotUnavailable(format!("no agent is free for {interval}")).into())
    }

    async fn apply(
        &self,
        appointment_id: Uuid,
        action: LifecycleAction,
        actor_id: Option<Uuid>,
        reason: Option<&str>,
        announce: fn(Appointment) -> DomainEvent,
    ) -> ServiceResult<Appointment> {
        let current = self.get_appointment(appointment_id).await?;
        if let Some(actor_id) = actor_id.filter(|actor_id| *actor_id != current.agent_id) {
            tracing::warn!(
                %actor_id,
                agent_id = %current.agent_id,
                "Actor is not the assigned agent"
            );
            return Err(ServiceError::Unauthorized(format!(
                "only the assigned agent may {action} appointment {appointment_id}"
            )));
        }
        ensure_confirmed(&current, action)?;

        let scope = [current.scope()];
        let scope = scope.as_slice();
        let updated = self
            .guarded_write(action.as_str(), || {
                self.try_transition(appointment_id, scope, action, reason)
            })
            .await?;

        tracing::info!(status = %updated.status, "Appointment transitioned");
        self.publish(announce(updated.clone()));
        Ok(updated)
    }

    async fn try_transition(
        &self,
        appointment_id: Uuid,
        scope: &[CalendarScope],
        action: LifecycleAction,
        reason: Option<&str>,
    ) -> Attempt<Staged<Appointment>> {
        let mut tx = self.store.begin(scope).await?;
        let mut appointment = tx
            .get(appointment_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("appointment {appointment_id}")))?;
        appointment.transition(action, Utc::now(), reason)?;
        tx.update(&appointment).await?;
        Ok(Staged::new(tx, appointment))
    }
}

/// Fails fast before any lock is taken; the transaction re-checks.
fn ensure_confirmed(appointment: &Appointment, action: LifecycleAction) -> ServiceResult<()> {
    if appointment.status.is_terminal() {
        tracing::warn!(status = %appointment.status, %action, "Appointment is already final");
        return Err(InvalidTransition {
            appointment_id: appointment.id,
            from: appointment.status,
            action,
        }
        .into());
    }
    Ok(())
}

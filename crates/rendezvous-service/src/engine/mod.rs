//! The scheduling engine.
//!
//! [`SchedulingEngine`] ties reference data, the appointment store and the
//! event sink together. Listing slots is read only. Booking and lifecycle
//! mutations re-check the agent's calendar inside a store transaction that
//! holds the affected `(agent, day)` scopes, and publish an event once the
//! transaction has committed.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use rendezvous_core::appointment::{Appointment, InvalidTransition};
use rendezvous_core::config::BookingConfig;
use rendezvous_core::event::DomainEvent;
use rendezvous_core::interval::DateRange;
use rendezvous_db::db::{AppointmentStore, StoreTx};
use rendezvous_db::error::DbError;

use crate::availability::{AgentCalendars, Slots, generate_slots};
use crate::directory::{ScheduleSource, ServiceDirectory};
use crate::error::{ServiceError, ServiceResult};
use crate::events::EventSink;

mod booking;
mod lifecycle;

pub use booking::BookingRequest;
pub use lifecycle::RescheduleRequest;

/// Why one attempt of a guarded operation did not produce a value.
#[derive(Debug)]
enum Failure {
    /// A final answer for the caller; never retried.
    Rejected(ServiceError),
    Store(DbError),
}

impl From<ServiceError> for Failure {
    fn from(error: ServiceError) -> Self {
        Self::Rejected(error)
    }
}

impl From<InvalidTransition> for Failure {
    fn from(error: InvalidTransition) -> Self {
        Self::Rejected(error.into())
    }
}

impl From<DbError> for Failure {
    fn from(error: DbError) -> Self {
        Self::Store(error)
    }
}

type Attempt<T> = Result<T, Failure>;

#[derive(Debug, Clone)]
pub struct SlotQuery {
    pub organization_id: Uuid,
    pub service_id: Uuid,
    pub range: DateRange,
    pub country_code: Option<String>,
    /// Hide everything that starts before this instant. The range is clamped
    /// to the organization's local date of it first.
    pub not_before: Option<DateTime<Utc>>,
}

/// Generated slots plus the time zone their local times are expressed in.
#[derive(Debug, Clone)]
pub struct SlotListing {
    pub timezone: Tz,
    pub slots: Slots,
}

#[derive(Clone)]
pub struct SchedulingEngine {
    schedules: Arc<dyn ScheduleSource>,
    directory: Arc<dyn ServiceDirectory>,
    store: Arc<dyn AppointmentStore>,
    events: Arc<dyn EventSink>,
    booking: BookingConfig,
}

impl SchedulingEngine {
    #[must_use]
    pub fn new(
        schedules: Arc<dyn ScheduleSource>,
        directory: Arc<dyn ServiceDirectory>,
        store: Arc<dyn AppointmentStore>,
        events: Arc<dyn EventSink>,
        booking: BookingConfig,
    ) -> Self {
        Self {
            schedules,
            directory,
            store,
            events,
            booking,
        }
    }

    /// ## Summary
    /// Lists every tile of `query.range` with the qualified agents free for
    /// it, or only those not before `query.not_before` when it is set.
    ///
    /// ## Errors
    /// `InvalidRequest` for ranges longer than `booking.max_range_days`
    /// after clamping,
    /// `NotFound` for unknown organizations or services, `InvalidSchedule`
    /// for malformed reference data and `Unavailable` when the store cannot
    /// be read.
    #[tracing::instrument(skip(self, query), fields(
        organization_id = %query.organization_id,
        service_id = %query.service_id,
        from = %query.range.start(),
        to = %query.range.end(),
        country_code = ?query.country_code
    ))]
    pub async fn list_available_slots(&self, query: &SlotQuery) -> ServiceResult<SlotListing> {
        let organization = self
            .schedules
            .schedule_for(query.organization_id, query.country_code.as_deref())
            .await?;

        let earliest = query
            .not_before
            .map(|instant| instant.with_timezone(&organization.timezone).naive_local());
        let range = earliest.map_or(query.range, |earliest| {
            query.range.starting_no_earlier_than(earliest.date())
        });
        self.check_range(range)?;

        let service = self
            .directory
            .service(query.service_id, query.organization_id)
            .await?;

        let agent_ids = service.qualified_agent_ids.as_slice();
        let appointments = self
            .guarded("list_available_slots", || async move {
                Ok::<_, Failure>(self.store.active_for_agents(agent_ids, range).await?)
            })
            .await?;
        tracing::debug!(
            agents = agent_ids.len(),
            appointments = appointments.len(),
            "Agent calendars loaded"
        );

        let mut calendars: AgentCalendars =
            agent_ids.iter().map(|agent_id| (*agent_id, Vec::new())).collect();
        for appointment in appointments {
            if let Some(calendar) = calendars.get_mut(&appointment.agent_id) {
                calendar.push(appointment);
            }
        }

        let mut slots = generate_slots(
            Arc::new(organization.schedule),
            service.duration,
            Arc::new(calendars),
            range,
        )?;
        if let Some(earliest) = earliest {
            slots = slots.not_before(earliest);
        }
        Ok(SlotListing {
            timezone: organization.timezone,
            slots,
        })
    }

    /// ## Errors
    /// `NotFound` if no appointment has this id.
    #[tracing::instrument(skip(self))]
    pub async fn get_appointment(&self, appointment_id: Uuid) -> ServiceResult<Appointment> {
        self.guarded("get_appointment", || async move {
            Ok::<_, Failure>(self.store.get(appointment_id).await?)
        })
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("appointment {appointment_id}")))
    }

    /// Every appointment `agent_id` hosts in `range`, in any state.
    ///
    /// ## Errors
    /// `InvalidRequest` for oversized ranges, `Unavailable` on store failure.
    #[tracing::instrument(skip(self), fields(from = %range.start(), to = %range.end()))]
    pub async fn agent_calendar(
        &self,
        agent_id: Uuid,
        range: DateRange,
    ) -> ServiceResult<Vec<Appointment>> {
        self.check_range(range)?;
        self.guarded("agent_calendar", || async move {
            Ok::<_, Failure>(self.store.for_agent(agent_id, range).await?)
        })
        .await
    }

    /// Every appointment at `organization_id` in `range`, in any state.
    ///
    /// ## Errors
    /// `InvalidRequest` for oversized ranges, `Unavailable` on store failure.
    #[tracing::instrument(skip(self), fields(from = %range.start(), to = %range.end()))]
    pub async fn organization_appointments(
        &self,
        organization_id: Uuid,
        range: DateRange,
    ) -> ServiceResult<Vec<Appointment>> {
        self.check_range(range)?;
        self.guarded("organization_appointments", || async move {
            Ok::<_, Failure>(self.store.for_organization(organization_id, range).await?)
        })
        .await
    }

    /// ## Summary
    /// The appointment and every appointment it replaced, newest first.
    ///
    /// ## Errors
    /// `NotFound` if `appointment_id` is unknown.
    #[tracing::instrument(skip(self))]
    pub async fn reschedule_chain(&self, appointment_id: Uuid) -> ServiceResult<Vec<Appointment>> {
        let mut chain = vec![self.get_appointment(appointment_id).await?];
        let mut seen = HashSet::from([appointment_id]);

        while let Some(previous_id) = chain.last().and_then(|a| a.rescheduled_from_id) {
            if !seen.insert(previous_id) {
                tracing::error!(%previous_id, "Reschedule chain loops");
                break;
            }
            match self.get_appointment(previous_id).await {
                Ok(previous) => chain.push(previous),
                Err(ServiceError::NotFound(_)) => {
                    tracing::warn!(
                        %previous_id,
                        "Reschedule chain references a missing appointment"
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::debug!(length = chain.len(), "Reschedule chain resolved");
        Ok(chain)
    }

    fn check_range(&self, range: DateRange) -> ServiceResult<()> {
        let max = i64::from(self.booking.max_range_days);
        if range.num_days() > max {
            tracing::warn!(days = range.num_days(), max, "Date range too long");
            return Err(ServiceError::InvalidRequest(format!(
                "date range spans {} days, at most {max} allowed",
                range.num_days()
            )));
        }
        Ok(())
    }

    fn publish(&self, event: DomainEvent) {
        self.events.publish(event);
    }

    /// ## Summary
    /// Runs `attempt` under the configured timeout.
    ///
    /// Rejections are returned as they are. A transient store failure or a
    /// timeout is retried once; any other store failure, or a second one,
    /// becomes `Unavailable`. A write refused by the store's own overlap
    /// check becomes `SlotUnavailable`. An attempt that is cut off by the
    /// timeout drops its transaction, which rolls it back.
    async fn guarded<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> ServiceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let mut retried = false;
        loop {
            let outcome = tokio::time::timeout(self.booking.timeout(), attempt()).await;
            let (transient, cause) = match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(Failure::Rejected(error))) => return Err(error),
                Ok(Err(Failure::Store(error))) if error.is_overlap() => {
                    return Err(slot_taken(operation, &error));
                }
                Ok(Err(Failure::Store(error))) => (error.is_transient(), error.to_string()),
                Err(_) => (
                    true,
                    format!("timed out after {} ms", self.booking.timeout_ms),
                ),
            };

            if transient && !retried {
                tracing::warn!(operation, cause = %cause, "Transient store failure, retrying once");
                retried = true;
                continue;
            }

            tracing::error!(operation, cause = %cause, "Store failure");
            return Err(unavailable(operation));
        }
    }

    /// ## Summary
    /// Runs `attempt` like [`SchedulingEngine::guarded`] up to the point where
    /// its writes are staged, then commits them exactly once.
    ///
    /// A commit that fails or outlives the timeout may still have been applied
    /// by the store, so it is reported as `Unavailable` and never retried.
    async fn guarded_write<T, F, Fut>(
        &self,
        operation: &'static str,
        attempt: F,
    ) -> ServiceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<Staged<T>>>,
    {
        let Staged { tx, value } = self.guarded(operation, attempt).await?;
        match tokio::time::timeout(self.booking.timeout(), tx.commit()).await {
            Ok(Ok(())) => Ok(value),
            Ok(Err(error)) if error.is_overlap() => Err(slot_taken(operation, &error)),
            Ok(Err(error)) => {
                tracing::error!(operation, error = %error, "Commit failed");
                Err(unavailable(operation))
            }
            Err(_) => {
                tracing::error!(
                    operation,
                    timeout_ms = self.booking.timeout_ms,
                    "Commit timed out, outcome unknown"
                );
                Err(unavailable(operation))
            }
        }
    }
}

/// Writes of one attempt, held in an open transaction until committed.
struct Staged<T> {
    tx: Box<dyn StoreTx>,
    value: T,
}

impl<T> Staged<T> {
    fn new(tx: Box<dyn StoreTx>, value: T) -> Self {
        Self { tx, value }
    }
}

fn slot_taken(operation: &'static str, error: &DbError) -> ServiceError {
    tracing::warn!(
        operation,
        error = %error,
        "Store refused an overlapping appointment"
    );
    ServiceError::SlotUnavailable("the slot was taken by a concurrent booking".to_owned())
}

/// Store details stay in the log; callers only learn which operation failed.
fn unavailable(operation: &'static str) -> ServiceError {
    ServiceError::Unavailable(format!("{operation}: storage temporarily unavailable"))
}

#[cfg(test)]
mod test_support;

//! Query builder functions for appointments.

use chrono::NaiveDate;
use diesel::prelude::*;

use crate::db::enums::AppointmentStatus;
use crate::db::schema::appointment;

/// ## Summary
/// Returns a query to select all appointments.
#[must_use]
pub fn all() -> appointment::BoxedQuery<'static, diesel::pg::Pg> {
    appointment::table.into_boxed()
}

/// ## Summary
/// Returns a query to find an appointment by ID.
#[must_use]
pub fn by_id(id: uuid::Uuid) -> appointment::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(appointment::id.eq(id))
}

/// ## Summary
/// Returns a query to find appointments that still occupy an agent's calendar.
#[must_use]
pub fn active() -> appointment::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(appointment::status.ne(AppointmentStatus::Cancelled))
}

/// ## Summary
/// Returns a query for one agent's active appointments on one day, by start time.
#[must_use]
pub fn active_for_agent_on(
    agent_id: uuid::Uuid,
    date: NaiveDate,
) -> appointment::BoxedQuery<'static, diesel::pg::Pg> {
    active()
        .filter(appointment::agent_id.eq(agent_id))
        .filter(appointment::appointment_date.eq(date))
        .order(appointment::start_time.asc())
}

/// ## Summary
/// Returns a query for the active appointments of several agents in `[from, to)`.
#[must_use]
pub fn active_for_agents_between(
    agent_ids: &[uuid::Uuid],
    from: NaiveDate,
    to: NaiveDate,
) -> appointment::BoxedQuery<'static, diesel::pg::Pg> {
    active()
        .filter(appointment::agent_id.eq_any(agent_ids.to_vec()))
        .filter(appointment::appointment_date.ge(from))
        .filter(appointment::appointment_date.lt(to))
        .order((
            appointment::appointment_date.asc(),
            appointment::start_time.asc(),
        ))
}

/// ## Summary
/// Returns a query for every appointment an agent hosts in `[from, to)`.
#[must_use]
pub fn for_agent_between(
    agent_id: uuid::Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> appointment::BoxedQuery<'static, diesel::pg::Pg> {
    all()
        .filter(appointment::agent_id.eq(agent_id))
        .filter(appointment::appointment_date.ge(from))
        .filter(appointment::appointment_date.lt(to))
        .order((
            appointment::appointment_date.asc(),
            appointment::start_time.asc(),
        ))
}

/// ## Summary
/// Returns a query for every appointment at an organization in `[from, to)`.
#[must_use]
pub fn for_organization_between(
    organization_id: uuid::Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> appointment::BoxedQuery<'static, diesel::pg::Pg> {
    all()
        .filter(appointment::organization_id.eq(organization_id))
        .filter(appointment::appointment_date.ge(from))
        .filter(appointment::appointment_date.lt(to))
        .order((
            appointment::appointment_date.asc(),
            appointment::start_time.asc(),
        ))
}

#[cfg(test)]
#[path = "appointment_tests.rs"]
mod tests;

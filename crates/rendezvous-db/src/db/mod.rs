use chrono::NaiveDate;
use futures::future::BoxFuture;
use uuid::Uuid;

use rendezvous_core::appointment::Appointment;
use rendezvous_core::interval::DateRange;
use rendezvous_core::types::CalendarScope;

use crate::error::DbResult;

pub mod connection;
pub mod enums;
pub mod memory;
pub mod migrate;
pub mod postgres;
pub mod query;
pub mod schema;
pub mod transaction;

/// ## Summary
/// The authoritative appointment store.
///
/// Reads outside a transaction see committed data only. Every mutation goes
/// through [`AppointmentStore::begin`], which returns once exclusive locks on
/// all requested [`CalendarScope`]s are held.
pub trait AppointmentStore: Send + Sync {
    /// Opens a transaction holding exclusive locks on `scopes`.
    fn begin<'a>(
        &'a self,
        scopes: &'a [CalendarScope],
    ) -> BoxFuture<'a, DbResult<Box<dyn StoreTx>>>;

    fn get(&self, id: Uuid) -> BoxFuture<'_, DbResult<Option<Appointment>>>;

    /// Active appointments hosted by any of `agent_ids` within `range`.
    fn active_for_agents<'a>(
        &'a self,
        agent_ids: &'a [Uuid],
        range: DateRange,
    ) -> BoxFuture<'a, DbResult<Vec<Appointment>>>;

    /// Every appointment hosted by `agent_id` within `range`, in any state.
    fn for_agent(
        &self,
        agent_id: Uuid,
        range: DateRange,
    ) -> BoxFuture<'_, DbResult<Vec<Appointment>>>;

    /// Every appointment at `organization_id` within `range`, in any state.
    fn for_organization(
        &self,
        organization_id: Uuid,
        range: DateRange,
    ) -> BoxFuture<'_, DbResult<Vec<Appointment>>>;
}

/// ## Summary
/// An open store transaction.
///
/// Dropping a transaction without calling [`StoreTx::commit`] discards all of
/// its writes and releases its locks.
pub trait StoreTx: Send {
    fn get(&mut self, id: Uuid) -> BoxFuture<'_, DbResult<Option<Appointment>>>;

    /// Active appointments of `agent_id` on `date`, ordered by start time.
    fn active_for_agent_on(
        &mut self,
        agent_id: Uuid,
        date: NaiveDate,
    ) -> BoxFuture<'_, DbResult<Vec<Appointment>>>;

    fn insert<'a>(&'a mut self, appointment: &'a Appointment) -> BoxFuture<'a, DbResult<()>>;

    fn update<'a>(&'a mut self, appointment: &'a Appointment) -> BoxFuture<'a, DbResult<()>>;

    fn commit(self: Box<Self>) -> BoxFuture<'static, DbResult<()>>;

    fn rollback(self: Box<Self>) -> BoxFuture<'static, DbResult<()>>;
}

/// Orders appointments the way every listing returns them.
pub(crate) fn sort_by_start(appointments: &mut [Appointment]) {
    appointments.sort_by_key(|a| (a.date, a.start_time, a.id));
}

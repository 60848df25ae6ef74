//! Fixtures shared by the engine tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{NaiveDate, NaiveTime, TimeDelta};
use config::FileFormat;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use futures::future::{self, BoxFuture};
use tokio::sync::broadcast;
use uuid::Uuid;

use rendezvous_core::appointment::Appointment;
use rendezvous_core::config::BookingConfig;
use rendezvous_core::event::DomainEvent;
use rendezvous_core::interval::{DateRange, Interval};
use rendezvous_core::types::CalendarScope;
use rendezvous_db::db::memory::MemoryStore;
use rendezvous_db::db::{AppointmentStore, StoreTx};
use rendezvous_db::error::{DbError, DbResult};

use super::{BookingRequest, SchedulingEngine};
use crate::catalog::Catalog;
use crate::events::BroadcastEventSink;

pub const ORG: Uuid = Uuid::from_u128(1);
/// 30 minutes, Alice and Bob.
pub const PASSPORT: Uuid = Uuid::from_u128(10);
/// 60 minutes, Alice only.
pub const INTERVIEW: Uuid = Uuid::from_u128(11);
pub const ALICE: Uuid = Uuid::from_u128(100);
pub const BOB: Uuid = Uuid::from_u128(101);
pub const ATTENDEE: Uuid = Uuid::from_u128(500);

pub const CATALOG: &str = r#"
[[organizations]]
id = "00000000-0000-0000-0000-000000000001"
name = "Embassy"
timezone = "UTC"

[organizations.schedule.weekly]
monday = { open = true, windows = [{ start = "09:00", end = "17:00" }] }
tuesday = { open = true, windows = [{ start = "09:00", end = "17:00" }] }
wednesday = { open = true, windows = [{ start = "09:00", end = "17:00" }] }
thursday = { open = true, windows = [{ start = "09:00", end = "17:00" }] }
friday = { open = true, windows = [{ start = "09:00", end = "17:00" }] }
saturday = { open = false }
sunday = { open = false }

[[organizations.schedule.exceptions]]
kind = "closure"
start_date = "2026-03-10"
end_date = "2026-03-11"
reason = "Staff training"

[[organizations.services]]
id = "00000000-0000-0000-0000-00000000000a"
name = "Passport renewal"
duration_minutes = 30

[[organizations.services]]
id = "00000000-0000-0000-0000-00000000000b"
name = "Visa interview"
duration_minutes = 60

[[organizations.agents]]
id = "00000000-0000-0000-0000-000000000064"
name = "Alice"
qualified_services = ["00000000-0000-0000-0000-00000000000a", "00000000-0000-0000-0000-00000000000b"]

[[organizations.agents]]
id = "00000000-0000-0000-0000-000000000065"
name = "Bob"
qualified_services = ["00000000-0000-0000-0000-00000000000a"]
"#;

pub struct Harness {
    pub engine: SchedulingEngine,
    pub store: MemoryStore,
    pub events: broadcast::Receiver<DomainEvent>,
}

pub fn harness() -> Harness {
    let store = MemoryStore::new();
    let (engine, events) = engine_over(Arc::new(store.clone()), 5_000);
    Harness {
        engine,
        store,
        events,
    }
}

pub fn engine_over(
    store: Arc<dyn AppointmentStore>,
    timeout_ms: u64,
) -> (SchedulingEngine, broadcast::Receiver<DomainEvent>) {
    let catalog = Arc::new(Catalog::parse(CATALOG, FileFormat::Toml).unwrap());
    let sink = BroadcastEventSink::new(64);
    let events = sink.subscribe();
    let engine = SchedulingEngine::new(
        catalog.clone(),
        catalog,
        store,
        Arc::new(sink),
        BookingConfig {
            timeout_ms,
            max_range_days: 31,
        },
    );
    (engine, events)
}

pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

pub fn interval_on(date: NaiveDate, hour: u32, minute: u32, minutes: i64) -> Interval {
    Interval::starting_at(date, time(hour, minute), TimeDelta::minutes(minutes)).unwrap()
}

pub fn week() -> DateRange {
    DateRange::new(monday(), NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()).unwrap()
}

pub fn request(service_id: Uuid, interval: Interval, preferred: Option<Uuid>) -> BookingRequest {
    BookingRequest {
        organization_id: ORG,
        service_id,
        attendee_id: ATTENDEE,
        interval,
        preferred_agent_id: preferred,
        country_code: None,
        not_before: None,
    }
}

pub fn passport(hour: u32, minute: u32) -> BookingRequest {
    request(PASSPORT, interval_on(monday(), hour, minute, 30), None)
}

pub fn interview(hour: u32) -> BookingRequest {
    request(INTERVIEW, interval_on(monday(), hour, 0, 60), None)
}

/// Panics if two active appointments of one agent overlap.
pub fn assert_no_overlaps(appointments: &[Appointment]) {
    let active: Vec<&Appointment> = appointments.iter().filter(|a| a.is_active()).collect();
    for (i, a) in active.iter().enumerate() {
        for b in &active[i + 1..] {
            assert!(
                a.agent_id != b.agent_id || !a.interval().overlaps(&b.interval()),
                "{} and {} overlap for agent {}",
                a.id,
                b.id,
                a.agent_id
            );
        }
    }
}

pub fn drain(events: &mut broadcast::Receiver<DomainEvent>) -> Vec<DomainEvent> {
    std::iter::from_fn(|| events.try_recv().ok()).collect()
}

pub const INJECTED: &str = "injected failure";

fn injected(kind: DatabaseErrorKind) -> DbError {
    DbError::DatabaseError(DieselError::DatabaseError(kind, Box::new(INJECTED.to_owned())))
}

/// A [`MemoryStore`] whose first `failures` transactions fail to start.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub begins: AtomicUsize,
    failures: AtomicUsize,
    transient: bool,
    lose_commit_replies: bool,
}

impl FlakyStore {
    pub fn new(failures: usize, transient: bool) -> Self {
        Self {
            inner: MemoryStore::new(),
            begins: AtomicUsize::new(0),
            failures: AtomicUsize::new(failures),
            transient,
            lose_commit_replies: false,
        }
    }

    /// Every commit is applied but reported as a dropped connection.
    pub fn losing_commit_replies() -> Self {
        Self {
            lose_commit_replies: true,
            ..Self::new(0, true)
        }
    }

    fn error(&self) -> DbError {
        injected(if self.transient {
            DatabaseErrorKind::SerializationFailure
        } else {
            DatabaseErrorKind::CheckViolation
        })
    }
}

struct LostReplyTx(Box<dyn StoreTx>);

impl StoreTx for LostReplyTx {
    fn get(&mut self, id: Uuid) -> BoxFuture<'_, DbResult<Option<Appointment>>> {
        self.0.get(id)
    }

    fn active_for_agent_on(
        &mut self,
        agent_id: Uuid,
        date: NaiveDate,
    ) -> BoxFuture<'_, DbResult<Vec<Appointment>>> {
        self.0.active_for_agent_on(agent_id, date)
    }

    fn insert<'a>(&'a mut self, appointment: &'a Appointment) -> BoxFuture<'a, DbResult<()>> {
        self.0.insert(appointment)
    }

    fn update<'a>(&'a mut self, appointment: &'a Appointment) -> BoxFuture<'a, DbResult<()>> {
        self.0.update(appointment)
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, DbResult<()>> {
        Box::pin(async move {
            self.0.commit().await?;
            Err(injected(DatabaseErrorKind::ClosedConnection))
        })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, DbResult<()>> {
        self.0.rollback()
    }
}

impl AppointmentStore for FlakyStore {
    fn begin<'a>(
        &'a self,
        scopes: &'a [CalendarScope],
    ) -> BoxFuture<'a, DbResult<Box<dyn StoreTx>>> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        let fail = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Box::pin(future::ready(Err(self.error())));
        }
        if self.lose_commit_replies {
            return Box::pin(async move {
                let tx = self.inner.begin(scopes).await?;
                Ok(Box::new(LostReplyTx(tx)) as Box<dyn StoreTx>)
            });
        }
        self.inner.begin(scopes)
    }

    fn get(&self, id: Uuid) -> BoxFuture<'_, DbResult<Option<Appointment>>> {
        self.inner.get(id)
    }

    fn active_for_agents<'a>(
        &'a self,
        agent_ids: &'a [Uuid],
        range: DateRange,
    ) -> BoxFuture<'a, DbResult<Vec<Appointment>>> {
        self.inner.active_for_agents(agent_ids, range)
    }

    fn for_agent(
        &self,
        agent_id: Uuid,
        range: DateRange,
    ) -> BoxFuture<'_, DbResult<Vec<Appointment>>> {
        self.inner.for_agent(agent_id, range)
    }

    fn for_organization(
        &self,
        organization_id: Uuid,
        range: DateRange,
    ) -> BoxFuture<'_, DbResult<Vec<Appointment>>> {
        self.inner.for_organization(organization_id, range)
    }
}

/// A store whose transactions never start.
#[derive(Default)]
pub struct StalledStore {
    inner: MemoryStore,
}

impl AppointmentStore for StalledStore {
    fn begin<'a>(
        &'a self,
        _scopes: &'a [CalendarScope],
    ) -> BoxFuture<'a, DbResult<Box<dyn StoreTx>>> {
        Box::pin(future::pending())
    }

    fn get(&self, id: Uuid) -> BoxFuture<'_, DbResult<Option<Appointment>>> {
        self.inner.get(id)
    }

    fn active_for_agents<'a>(
        &'a self,
        agent_ids: &'a [Uuid],
        range: DateRange,
    ) -> BoxFuture<'a, DbResult<Vec<Appointment>>> {
        self.inner.active_for_agents(agent_ids, range)
    }

    fn for_agent(
        &self,
        agent_id: Uuid,
        range: DateRange,
    ) -> BoxFuture<'_, DbResult<Vec<Appointment>>> {
        self.inner.for_agent(agent_id, range)
    }

    fn for_organization(
        &self,
        organization_id: Uuid,
        range: DateRange,
    ) -> BoxFuture<'_, DbResult<Vec<Appointment>>> {
        self.inner.for_organization(organization_id, range)
    }
}

//! In-process appointment store.
//!
//! Holds every appointment in a map and serializes writers per
//! [`CalendarScope`] with tokio mutexes. Writes made inside a transaction are
//! buffered and only become visible on commit.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use rendezvous_core::appointment::Appointment;
use rendezvous_core::interval::DateRange;
use rendezvous_core::types::CalendarScope;

use crate::db::{AppointmentStore, StoreTx, sort_by_start};
use crate::error::{DbError, DbResult};

#[derive(Default)]
struct Inner {
    rows: RwLock<HashMap<Uuid, Appointment>>,
    locks: Mutex<HashMap<CalendarScope, Arc<Mutex<()>>>>,
}

impl Inner {
    async fn scope_lock(&self, scope: CalendarScope) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        // Only the map holds an idle lock.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(scope).or_default())
    }

    async fn select<F>(&self, keep: F) -> Vec<Appointment>
    where
        F: Fn(&Appointment) -> bool,
    {
        let rows = self.rows.read().await;
        let mut selected: Vec<Appointment> = rows.values().filter(|&a| keep(a)).cloned().collect();
        sort_by_start(&mut selected);
        selected
    }
}

/// ## Summary
/// Appointment store kept in process memory.
///
/// Cloning shares the same underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every committed appointment, in listing order.
    pub async fn snapshot(&self) -> Vec<Appointment> {
        self.inner.select(|_| true).await
    }
}

impl AppointmentStore for MemoryStore {
    fn begin<'a>(
        &'a self,
        scopes: &'a [CalendarScope],
    ) -> BoxFuture<'a, DbResult<Box<dyn StoreTx>>> {
        Box::pin(async move {
            let mut guards = Vec::with_capacity(scopes.len());
            for scope in CalendarScope::canonical(scopes) {
                let lock = self.inner.scope_lock(scope).await;
                guards.push(lock.lock_owned().await);
                tracing::trace!(%scope, "Scope lock held");
            }

            Ok(Box::new(MemoryTx {
                inner: Arc::clone(&self.inner),
                writes: HashMap::new(),
                guards,
            }) as Box<dyn StoreTx>)
        })
    }

    fn get(&self, id: Uuid) -> BoxFuture<'_, DbResult<Option<Appointment>>> {
        Box::pin(async move { Ok(self.inner.rows.read().await.get(&id).cloned()) })
    }

    fn active_for_agents<'a>(
        &'a self,
        agent_ids: &'a [Uuid],
        range: DateRange,
    ) -> BoxFuture<'a, DbResult<Vec<Appointment>>> {
        Box::pin(async move {
            Ok(self
                .inner
                .select(|a| {
                    a.is_active() && range.contains(a.date) && agent_ids.contains(&a.agent_id)
                })
                .await)
        })
    }

    fn for_agent(
        &self,
        agent_id: Uuid,
        range: DateRange,
    ) -> BoxFuture<'_, DbResult<Vec<Appointment>>> {
        Box::pin(async move {
            Ok(self
                .inner
                .select(|a| a.agent_id == agent_id && range.contains(a.date))
                .await)
        })
    }

    fn for_organization(
        &self,
        organization_id: Uuid,
        range: DateRange,
    ) -> BoxFuture<'_, DbResult<Vec<Appointment>>> {
        Box::pin(async move {
            Ok(self
                .inner
                .select(|a| a.organization_id == organization_id && range.contains(a.date))
                .await)
        })
    }
}

/// A transaction over [`MemoryStore`]. Its scope locks are released on drop.
pub struct MemoryTx {
    inner: Arc<Inner>,
    writes: HashMap<Uuid, Appointment>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl MemoryTx {
    async fn exists(&self, id: Uuid) -> bool {
        self.writes.contains_key(&id) || self.inner.rows.read().await.contains_key(&id)
    }
}

impl StoreTx for MemoryTx {
    fn get(&mut self, id: Uuid) -> BoxFuture<'_, DbResult<Option<Appointment>>> {
        Box::pin(async move {
            if let Some(pending) = self.writes.get(&id) {
                return Ok(Some(pending.clone()));
            }
            Ok(self.inner.rows.read().await.get(&id).cloned())
        })
    }

    fn active_for_agent_on(
        &mut self,
        agent_id: Uuid,
        date: NaiveDate,
    ) -> BoxFuture<'_, DbResult<Vec<Appointment>>> {
        Box::pin(async move {
            let on_scope =
                |a: &Appointment| a.is_active() && a.agent_id == agent_id && a.date == date;
            let rows = self.inner.rows.read().await;
            let mut found: Vec<Appointment> = rows
                .values()
                .filter(|a| !self.writes.contains_key(&a.id))
                .chain(self.writes.values())
                .filter(|&a| on_scope(a))
                .cloned()
                .collect();
            sort_by_start(&mut found);
            Ok(found)
        })
    }

    fn insert<'a>(&'a mut self, appointment: &'a Appointment) -> BoxFuture<'a, DbResult<()>> {
        Box::pin(async move {
            if self.exists(appointment.id).await {
                return Err(DbError::DuplicateKey(appointment.id));
            }
            self.writes.insert(appointment.id, appointment.clone());
            Ok(())
        })
    }

    fn update<'a>(&'a mut self, appointment: &'a Appointment) -> BoxFuture<'a, DbResult<()>> {
        Box::pin(async move {
            if !self.exists(appointment.id).await {
                return Err(DbError::MissingRow(appointment.id));
            }
            self.writes.insert(appointment.id, appointment.clone());
            Ok(())
        })
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, DbResult<()>> {
        Box::pin(async move {
            let Self { inner, writes, guards } = *self;
            let written = writes.len();
            inner.rows.write().await.extend(writes);
            drop(guards);
            tracing::trace!(written, "Memory transaction committed");
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, DbResult<()>> {
        Box::pin(async move {
            tracing::trace!(discarded = self.writes.len(), "Memory transaction rolled back");
            drop(self);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{NaiveTime, TimeDelta, Utc};
    use rendezvous_core::appointment::{LifecycleAction, NewAppointment};
    use rendezvous_core::interval::Interval;

    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn appointment(agent: u128, hour: u32) -> Appointment {
        let interval = Interval::starting_at(
            monday(),
            NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            TimeDelta::minutes(30),
        )
        .unwrap();
        Appointment::confirm(
            NewAppointment {
                organization_id: Uuid::from_u128(100),
                service_id: Uuid::from_u128(200),
                agent_id: Uuid::from_u128(agent),
                attendee_id: Uuid::new_v4(),
                interval,
                rescheduled_from_id: None,
            },
            Utc::now(),
        )
    }

    #[test_log::test(tokio::test)]
    async fn test_commit_makes_writes_visible() {
        let store = MemoryStore::new();
        let booked = appointment(1, 9);

        let mut tx = store.begin(&[booked.scope()]).await.unwrap();
        tx.insert(&booked).await.unwrap();
        assert!(store.get(booked.id).await.unwrap().is_none());
        assert_eq!(tx.get(booked.id).await.unwrap(), Some(booked.clone()));
        tx.commit().await.unwrap();

        assert_eq!(store.get(booked.id).await.unwrap(), Some(booked));
    }

    #[test_log::test(tokio::test)]
    async fn test_dropped_transaction_discards_writes() {
        let store = MemoryStore::new();
        let booked = appointment(1, 9);

        {
            let mut tx = store.begin(&[booked.scope()]).await.unwrap();
            tx.insert(&booked).await.unwrap();
        }
        assert!(store.snapshot().await.is_empty());

        let mut tx = store.begin(&[booked.scope()]).await.unwrap();
        tx.insert(&booked).await.unwrap();
        tx.rollback().await.unwrap();
        assert!(store.snapshot().await.is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_insert_rejects_duplicate_and_update_requires_row() {
        let store = MemoryStore::new();
        let booked = appointment(1, 9);

        let mut tx = store.begin(&[booked.scope()]).await.unwrap();
        assert!(matches!(
            tx.update(&booked).await,
            Err(DbError::MissingRow(id)) if id == booked.id
        ));
        tx.insert(&booked).await.unwrap();
        assert!(matches!(
            tx.insert(&booked).await,
            Err(DbError::DuplicateKey(id)) if id == booked.id
        ));
        tx.commit().await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_active_reads_see_pending_updates() {
        let store = MemoryStore::new();
        let first = appointment(1, 10);
        let second = appointment(1, 9);

        let mut tx = store.begin(&[first.scope()]).await.unwrap();
        tx.insert(&first).await.unwrap();
        tx.insert(&second).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin(&[first.scope()]).await.unwrap();
        let mut cancelled = first.clone();
        cancelled
            .transition(LifecycleAction::Cancel, Utc::now(), None)
            .unwrap();
        tx.update(&cancelled).await.unwrap();

        let active = tx.active_for_agent_on(first.agent_id, monday()).await.unwrap();
        assert_eq!(active, vec![second.clone()]);
        drop(tx);

        let committed = store
            .active_for_agents(&[first.agent_id], DateRange::single_day(monday()))
            .await
            .unwrap();
        assert_eq!(committed, vec![second, first]);
    }

    #[test_log::test(tokio::test)]
    async fn test_scope_lock_is_exclusive() {
        let store = MemoryStore::new();
        let scope = CalendarScope::new(Uuid::from_u128(1), monday());
        let other = CalendarScope::new(Uuid::from_u128(2), monday());

        let held = store.begin(&[scope]).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), store.begin(&[scope])).await;
        assert!(blocked.is_err());

        let independent =
            tokio::time::timeout(Duration::from_millis(50), store.begin(&[other])).await;
        assert!(independent.is_ok());

        drop(held);
        let reacquired = tokio::time::timeout(Duration::from_millis(50), store.begin(&[scope])).await;
        assert!(reacquired.is_ok());
    }
}

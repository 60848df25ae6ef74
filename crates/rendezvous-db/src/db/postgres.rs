//! `PostgreSQL` appointment store.

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel_async::{AnsiTransactionManager, RunQueryDsl, TransactionManager};
use futures::future::BoxFuture;
use uuid::Uuid;

use rendezvous_core::appointment::Appointment;
use rendezvous_core::interval::DateRange;
use rendezvous_core::types::CalendarScope;

use crate::db::connection::{DbConnection, DbPool};
use crate::db::schema::appointment;
use crate::db::{AppointmentStore, StoreTx, query, transaction};
use crate::error::{DbError, DbResult};
use crate::model::appointment::AppointmentRow;

/// Appointment store backed by a pooled `diesel-async` connection.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load(
        &self,
        query: appointment::BoxedQuery<'static, diesel::pg::Pg>,
    ) -> DbResult<Vec<Appointment>> {
        let mut conn = self.pool.get().await?;
        let rows = query
            .select(AppointmentRow::as_select())
            .load::<AppointmentRow>(&mut *conn)
            .await?;
        Ok(rows.into_iter().map(Appointment::from).collect())
    }
}

impl AppointmentStore for PgStore {
    fn begin<'a>(
        &'a self,
        scopes: &'a [CalendarScope],
    ) -> BoxFuture<'a, DbResult<Box<dyn StoreTx>>> {
        Box::pin(async move {
            let mut conn = self.pool.get_owned().await?;
            transaction::begin_scoped(&mut conn, scopes).await?;
            tracing::trace!("Scoped transaction started");
            Ok(Box::new(PgTx { conn }) as Box<dyn StoreTx>)
        })
    }

    fn get(&self, id: Uuid) -> BoxFuture<'_, DbResult<Option<Appointment>>> {
        Box::pin(async move {
            let mut conn = self.pool.get().await?;
            let row = query::appointment::by_id(id)
                .select(AppointmentRow::as_select())
                .first::<AppointmentRow>(&mut *conn)
                .await
                .optional()?;
            Ok(row.map(Appointment::from))
        })
    }

    fn active_for_agents<'a>(
        &'a self,
        agent_ids: &'a [Uuid],
        range: DateRange,
    ) -> BoxFuture<'a, DbResult<Vec<Appointment>>> {
        Box::pin(async move {
            if agent_ids.is_empty() || range.is_empty() {
                return Ok(Vec::new());
            }
            self.load(query::appointment::active_for_agents_between(
                agent_ids,
                range.start(),
                range.end(),
            ))
            .await
        })
    }

    fn for_agent(
        &self,
        agent_id: Uuid,
        range: DateRange,
    ) -> BoxFuture<'_, DbResult<Vec<Appointment>>> {
        Box::pin(self.load(query::appointment::for_agent_between(
            agent_id,
            range.start(),
            range.end(),
        )))
    }

    fn for_organization(
        &self,
        organization_id: Uuid,
        range: DateRange,
    ) -> BoxFuture<'_, DbResult<Vec<Appointment>>> {
        Box::pin(self.load(query::appointment::for_organization_between(
            organization_id,
            range.start(),
            range.end(),
        )))
    }
}

/// An open transaction on a connection owned for its whole lifetime.
///
/// If dropped uncommitted the pool sees a connection stuck in a transaction
/// and discards it; `PostgreSQL` then rolls the transaction back and releases
/// its advisory locks when the session ends.
pub struct PgTx {
    conn: DbConnection<'static>,
}

impl StoreTx for PgTx {
    fn get(&mut self, id: Uuid) -> BoxFuture<'_, DbResult<Option<Appointment>>> {
        Box::pin(async move {
            let row = query::appointment::by_id(id)
                .select(AppointmentRow::as_select())
                .first::<AppointmentRow>(&mut *self.conn)
                .await
                .optional()?;
            Ok(row.map(Appointment::from))
        })
    }

    fn active_for_agent_on(
        &mut self,
        agent_id: Uuid,
        date: NaiveDate,
    ) -> BoxFuture<'_, DbResult<Vec<Appointment>>> {
        Box::pin(async move {
            let rows = query::appointment::active_for_agent_on(agent_id, date)
                .select(AppointmentRow::as_select())
                .load::<AppointmentRow>(&mut *self.conn)
                .await?;
            Ok(rows.into_iter().map(Appointment::from).collect())
        })
    }

    fn insert<'a>(&'a mut self, appointment: &'a Appointment) -> BoxFuture<'a, DbResult<()>> {
        Box::pin(async move {
            let row = AppointmentRow::from(appointment);
            diesel::insert_into(appointment::table)
                .values(&row)
                .execute(&mut *self.conn)
                .await?;
            Ok(())
        })
    }

    fn update<'a>(&'a mut self, appointment: &'a Appointment) -> BoxFuture<'a, DbResult<()>> {
        Box::pin(async move {
            let row = AppointmentRow::from(appointment);
            let updated = diesel::update(appointment::table.find(row.id))
                .set(&row)
                .execute(&mut *self.conn)
                .await?;
            if updated == 0 {
                return Err(DbError::MissingRow(row.id));
            }
            Ok(())
        })
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, DbResult<()>> {
        Box::pin(async move {
            let mut this = self;
            AnsiTransactionManager::commit_transaction(&mut *this.conn).await?;
            tracing::trace!("Scoped transaction committed");
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, DbResult<()>> {
        Box::pin(async move {
            let mut this = self;
            AnsiTransactionManager::rollback_transaction(&mut *this.conn).await?;
            tracing::trace!("Scoped transaction rolled back");
            Ok(())
        })
    }
}

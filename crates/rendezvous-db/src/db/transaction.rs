//! Scoped transactions for appointment writes.
//!
//! A transaction that touches an agent's calendar first takes a
//! transaction-level advisory lock for every `(agent, day)` scope it needs.
//! Keys are acquired in ascending order, so two transactions asking for
//! overlapping scope sets never deadlock. The locks are released by
//! PostgreSQL on commit or rollback.

use diesel::sql_types::BigInt;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};
use sha2::{Digest, Sha256};

use rendezvous_core::types::CalendarScope;

/// ## Summary
/// Derives the advisory lock key for a scope.
///
/// The key is stable across processes and releases: the first eight bytes of
/// `SHA-256(agent_id || date)`.
#[must_use]
pub fn scope_lock_key(scope: &CalendarScope) -> i64 {
    let mut hasher = Sha256::new();
    hasher.update(scope.agent_id.as_bytes());
    hasher.update(scope.date.to_string().as_bytes());
    let digest = hasher.finalize();
    let mut key = [0_u8; 8];
    key.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(key)
}

/// Lock keys for `scopes`, sorted and deduplicated.
#[must_use]
pub fn lock_keys(scopes: &[CalendarScope]) -> Vec<i64> {
    let mut keys: Vec<i64> = scopes.iter().map(scope_lock_key).collect();
    keys.sort_unstable();
    keys.dedup();
    keys
}

/// ## Summary
/// Starts a transaction and blocks until every scope lock is held.
///
/// ## Errors
/// Returns any error raised while starting the transaction or taking a lock.
/// The transaction is rolled back before a lock error is returned.
#[tracing::instrument(skip(conn, scopes), fields(scope_count = scopes.len()))]
pub async fn begin_scoped(
    conn: &mut AsyncPgConnection,
    scopes: &[CalendarScope],
) -> diesel::QueryResult<()> {
    AnsiTransactionManager::begin_transaction(conn).await?;

    for key in lock_keys(scopes) {
        let locked = diesel::sql_query("SELECT pg_advisory_xact_lock($1)")
            .bind::<BigInt, _>(key)
            .execute(conn)
            .await;
        if let Err(e) = locked {
            tracing::warn!(error = %e, lock_key = key, "Failed to take scope lock");
            if let Err(rollback) = AnsiTransactionManager::rollback_transaction(conn).await {
                tracing::error!(error = %rollback, "Rollback after lock failure failed");
            }
            return Err(e);
        }
        tracing::trace!(lock_key = key, "Scope lock held");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::*;

    fn scope(agent: u128, day: u32) -> CalendarScope {
        CalendarScope::new(
            Uuid::from_u128(agent),
            NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
        )
    }

    #[test]
    fn test_lock_key_is_deterministic() {
        assert_eq!(scope_lock_key(&scope(7, 2)), scope_lock_key(&scope(7, 2)));
        assert_ne!(scope_lock_key(&scope(7, 2)), scope_lock_key(&scope(7, 3)));
        assert_ne!(scope_lock_key(&scope(7, 2)), scope_lock_key(&scope(8, 2)));
    }

    #[test]
    fn test_lock_keys_sorted_and_unique() {
        let keys = lock_keys(&[scope(1, 2), scope(2, 2), scope(1, 2)]);
        assert_eq!(keys.len(), 2);
        assert!(keys[0] < keys[1]);
    }
}

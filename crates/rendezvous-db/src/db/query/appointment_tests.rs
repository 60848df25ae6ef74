//! Unit tests for appointment query builders.

use diesel::query_builder::QueryFragment;

use super::*;

fn sql<Q>(query: &Q) -> String
where
    Q: QueryFragment<diesel::pg::Pg>,
{
    diesel::debug_query::<diesel::pg::Pg, _>(query).to_string()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

#[test]
fn test_by_id_query_builds() {
    let query_str = sql(&by_id(uuid::Uuid::new_v4()));
    assert!(query_str.contains("\"appointment\".\"id\" ="));
}

#[test]
fn test_active_excludes_cancelled() {
    let query_str = sql(&active());
    assert!(
        query_str.contains("\"appointment\".\"status\" !="),
        "active() should filter on status: {query_str}"
    );
}

#[test]
fn test_active_for_agent_on_filters_agent_and_day() {
    let query_str = sql(&active_for_agent_on(uuid::Uuid::new_v4(), day(2)));
    assert!(query_str.contains("agent_id"));
    assert!(query_str.contains("appointment_date"));
    assert!(query_str.contains("\"status\" !="));
    assert!(query_str.contains("ORDER BY"));
}

#[test]
fn test_active_for_agents_between_is_half_open() {
    let agents = [uuid::Uuid::new_v4(), uuid::Uuid::new_v4()];
    let query_str = sql(&active_for_agents_between(&agents, day(2), day(9)));
    assert!(query_str.contains("\"appointment\".\"appointment_date\" >="));
    assert!(query_str.contains("\"appointment\".\"appointment_date\" <"));
    assert!(query_str.contains("= ANY("));
}

#[test]
fn test_for_agent_between_keeps_every_status() {
    let query_str = sql(&for_agent_between(uuid::Uuid::new_v4(), day(2), day(3)));
    assert!(query_str.contains("agent_id"));
    assert!(!query_str.contains("\"status\" !="));
}

#[test]
fn test_for_organization_between_filters_organization() {
    let query_str = sql(&for_organization_between(uuid::Uuid::new_v4(), day(2), day(3)));
    assert!(query_str.contains("organization_id"));
}

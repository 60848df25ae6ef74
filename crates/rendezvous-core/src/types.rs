use chrono::NaiveDate;
use uuid::Uuid;

/// One agent's calendar on one day.
///
/// Mutations that re-check or change an agent's calendar hold an exclusive
/// lock on every scope they touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CalendarScope {
    pub agent_id: Uuid,
    pub date: NaiveDate,
}

impl CalendarScope {
    #[must_use]
    pub const fn new(agent_id: Uuid, date: NaiveDate) -> Self {
        Self { agent_id, date }
    }

    /// ## Summary
    /// Sorts and deduplicates scopes into the order locks must be taken in.
    #[must_use]
    pub fn canonical(scopes: &[Self]) -> Vec<Self> {
        let mut ordered = scopes.to_vec();
        ordered.sort_unstable();
        ordered.dedup();
        ordered
    }
}

impl std::fmt::Display for CalendarScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.agent_id, self.date)
    }
}

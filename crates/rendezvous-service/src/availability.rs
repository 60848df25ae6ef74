//! Slot generation.
//!
//! Each open window is tiled from its start in steps of the service
//! duration; a trailing tile that would run past the window end is dropped.
//! For every tile the generator reports which of the supplied agents are
//! free. Tiles nobody can take are still emitted, with an empty agent set.
//!
//! The generator does not know what time it is. Callers that must hide
//! slots which already started pass a cutoff through [`Slots::not_before`].

use std::collections::{BTreeMap, BTreeSet};
use std::iter::FusedIterator;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;
use uuid::Uuid;

use rendezvous_core::appointment::Appointment;
use rendezvous_core::interval::{DateRange, Days, Interval};
use rendezvous_core::schedule::Schedule;

use crate::conflict;
use crate::error::{ServiceError, ServiceResult};

/// Active appointments per qualified agent. Agents without appointments are
/// present with an empty list.
pub type AgentCalendars = BTreeMap<Uuid, Vec<Appointment>>;

/// One bookable tile and the agents free for it, ascending by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    #[serde(flatten)]
    pub interval: Interval,
    pub available_agent_ids: BTreeSet<Uuid>,
}

impl Slot {
    #[must_use]
    pub const fn start(&self) -> NaiveDateTime {
        self.interval.start()
    }

    #[must_use]
    pub const fn end(&self) -> NaiveDateTime {
        self.interval.end()
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        !self.available_agent_ids.is_empty()
    }

    /// The agent a booking without preference would get.
    #[must_use]
    pub fn first_available_agent(&self) -> Option<Uuid> {
        self.available_agent_ids.first().copied()
    }
}

/// ## Summary
/// Lazily tiles the open windows of `range`.
///
/// The returned iterator is finite and ordered by `(date, start)`. Cloning it
/// restarts from the clone point without recomputing anything already
/// yielded.
///
/// ## Errors
/// Returns `InvalidSchedule` if `duration` is not positive. Nothing is
/// generated in that case.
pub fn generate_slots(
    schedule: Arc<Schedule>,
    duration: TimeDelta,
    calendars: Arc<AgentCalendars>,
    range: DateRange,
) -> ServiceResult<Slots> {
    if duration <= TimeDelta::zero() {
        return Err(ServiceError::InvalidSchedule(format!(
            "appointment duration must be positive, got {} minutes",
            duration.num_minutes()
        )));
    }

    Ok(Slots {
        schedule,
        duration,
        calendars,
        days: range.days(),
        day: None,
        window: 0,
        cursor: None,
        not_before: None,
    })
}

/// ## Summary
/// Whether `interval` is exactly one of the tiles `schedule` offers for
/// `duration` on its date.
#[must_use]
pub fn is_tile(schedule: &Schedule, duration: TimeDelta, interval: &Interval) -> bool {
    if duration <= TimeDelta::zero() || interval.duration() != duration {
        return false;
    }
    let step = duration.num_seconds();
    let (start, end) = (interval.start_time(), interval.end_time());
    schedule
        .windows_on(interval.date())
        .iter()
        .any(|window| {
            window.start() <= start
                && end <= window.end()
                && (start - window.start()).num_seconds() % step == 0
        })
}

/// Iterator returned by [`generate_slots`].
#[derive(Debug, Clone)]
pub struct Slots {
    schedule: Arc<Schedule>,
    duration: TimeDelta,
    calendars: Arc<AgentCalendars>,
    days: Days,
    day: Option<NaiveDate>,
    window: usize,
    cursor: Option<NaiveTime>,
    not_before: Option<NaiveDateTime>,
}

impl Slots {
    /// Skips tiles starting before `earliest`, a local time of the schedule.
    #[must_use]
    pub const fn not_before(mut self, earliest: NaiveDateTime) -> Self {
        self.not_before = Some(earliest);
        self
    }

    fn next_window(&mut self) {
        self.window += 1;
        self.cursor = None;
    }

    fn slot(&self, interval: Interval) -> Slot {
        let available_agent_ids = self
            .calendars
            .iter()
            .filter(|(_, calendar)| !conflict::has_conflict(&interval, calendar, None))
            .map(|(agent_id, _)| *agent_id)
            .collect();
        Slot {
            interval,
            available_agent_ids,
        }
    }
}

impl Iterator for Slots {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        loop {
            let date = if let Some(date) = self.day {
                date
            } else {
                let date = self.days.next()?;
                self.day = Some(date);
                self.window = 0;
                self.cursor = None;
                date
            };

            let Some(window) = self.schedule.windows_on(date).get(self.window).copied() else {
                self.day = None;
                continue;
            };

            let start = self.cursor.unwrap_or_else(|| window.start());
            let (end, wrapped) = start.overflowing_add_signed(self.duration);
            if wrapped != 0 || end > window.end() {
                self.next_window();
                continue;
            }
            self.cursor = Some(end);

            let Ok(interval) = Interval::new(date, start, end) else {
                self.next_window();
                continue;
            };
            if self.not_before.is_some_and(|earliest| interval.start() < earliest) {
                continue;
            }
            return Some(self.slot(interval));
        }
    }
}

impl FusedIterator for Slots {}

#[cfg(test)]
#[path = "availability_tests.rs"]
mod tests;

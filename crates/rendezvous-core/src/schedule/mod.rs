//! Organization opening hours.
//!
//! A [`Schedule`] combines a [`WeeklySchedule`] (one [`DaySchedule`] per
//! weekday) with a list of [`CalendarException`]s that close the organization
//! on specific dates. All values are validated on construction, so a
//! `Schedule` that exists is well formed.

mod spec;

pub use spec::{CalendarExceptionSpec, DayScheduleSpec, ScheduleSpec, TimeWindowSpec, WeeklyScheduleSpec};

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

use crate::error::{CoreError, CoreResult};

/// An open-for-business interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeWindow {
    /// ## Errors
    /// Returns `InvalidSchedule` if `start >= end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> CoreResult<Self> {
        if start >= end {
            return Err(CoreError::InvalidSchedule(format!(
                "time window start {start} must be before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveTime {
        self.end
    }
}

/// Opening hours for one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DaySchedule {
    is_open: bool,
    windows: Vec<TimeWindow>,
}

impl DaySchedule {
    #[must_use]
    pub const fn closed() -> Self {
        Self {
            is_open: false,
            windows: Vec::new(),
        }
    }

    /// ## Summary
    /// Creates an open day from windows supplied in ascending order.
    ///
    /// ## Errors
    /// Returns `InvalidSchedule` if the windows are out of order or overlap.
    /// Touching windows (`a.end == b.start`) are accepted.
    pub fn open(windows: Vec<TimeWindow>) -> CoreResult<Self> {
        for pair in windows.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if next.start < prev.end {
                return Err(CoreError::InvalidSchedule(format!(
                    "time window {}-{} overlaps or precedes {}-{}",
                    next.start, next.end, prev.start, prev.end
                )));
            }
        }
        Ok(Self {
            is_open: true,
            windows,
        })
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.is_open
    }

    #[must_use]
    pub fn windows(&self) -> &[TimeWindow] {
        &self.windows
    }
}

/// Opening hours for every weekday, indexed Monday first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WeeklySchedule {
    days: [DaySchedule; 7],
}

impl WeeklySchedule {
    /// Creates a schedule from seven days, Monday first.
    #[must_use]
    pub const fn from_days(days: [DaySchedule; 7]) -> Self {
        Self { days }
    }

    /// Replaces the schedule for one weekday.
    #[must_use]
    pub fn with_day(mut self, weekday: Weekday, day: DaySchedule) -> Self {
        self.days[weekday.num_days_from_monday() as usize] = day;
        self
    }

    #[must_use]
    pub fn day(&self, weekday: Weekday) -> &DaySchedule {
        &self.days[weekday.num_days_from_monday() as usize]
    }
}

/// A date or inclusive date range on which the organization is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarException {
    Holiday {
        date: NaiveDate,
        name: Option<String>,
    },
    Closure {
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: String,
    },
}

impl CalendarException {
    /// ## Errors
    /// Returns `InvalidSchedule` if `end_date` is before `start_date`.
    pub fn closure(
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: impl Into<String>,
    ) -> CoreResult<Self> {
        if end_date < start_date {
            return Err(CoreError::InvalidSchedule(format!(
                "closure ends {end_date} before it starts {start_date}"
            )));
        }
        Ok(Self::Closure {
            start_date,
            end_date,
            reason: reason.into(),
        })
    }

    #[must_use]
    pub const fn holiday(date: NaiveDate) -> Self {
        Self::Holiday { date, name: None }
    }

    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        match self {
            Self::Holiday { date: holiday, .. } => *holiday == date,
            Self::Closure {
                start_date,
                end_date,
                ..
            } => *start_date <= date && date <= *end_date,
        }
    }
}

/// Weekly opening hours plus the exceptions that override them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schedule {
    weekly: WeeklySchedule,
    exceptions: Vec<CalendarException>,
}

impl Schedule {
    #[must_use]
    pub const fn new(weekly: WeeklySchedule, exceptions: Vec<CalendarException>) -> Self {
        Self { weekly, exceptions }
    }

    /// Returns the first exception closing the organization on `date`.
    #[must_use]
    pub fn exception_on(&self, date: NaiveDate) -> Option<&CalendarException> {
        self.exceptions.iter().find(|exception| exception.covers(date))
    }

    /// ## Summary
    /// Whether the organization takes appointments on `date`.
    ///
    /// Exceptions win over the weekly schedule unconditionally.
    #[must_use]
    pub fn is_open_on(&self, date: NaiveDate) -> bool {
        if self.exception_on(date).is_some() {
            return false;
        }
        let day = self.weekly.day(date.weekday());
        day.is_open() && !day.windows().is_empty()
    }

    /// ## Summary
    /// Opening windows on `date` in ascending order; empty when closed.
    #[must_use]
    pub fn windows_on(&self, date: NaiveDate) -> &[TimeWindow] {
        if self.exception_on(date).is_some() {
            return &[];
        }
        let day = self.weekly.day(date.weekday());
        if day.is_open() { day.windows() } else { &[] }
    }
}

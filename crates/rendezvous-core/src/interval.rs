//! Half-open time intervals and date ranges.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;

use crate::error::{CoreError, CoreResult};

/// A half-open interval `[start, end)` within a single calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Interval {
    pub(crate) start: NaiveDateTime,
    pub(crate) end: NaiveDateTime,
}

impl Interval {
    /// ## Summary
    /// Creates an interval on `date` between two times of day.
    ///
    /// ## Errors
    /// Returns `InvalidInput` if `start >= end`.
    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> CoreResult<Self> {
        if start >= end {
            return Err(CoreError::InvalidInput(format!(
                "interval start {start} must be before end {end}"
            )));
        }
        Ok(Self {
            start: date.and_time(start),
            end: date.and_time(end),
        })
    }

    /// ## Summary
    /// Creates an interval of `duration` starting at `start` on `date`.
    ///
    /// ## Errors
    /// Returns `InvalidInput` if the duration is not positive or the interval
    /// would run past midnight.
    pub fn starting_at(date: NaiveDate, start: NaiveTime, duration: TimeDelta) -> CoreResult<Self> {
        if duration <= TimeDelta::zero() {
            return Err(CoreError::InvalidInput(format!(
                "duration must be positive, got {duration}"
            )));
        }
        let start = date.and_time(start);
        let end = start
            .checked_add_signed(duration)
            .filter(|end| end.date() == date)
            .ok_or_else(|| {
                CoreError::InvalidInput(format!("interval starting at {start} crosses midnight"))
            })?;
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(&self) -> NaiveDateTime {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveDateTime {
        self.end
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    #[must_use]
    pub fn start_time(&self) -> NaiveTime {
        self.start.time()
    }

    #[must_use]
    pub fn end_time(&self) -> NaiveTime {
        self.end.time()
    }

    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// ## Summary
    /// Half-open overlap: touching intervals (`a.end == b.start`) do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.date(),
            self.start_time().format("%H:%M"),
            self.end_time().format("%H:%M")
        )
    }
}

/// A half-open range of calendar days `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// ## Summary
    /// Creates a date range. `start == end` is a valid, empty range.
    ///
    /// ## Errors
    /// Returns `InvalidInput` if `end` is before `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> CoreResult<Self> {
        if end < start {
            return Err(CoreError::InvalidInput(format!(
                "date range end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Range covering exactly `date`.
    #[must_use]
    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date.succ_opt().unwrap_or(date),
        }
    }

    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Number of days in the range.
    #[must_use]
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// ## Summary
    /// Drops the days before `earliest`. The result is empty when the whole
    /// range lies before it.
    #[must_use]
    pub fn starting_no_earlier_than(&self, earliest: NaiveDate) -> Self {
        let start = self.start.max(earliest).min(self.end);
        Self {
            start,
            end: self.end,
        }
    }

    /// Iterates the days of the range in ascending order.
    #[must_use]
    pub const fn days(&self) -> Days {
        Days {
            next: self.start,
            end: self.end,
        }
    }
}

/// Iterator over the days of a [`DateRange`].
#[derive(Debug, Clone)]
pub struct Days {
    next: NaiveDate,
    end: NaiveDate,
}

impl Iterator for Days {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let current = self.next;
        // The end bound keeps us well clear of NaiveDate::MAX.
        self.next = current.succ_opt().unwrap_or(self.end);
        Some(current)
    }
}

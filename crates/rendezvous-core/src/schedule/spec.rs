//! Deserializable schedule descriptions.
//!
//! Configuration sources hand us these unvalidated shapes; converting them
//! into [`Schedule`] is where malformed opening hours are rejected.

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::Deserialize;

use super::{CalendarException, DaySchedule, Schedule, TimeWindow, WeeklySchedule};
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct TimeWindowSpec {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DayScheduleSpec {
    pub open: bool,
    #[serde(default)]
    pub windows: Vec<TimeWindowSpec>,
}

/// All seven weekdays are required.
#[derive(Debug, Clone, Deserialize)]
pub struct WeeklyScheduleSpec {
    pub monday: DayScheduleSpec,
    pub tuesday: DayScheduleSpec,
    pub wednesday: DayScheduleSpec,
    pub thursday: DayScheduleSpec,
    pub friday: DayScheduleSpec,
    pub saturday: DayScheduleSpec,
    pub sunday: DayScheduleSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarExceptionSpec {
    Holiday {
        date: NaiveDate,
        #[serde(default)]
        name: Option<String>,
    },
    Closure {
        start_date: NaiveDate,
        end_date: NaiveDate,
        #[serde(default)]
        reason: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSpec {
    pub weekly: WeeklyScheduleSpec,
    #[serde(default)]
    pub exceptions: Vec<CalendarExceptionSpec>,
}

/// Accepts `HH:MM` and `HH:MM:SS`.
fn parse_time_of_day(value: &str) -> CoreResult<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|e| CoreError::InvalidSchedule(format!("invalid time of day '{value}': {e}")))
}

impl TryFrom<&TimeWindowSpec> for TimeWindow {
    type Error = CoreError;

    fn try_from(spec: &TimeWindowSpec) -> CoreResult<Self> {
        Self::new(parse_time_of_day(&spec.start)?, parse_time_of_day(&spec.end)?)
    }
}

impl DayScheduleSpec {
    fn build(&self, weekday: Weekday) -> CoreResult<DaySchedule> {
        if !self.open {
            if !self.windows.is_empty() {
                return Err(CoreError::InvalidSchedule(format!(
                    "{weekday} is closed but lists {} time window(s)",
                    self.windows.len()
                )));
            }
            return Ok(DaySchedule::closed());
        }
        let windows = self
            .windows
            .iter()
            .map(TimeWindow::try_from)
            .collect::<CoreResult<Vec<_>>>()?;
        DaySchedule::open(windows).map_err(|e| match e {
            CoreError::InvalidSchedule(message) => {
                CoreError::InvalidSchedule(format!("{weekday}: {message}"))
            }
            other => other,
        })
    }
}

impl TryFrom<&WeeklyScheduleSpec> for WeeklySchedule {
    type Error = CoreError;

    fn try_from(spec: &WeeklyScheduleSpec) -> CoreResult<Self> {
        Ok(Self::from_days([
            spec.monday.build(Weekday::Mon)?,
            spec.tuesday.build(Weekday::Tue)?,
            spec.wednesday.build(Weekday::Wed)?,
            spec.thursday.build(Weekday::Thu)?,
            spec.friday.build(Weekday::Fri)?,
            spec.saturday.build(Weekday::Sat)?,
            spec.sunday.build(Weekday::Sun)?,
        ]))
    }
}

impl TryFrom<&CalendarExceptionSpec> for CalendarException {
    type Error = CoreError;

    fn try_from(spec: &CalendarExceptionSpec) -> CoreResult<Self> {
        match spec {
            CalendarExceptionSpec::Holiday { date, name } => Ok(Self::Holiday {
                date: *date,
                name: name.clone(),
            }),
            CalendarExceptionSpec::Closure {
                start_date,
                end_date,
                reason,
            } => Self::closure(*start_date, *end_date, reason.clone()),
        }
    }
}

impl TryFrom<&ScheduleSpec> for Schedule {
    type Error = CoreError;

    fn try_from(spec: &ScheduleSpec) -> CoreResult<Self> {
        let weekly = WeeklySchedule::try_from(&spec.weekly)?;
        let exceptions = spec
            .exceptions
            .iter()
            .map(CalendarException::try_from)
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self::new(weekly, exceptions))
    }
}

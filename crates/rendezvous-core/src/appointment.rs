//! The appointment entity and its lifecycle state machine.
//!
//! ```text
//! CONFIRMED ──cancel──────▶ CANCELLED
//!     │ ├────complete─────▶ COMPLETED
//!     │ └────mark_missed──▶ MISSED
//!     └──────reschedule───▶ CANCELLED ("rescheduled") + new CONFIRMED
//! ```
//!
//! Every state other than `CONFIRMED` is terminal.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::constants::RESCHEDULED_REASON;
use crate::interval::Interval;
use crate::types::CalendarScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Confirmed,
    Completed,
    Cancelled,
    Missed,
}

impl AppointmentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Missed => "missed",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Confirmed)
    }

    /// Whether the appointment still occupies its agent's calendar.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Cancel,
    Reschedule,
    Complete,
    MarkMissed,
}

impl LifecycleAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cancel => "cancel",
            Self::Reschedule => "reschedule",
            Self::Complete => "complete",
            Self::MarkMissed => "mark_missed",
        }
    }

    /// State reached by applying this action to a `CONFIRMED` appointment.
    #[must_use]
    pub const fn target(self) -> AppointmentStatus {
        match self {
            Self::Cancel | Self::Reschedule => AppointmentStatus::Cancelled,
            Self::Complete => AppointmentStatus::Completed,
            Self::MarkMissed => AppointmentStatus::Missed,
        }
    }
}

impl std::fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle action attempted from a state that does not allow it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot {action} appointment {appointment_id} in state {from}")]
pub struct InvalidTransition {
    pub appointment_id: Uuid,
    pub from: AppointmentStatus,
    pub action: LifecycleAction,
}

/// Everything needed to create a `CONFIRMED` appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub organization_id: Uuid,
    pub service_id: Uuid,
    pub agent_id: Uuid,
    pub attendee_id: Uuid,
    pub interval: Interval,
    pub rescheduled_from_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub service_id: Uuid,
    pub agent_id: Uuid,
    pub attendee_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub rescheduled_from_id: Option<Uuid>,
}

impl Appointment {
    /// ## Summary
    /// Creates a `CONFIRMED` appointment with a fresh time-ordered id.
    #[must_use]
    pub fn confirm(new: NewAppointment, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            organization_id: new.organization_id,
            service_id: new.service_id,
            agent_id: new.agent_id,
            attendee_id: new.attendee_id,
            date: new.interval.date(),
            start_time: new.interval.start_time(),
            end_time: new.interval.end_time(),
            status: AppointmentStatus::Confirmed,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
            cancel_reason: None,
            rescheduled_from_id: new.rescheduled_from_id,
        }
    }

    /// The `[start, end)` interval this appointment occupies.
    #[must_use]
    pub fn interval(&self) -> Interval {
        Interval {
            start: self.date.and_time(self.start_time),
            end: self.date.and_time(self.end_time),
        }
    }

    #[must_use]
    pub const fn scope(&self) -> CalendarScope {
        CalendarScope::new(self.agent_id, self.date)
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// ## Summary
    /// Applies a lifecycle action. Only `CONFIRMED` appointments move.
    ///
    /// ## Errors
    /// Returns [`InvalidTransition`] when the appointment is already terminal;
    /// the appointment is left unchanged.
    pub fn transition(
        &mut self,
        action: LifecycleAction,
        now: DateTime<Utc>,
        reason: Option<&str>,
    ) -> Result<(), InvalidTransition> {
        if self.status.is_terminal() {
            return Err(InvalidTransition {
                appointment_id: self.id,
                from: self.status,
                action,
            });
        }

        self.status = action.target();
        self.updated_at = now;
        match action {
            LifecycleAction::Cancel => {
                self.cancelled_at = Some(now);
                self.cancel_reason = reason.map(str::to_owned);
            }
            LifecycleAction::Reschedule => {
                self.cancelled_at = Some(now);
                self.cancel_reason = Some(RESCHEDULED_REASON.to_owned());
            }
            LifecycleAction::Complete | LifecycleAction::MarkMissed => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn confirmed() -> Appointment {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let start = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let interval = Interval::starting_at(date, start, TimeDelta::minutes(30)).unwrap();
        Appointment::confirm(
            NewAppointment {
                organization_id: Uuid::new_v4(),
                service_id: Uuid::new_v4(),
                agent_id: Uuid::new_v4(),
                attendee_id: Uuid::new_v4(),
                interval,
                rescheduled_from_id: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_confirm_derives_end_time_from_interval() {
        let appointment = confirmed();
        assert_eq!(appointment.status, AppointmentStatus::Confirmed);
        assert_eq!(appointment.end_time, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        assert_eq!(appointment.interval().duration(), TimeDelta::minutes(30));
        assert_eq!(appointment.scope().agent_id, appointment.agent_id);
    }

    #[test]
    fn test_cancel_records_reason_and_time() {
        let mut appointment = confirmed();
        let now = Utc::now();
        appointment
            .transition(LifecycleAction::Cancel, now, Some("attendee request"))
            .unwrap();

        assert_eq!(appointment.status, AppointmentStatus::Cancelled);
        assert_eq!(appointment.cancelled_at, Some(now));
        assert_eq!(appointment.cancel_reason.as_deref(), Some("attendee request"));
        assert!(!appointment.is_active());
    }

    #[test]
    fn test_reschedule_uses_fixed_reason() {
        let mut appointment = confirmed();
        appointment
            .transition(LifecycleAction::Reschedule, Utc::now(), Some("ignored"))
            .unwrap();
        assert_eq!(appointment.cancel_reason.as_deref(), Some(RESCHEDULED_REASON));
    }

    #[test]
    fn test_terminal_states_reject_every_action() {
        for first in [
            LifecycleAction::Cancel,
            LifecycleAction::Complete,
            LifecycleAction::MarkMissed,
        ] {
            for second in [
                LifecycleAction::Cancel,
                LifecycleAction::Reschedule,
                LifecycleAction::Complete,
                LifecycleAction::MarkMissed,
            ] {
                let mut appointment = confirmed();
                appointment.transition(first, Utc::now(), None).unwrap();
                let before = appointment.clone();

                let err = appointment.transition(second, Utc::now(), None).unwrap_err();
                assert_eq!(err.from, first.target());
                assert_eq!(err.action, second);
                assert_eq!(appointment, before, "{first} then {second} mutated state");
            }
        }
    }

    #[test]
    fn test_completed_and_missed_stay_active() {
        assert!(AppointmentStatus::Completed.is_active());
        assert!(AppointmentStatus::Missed.is_active());
        assert!(!AppointmentStatus::Cancelled.is_active());
    }
}

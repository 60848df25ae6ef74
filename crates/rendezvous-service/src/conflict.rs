//! The single overlap rule every availability and booking decision uses.

use uuid::Uuid;

use rendezvous_core::appointment::Appointment;
use rendezvous_core::interval::Interval;

/// ## Summary
/// Half-open overlap: `[a.start, a.end)` and `[b.start, b.end)` share at
/// least one instant. Touching intervals do not overlap.
#[must_use]
pub fn overlaps(a: &Interval, b: &Interval) -> bool {
    a.overlaps(b)
}

/// ## Summary
/// The first active appointment in `appointments` that overlaps `candidate`,
/// skipping the appointment with id `exclude` if given.
#[must_use]
pub fn first_conflict<'a>(
    candidate: &Interval,
    appointments: &'a [Appointment],
    exclude: Option<Uuid>,
) -> Option<&'a Appointment> {
    appointments.iter().find(|appointment| {
        appointment.is_active()
            && Some(appointment.id) != exclude
            && overlaps(candidate, &appointment.interval())
    })
}

#[must_use]
pub fn has_conflict(
    candidate: &Interval,
    appointments: &[Appointment],
    exclude: Option<Uuid>,
) -> bool {
    first_conflict(candidate, appointments, exclude).is_some()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, TimeDelta, Utc};
    use proptest::prelude::*;
    use rendezvous_core::appointment::{LifecycleAction, NewAppointment};

    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn at(hour: u32, minute: u32, minutes: i64) -> Interval {
        Interval::starting_at(
            monday(),
            NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
            TimeDelta::minutes(minutes),
        )
        .unwrap()
    }

    fn booked(interval: Interval) -> Appointment {
        Appointment::confirm(
            NewAppointment {
                organization_id: Uuid::from_u128(1),
                service_id: Uuid::from_u128(2),
                agent_id: Uuid::from_u128(3),
                attendee_id: Uuid::from_u128(4),
                interval,
                rescheduled_from_id: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_touching_intervals_do_not_conflict() {
        assert!(!overlaps(&at(9, 0, 30), &at(9, 30, 30)));
        assert!(!overlaps(&at(9, 30, 30), &at(9, 0, 30)));
        assert!(overlaps(&at(9, 0, 31), &at(9, 30, 30)));
    }

    #[test]
    fn test_cancelled_appointments_free_their_interval() {
        let mut appointment = booked(at(10, 0, 60));
        let calendar = [appointment.clone()];
        assert!(has_conflict(&at(10, 30, 30), &calendar, None));

        appointment
            .transition(LifecycleAction::Cancel, Utc::now(), None)
            .unwrap();
        assert!(!has_conflict(&at(10, 30, 30), &[appointment], None));
    }

    #[test]
    fn test_excluded_appointment_is_ignored() {
        let appointment = booked(at(10, 0, 60));
        let id = appointment.id;
        let calendar = [appointment];
        assert!(!has_conflict(&at(10, 0, 60), &calendar, Some(id)));
        assert_eq!(
            first_conflict(&at(10, 0, 60), &calendar, None).map(|a| a.id),
            Some(id)
        );
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(
            a_start in 0_u32..1_380, a_len in 1_i64..60,
            b_start in 0_u32..1_380, b_len in 1_i64..60,
        ) {
            let a = at(a_start / 60, a_start % 60, a_len);
            let b = at(b_start / 60, b_start % 60, b_len);
            prop_assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
            prop_assert!(overlaps(&a, &a));
        }

        #[test]
        fn prop_overlap_matches_shared_minutes(
            a_start in 0_u32..1_380, a_len in 1_i64..60,
            b_start in 0_u32..1_380, b_len in 1_i64..60,
        ) {
            let a = at(a_start / 60, a_start % 60, a_len);
            let b = at(b_start / 60, b_start % 60, b_len);
            let a_end = i64::from(a_start) + a_len;
            let b_end = i64::from(b_start) + b_len;
            let shared = (i64::from(a_start)..a_end)
                .any(|minute| (i64::from(b_start)..b_end).contains(&minute));
            prop_assert_eq!(overlaps(&a, &b), shared);
        }
    }
}

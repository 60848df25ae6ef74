//! Domain events emitted after a transition commits.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::appointment::Appointment;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum DomainEvent {
    AppointmentBooked {
        appointment: Appointment,
    },
    AppointmentCancelled {
        appointment: Appointment,
    },
    AppointmentRescheduled {
        previous: Appointment,
        replacement: Appointment,
    },
    AppointmentCompleted {
        appointment: Appointment,
    },
    AppointmentMissed {
        appointment: Appointment,
    },
}

impl DomainEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AppointmentBooked { .. } => "AppointmentBooked",
            Self::AppointmentCancelled { .. } => "AppointmentCancelled",
            Self::AppointmentRescheduled { .. } => "AppointmentRescheduled",
            Self::AppointmentCompleted { .. } => "AppointmentCompleted",
            Self::AppointmentMissed { .. } => "AppointmentMissed",
        }
    }

    /// The appointment the event is about; the replacement for reschedules.
    #[must_use]
    pub const fn appointment(&self) -> &Appointment {
        match self {
            Self::AppointmentBooked { appointment }
            | Self::AppointmentCancelled { appointment }
            | Self::AppointmentCompleted { appointment }
            | Self::AppointmentMissed { appointment } => appointment,
            Self::AppointmentRescheduled { replacement, .. } => replacement,
        }
    }

    #[must_use]
    pub const fn appointment_id(&self) -> Uuid {
        self.appointment().id
    }
}

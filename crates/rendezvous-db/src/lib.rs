//! Appointment persistence.
//!
//! The engine talks to storage through [`db::AppointmentStore`] and the
//! transactions it opens ([`db::StoreTx`]). Two implementations ship here:
//! [`db::memory::MemoryStore`] for tests and single-process deployments, and
//! [`db::postgres::PgStore`] backed by `diesel-async`.

pub mod db;
pub mod error;
pub mod model;

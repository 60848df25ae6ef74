//! Domain model shared across the rendezvous workspace.
//!
//! - `schedule`: weekly opening hours and calendar exceptions
//! - `interval`: half-open time intervals and date ranges
//! - `appointment`: the appointment entity and its lifecycle state machine
//! - `event`: domain events emitted on successful transitions
//! - `types`: small shared value types
//! - `config`: application settings
//! - `constants`: route components shared by the HTTP layer

pub mod appointment;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod interval;
pub mod schedule;
pub mod types;

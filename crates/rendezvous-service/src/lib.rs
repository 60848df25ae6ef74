//! Scheduling engine: availability, booking and the appointment lifecycle.

pub mod availability;
pub mod catalog;
pub mod conflict;
pub mod directory;
pub mod engine;
pub mod error;
pub mod events;

pub use engine::SchedulingEngine;

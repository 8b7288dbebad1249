//! MedTime alarm scheduling core.
//!
//! Turns each medication's daily dose times into concrete alarm occurrences,
//! delivers them through an in-process timer or the platform notification
//! service, and records how the user answered them.
//!
//! The pieces, from the bottom up:
//! - [`services::schedule::time_resolver`]: next instant of a time of day
//! - [`services::schedule::ScheduleStore`]: live, cancellable handles
//! - [`services::schedule::TriggerDispatcher`]: compression, mechanism
//!   choice, reminders and snoozes
//! - [`services::acknowledgment::AcknowledgmentHandler`]: take / snooze /
//!   cancel with history
//! - [`services::settings::SettingsGate`]: persisted alarm settings

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use error::{AlarmError, AlarmResult};

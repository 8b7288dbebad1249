// Module exports for models
// Domain types shared by the scheduling, acknowledgment and storage services

pub mod alarm_settings;
pub mod history;
pub mod medication;
pub mod schedule;

// Service module exports

pub mod acknowledgment;
pub mod database;
pub mod history;
pub mod notification;
pub mod schedule;
pub mod settings;

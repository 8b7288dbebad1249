// Schedule module
// Time resolution, occurrence planning, live handle registry and dispatch

pub mod dispatcher;
pub mod planner;
pub mod store;
pub mod time_resolver;

pub use dispatcher::{ScheduleDiagnostics, TriggerDispatcher, TEST_MEDICATION_ID};
pub use planner::{adjust_trigger, plan_medication, plan_slot, select_mechanism, PlannedOccurrence};
pub use store::{ScheduleResource, ScheduleStore};
pub use time_resolver::{next_occurrence, parse_time_of_day, RolloverPolicy};

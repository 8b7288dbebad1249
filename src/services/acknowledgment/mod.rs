//! Acknowledgment of presented alarms.
//!
//! Every occurrence moves through a small state machine:
//!
//! ```text
//! Scheduled ──► Presented ──┬──► Taken      (history: taken)
//!                           ├──► Snoozed    (new snooze schedule)
//!                           └──► Cancelled  (history: cancelled)
//! ```
//!
//! Terminal states are committed only once their side effects succeeded, so a
//! failed history write can simply be retried.

mod events;
mod handler;
mod ledger;
mod presenter;

pub use events::{AlarmEvent, AlarmEvents};
pub use handler::{AckOutcome, AcknowledgmentHandler};
pub use ledger::OccurrenceLedger;
pub use presenter::AlarmPresenter;

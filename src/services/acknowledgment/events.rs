use tokio::sync::broadcast;

use crate::models::schedule::{AlarmPayload, ScheduleKey};

const DEFAULT_CAPACITY: usize = 64;

/// Something the host UI may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum AlarmEvent {
    /// Show the acknowledgment surface for this occurrence
    Presented(AlarmPayload),
    /// Stop sound and vibration for this occurrence
    FeedbackStopped { occurrence_id: String },
    Taken(AlarmPayload),
    Snoozed {
        payload: AlarmPayload,
        next: ScheduleKey,
    },
    Cancelled(AlarmPayload),
}

/// Observer hub between the scheduling core and whatever presents alarms.
///
/// Any number of subscribers may listen; publishing with nobody subscribed is
/// not an error.
#[derive(Debug, Clone)]
pub struct AlarmEvents {
    sender: broadcast::Sender<AlarmEvent>,
}

impl Default for AlarmEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl AlarmEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlarmEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish an event. Returns how many subscribers received it.
    pub fn publish(&self, event: AlarmEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                if let AlarmEvent::Presented(payload) = &event {
                    log::warn!(
                        "No subscriber to present alarm {} for {}",
                        payload.occurrence_id,
                        payload.medication_name
                    );
                } else {
                    log::debug!("Dropped alarm event without subscribers: {:?}", event);
                }
                0
            }
        }
    }
}

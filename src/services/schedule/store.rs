//! Registry of live, cancellable schedule handles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::AbortHandle;

use crate::models::schedule::{Mechanism, ScheduleHandle, ScheduleKey};
use crate::services::notification::PlatformNotifier;

/// Underlying resource that keeps an occurrence alive.
#[derive(Debug)]
pub enum ScheduleResource {
    Timer(AbortHandle),
    Platform,
}

#[derive(Debug)]
struct LiveSchedule {
    handle: ScheduleHandle,
    resource: ScheduleResource,
}

/// Owns every live schedule handle of the process.
///
/// The live map is locked only while it is read or mutated. Releasing a
/// resource (aborting a timer task, cancelling a platform notification)
/// happens after the lock is dropped, so callbacks may call back into the
/// store. Removing a key that is already gone is always a no-op.
pub struct ScheduleStore {
    notifier: Arc<dyn PlatformNotifier>,
    live: Mutex<HashMap<ScheduleKey, LiveSchedule>>,
}

impl ScheduleStore {
    pub fn new(notifier: Arc<dyn PlatformNotifier>) -> Self {
        Self {
            notifier,
            live: Mutex::new(HashMap::new()),
        }
    }

    fn live(&self) -> MutexGuard<'_, HashMap<ScheduleKey, LiveSchedule>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a handle. Returns `false` and releases `resource` when the key is
    /// already live.
    pub fn register(&self, handle: ScheduleHandle, resource: ScheduleResource) -> bool {
        let duplicate = {
            let mut live = self.live();
            if live.contains_key(&handle.key) {
                Some(resource)
            } else {
                log::debug!("Registered {} ({:?})", handle.key, handle.mechanism);
                live.insert(handle.key.clone(), LiveSchedule { handle, resource });
                None
            }
        };

        match duplicate {
            Some(ScheduleResource::Timer(task)) => {
                task.abort();
                false
            }
            // The platform replaces a notification scheduled under the same
            // identifier, nothing to release
            Some(ScheduleResource::Platform) => false,
            None => true,
        }
    }

    /// Register a timer-backed handle, starting the timer only if the key is
    /// not live yet. The lock is held while `spawn` runs so the timer cannot
    /// observe the store before its own handle is in it.
    pub fn register_timer<F>(&self, handle: ScheduleHandle, spawn: F) -> bool
    where
        F: FnOnce() -> AbortHandle,
    {
        let mut live = self.live();
        if live.contains_key(&handle.key) {
            return false;
        }

        let task = spawn();
        log::debug!("Registered {} (timer)", handle.key);
        live.insert(
            handle.key.clone(),
            LiveSchedule {
                handle,
                resource: ScheduleResource::Timer(task),
            },
        );
        true
    }

    pub fn contains(&self, key: &ScheduleKey) -> bool {
        self.live().contains_key(key)
    }

    pub fn get(&self, key: &ScheduleKey) -> Option<ScheduleHandle> {
        self.live().get(key).map(|live| live.handle.clone())
    }

    /// Remove a handle whose occurrence just fired.
    ///
    /// Returns `None` when the handle was cancelled first; the caller must then
    /// drop the occurrence.
    pub fn complete_fired(&self, key: &ScheduleKey) -> Option<ScheduleHandle> {
        self.live().remove(key).map(|live| live.handle)
    }

    /// Cancel one handle. Unknown, fired or already cancelled keys are a no-op.
    pub fn cancel(&self, key: &ScheduleKey) -> bool {
        let removed = self.live().remove(key);
        match removed {
            Some(live) => {
                self.release(live);
                true
            }
            None => false,
        }
    }

    /// Cancel every live handle matching `predicate`. Returns how many were
    /// removed.
    pub fn cancel_matching<P>(&self, predicate: P) -> usize
    where
        P: Fn(&ScheduleKey) -> bool,
    {
        let removed: Vec<LiveSchedule> = {
            let mut live = self.live();
            let keys: Vec<ScheduleKey> = live.keys().filter(|k| predicate(k)).cloned().collect();
            keys.iter().filter_map(|k| live.remove(k)).collect()
        };

        let count = removed.len();
        for live in removed {
            self.release(live);
        }
        count
    }

    /// Cancel every handle of a medication, whatever its mechanism.
    ///
    /// Also sweeps notifications the platform still holds for the medication,
    /// which covers schedules created by an earlier process.
    pub fn cancel_all_for_medication(&self, medication_id: &str) -> usize {
        let local = self.cancel_matching(|key| key.references(medication_id));
        let swept = self.sweep_platform(|key| key.references(medication_id));

        log::info!(
            "Cancelled {} schedules for medication {} ({} platform leftovers)",
            local + swept,
            medication_id,
            swept
        );
        local + swept
    }

    /// Cancel everything this crate scheduled.
    pub fn cancel_all(&self) {
        let local = self.cancel_matching(|_| true);
        let swept = self.sweep_platform(|_| true);
        log::info!("Cancelled all schedules ({} live, {} platform leftovers)", local, swept);
    }

    /// Snapshot of live identifiers, sorted.
    pub fn list_active(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.live().keys().map(ScheduleKey::to_identifier).collect();
        ids.sort();
        ids
    }

    /// Snapshot of live handles ordered by trigger time.
    pub fn handles(&self) -> Vec<ScheduleHandle> {
        let mut handles: Vec<ScheduleHandle> =
            self.live().values().map(|live| live.handle.clone()).collect();
        handles.sort_by_key(|h| h.trigger_at);
        handles
    }

    pub fn len(&self) -> usize {
        self.live().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live().is_empty()
    }

    fn release(&self, live: LiveSchedule) {
        match live.resource {
            ScheduleResource::Timer(task) => task.abort(),
            ScheduleResource::Platform => {
                let identifier = live.handle.key.to_identifier();
                if let Err(e) = self.notifier.cancel(&identifier) {
                    log::warn!("Failed to cancel platform notification {}: {}", identifier, e);
                }
            }
        }
        log::debug!(
            "Cancelled {} ({})",
            live.handle.key,
            match live.handle.mechanism {
                Mechanism::Timer => "timer",
                Mechanism::Platform => "platform",
            }
        );
    }

    fn sweep_platform<P>(&self, predicate: P) -> usize
    where
        P: Fn(&ScheduleKey) -> bool,
    {
        let scheduled = match self.notifier.list_scheduled() {
            Ok(scheduled) => scheduled,
            Err(e) => {
                log::warn!("Could not list platform notifications: {}", e);
                return 0;
            }
        };

        let mut swept = 0;
        for notification in scheduled {
            let Some(key) = ScheduleKey::parse(&notification.identifier) else {
                continue;
            };
            if !predicate(&key) {
                continue;
            }
            match self.notifier.cancel(&notification.identifier) {
                Ok(()) => swept += 1,
                Err(e) => log::warn!(
                    "Failed to cancel platform notification {}: {}",
                    notification.identifier,
                    e
                ),
            }
        }
        swept
    }
}

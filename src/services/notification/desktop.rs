use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration as StdDuration;

use anyhow::Result;
use chrono::Local;
use notify_rust::{Notification, Timeout};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use super::{
    NotificationChannel, NotificationRequest, PermissionStatus, PlatformNotifier,
    ScheduledNotification,
};
use crate::models::schedule::AlarmPayload;

type ReceivedListener = Arc<dyn Fn(AlarmPayload) + Send + Sync>;

struct PendingNotification {
    request: NotificationRequest,
    task: AbortHandle,
}

/// Desktop stand-in for a mobile notification scheduler.
///
/// Desktop notification daemons cannot hold future notifications, so each
/// request waits in a tokio task and is shown with `notify-rust` when due.
/// Pending notifications live only as long as the process.
pub struct DesktopNotifier {
    runtime: Handle,
    display: bool,
    pending: Arc<Mutex<HashMap<String, PendingNotification>>>,
    on_received: Arc<Mutex<Option<ReceivedListener>>>,
}

impl DesktopNotifier {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            display: true,
            pending: Arc::new(Mutex::new(HashMap::new())),
            on_received: Arc::new(Mutex::new(None)),
        }
    }

    /// Notifier that tracks and delivers requests without talking to the
    /// desktop notification daemon.
    pub fn headless(runtime: Handle) -> Self {
        Self {
            display: false,
            ..Self::new(runtime)
        }
    }

    /// Register the listener told about every delivered notification.
    pub fn on_received<F>(&self, listener: F)
    where
        F: Fn(AlarmPayload) + Send + Sync + 'static,
    {
        let mut slot = self.on_received.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(listener));
    }

    fn show(request: &NotificationRequest) -> Result<()> {
        let timeout = if request.payload.show_modal {
            Timeout::Milliseconds(10000)
        } else {
            Timeout::Milliseconds(5000)
        };

        let mut notification = Notification::new();
        notification
            .summary(&request.title)
            .body(&request.body)
            .appname("MedTime")
            .timeout(timeout);
        if request.sound {
            notification.sound_name("alarm-clock-elapsed");
        }

        notification
            .show()
            .map_err(|e| anyhow::anyhow!("Failed to show notification: {}", e))?;
        Ok(())
    }
}

impl PlatformNotifier for DesktopNotifier {
    fn request_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    fn ensure_channel(&self, channel: &NotificationChannel) -> Result<()> {
        log::debug!("Desktop notifications have no channels, ignoring {}", channel.id);
        Ok(())
    }

    fn schedule_at(&self, request: &NotificationRequest) -> Result<()> {
        let delay = (request.trigger_at - Local::now())
            .to_std()
            .unwrap_or_else(|_| StdDuration::from_secs(0));

        let identifier = request.identifier.clone();
        let display = self.display;
        let pending = Arc::clone(&self.pending);
        let on_received = Arc::clone(&self.on_received);

        let mut map = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            let due = pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&identifier);
            let Some(due) = due else {
                return;
            };

            if display {
                if let Err(e) = Self::show(&due.request) {
                    log::error!("{}", e);
                }
            }

            let listener = on_received
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(listener) = listener {
                listener(due.request.payload);
            }
        });

        if let Some(replaced) = map.insert(
            request.identifier.clone(),
            PendingNotification {
                request: request.clone(),
                task: task.abort_handle(),
            },
        ) {
            replaced.task.abort();
        }
        Ok(())
    }

    fn cancel(&self, identifier: &str) -> Result<()> {
        let removed = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identifier);
        if let Some(removed) = removed {
            removed.task.abort();
        }
        Ok(())
    }

    fn list_scheduled(&self) -> Result<Vec<ScheduledNotification>> {
        let map = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(map
            .values()
            .map(|p| ScheduledNotification {
                identifier: p.request.identifier.clone(),
                payload: Some(p.request.payload.clone()),
                trigger_at: Some(p.request.trigger_at),
            })
            .collect())
    }
}

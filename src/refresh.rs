//! Outbound "reload widget timelines" signal.
//!
//! The store calls a [`WidgetRefresher`] after every committed mutation; the
//! host wires it to whatever the platform widget centre needs.

use log::debug;
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RefreshEvent {
    PhotoSaved { id: String },
    PhotoDeleted { id: String },
    IndexRepaired { entries: usize },
}

pub trait WidgetRefresher: Send + Sync {
    fn reload_all_timelines(&self, event: RefreshEvent);
}

/// Ignores every refresh; for hosts without widgets (and most tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRefresher;

impl WidgetRefresher for NoopRefresher {
    fn reload_all_timelines(&self, event: RefreshEvent) {
        debug!("Widget refresh skipped: {event:?}");
    }
}

/// Fans refresh events out to in-process subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastRefresher {
    sender: broadcast::Sender<RefreshEvent>,
}

impl BroadcastRefresher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.sender.subscribe()
    }
}

impl WidgetRefresher for BroadcastRefresher {
    fn reload_all_timelines(&self, event: RefreshEvent) {
        // No subscribers is fine: nobody is showing a widget right now.
        if self.sender.send(event).is_err() {
            debug!("Widget refresh had no subscribers");
        }
    }
}

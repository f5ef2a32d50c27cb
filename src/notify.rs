//! Outbound state-change notifications.
//!
//! Delivery is fire-and-forget and at-most-once: a subscriber that falls
//! behind the channel capacity loses the oldest messages and is expected to
//! re-fetch through the query side.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::{Case, Command, Device, Event};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "topic", content = "data")]
pub enum Notification {
    #[serde(rename = "event:new")]
    EventNew(Event),
    #[serde(rename = "case:new")]
    CaseNew(Case),
    #[serde(rename = "case:update")]
    CaseUpdate(Case),
    #[serde(rename = "device:update")]
    DeviceUpdate(Device),
    #[serde(rename = "command:update")]
    CommandUpdate(Command),
}

impl Notification {
    pub fn topic(&self) -> &'static str {
        match self {
            Notification::EventNew(_) => "event:new",
            Notification::CaseNew(_) => "case:new",
            Notification::CaseUpdate(_) => "case:update",
            Notification::DeviceUpdate(_) => "device:update",
            Notification::CommandUpdate(_) => "command:update",
        }
    }
}

/// Publish side handed to every component that reports state changes
pub trait Notifier: Send + Sync {
    fn publish(&self, notification: Notification);
}

/// Fan-out over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Notifier for BroadcastNotifier {
    fn publish(&self, notification: Notification) {
        let topic = notification.topic();
        // No subscribers is not an error; nobody is listening right now.
        match self.tx.send(notification) {
            Ok(receivers) => trace!(topic, receivers, "notification published"),
            Err(_) => trace!(topic, "notification dropped, no subscribers"),
        }
    }
}

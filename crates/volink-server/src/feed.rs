// Live notification feed
//
// New notification rows are fanned out over a process-wide broadcast
// channel; each SSE subscriber filters for its own recipient id and runs
// the stream through a dedupe cursor so a re-delivered event id is never
// surfaced twice.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use tokio::sync::broadcast;
use volink_storage::NotificationRow;

/// Event pushed to live subscribers; mirrors the stored notification row.
#[derive(Debug, Clone, Serialize)]
pub struct FeedEvent {
    pub id: String,
    pub recipient_id: String,
    pub notification_type: String,
    pub content: String,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FeedEvent {
    pub fn from_row(row: &NotificationRow) -> Self {
        Self {
            id: row.id.clone(),
            recipient_id: row.recipient_id.clone(),
            notification_type: row.notification_type.clone(),
            content: row.content.clone(),
            metadata: row.metadata.clone(),
            created_at: row.created_at,
        }
    }
}

/// Broadcast hub for live notification events.
#[derive(Clone)]
pub struct NotificationFeed {
    sender: broadcast::Sender<FeedEvent>,
}

impl NotificationFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; a send error only means nobody is listening.
    pub fn publish(&self, event: FeedEvent) {
        let _ = self.sender.send(event);
    }
}

/// Sliding-window dedupe over event ids.
///
/// Remembers the most recent `capacity` ids; `accept` answers whether an
/// id is new and records it.
pub struct FeedCursor {
    seen: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl FeedCursor {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub fn accept(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(id.to_string());
        self.order.push_back(id.to_string());
        true
    }
}

//! Notification feed
//!
//! Ephemeral per-user events (success, info, simulated email). Each entry
//! removes itself after a fixed delay; nothing is persisted.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::metrics::{NOTIFICATIONS_ACTIVE, NOTIFICATIONS_TOTAL};

/// Kind of user-facing event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Info,
    Email,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Email => "email",
        }
    }
}

/// A single feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Millisecond timestamp, bumped to stay strictly increasing
    pub id: u64,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

type Feeds = HashMap<String, Vec<Notification>>;

/// In-memory notification bus keyed by user id
pub struct NotificationBus {
    feeds: Arc<RwLock<Feeds>>,
    last_id: AtomicU64,
    ttl: Duration,
}

impl NotificationBus {
    pub fn new(ttl: Duration) -> Self {
        Self {
            feeds: Arc::new(RwLock::new(HashMap::new())),
            last_id: AtomicU64::new(0),
            ttl,
        }
    }

    fn next_id(&self) -> u64 {
        let now_ms = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let previous = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now_ms.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now_ms.max(previous + 1)
    }

    /// Append an entry to `user_id`'s feed and schedule its removal
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn notify(
        &self,
        user_id: &str,
        message: impl Into<String>,
        kind: NotificationKind,
    ) -> u64 {
        let notification = Notification {
            id: self.next_id(),
            message: message.into(),
            kind,
            created_at: Utc::now(),
        };
        let id = notification.id;

        tracing::debug!(user_id, id, kind = kind.as_str(), message = %notification.message, "Notification queued");

        self.feeds
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(notification);
        NOTIFICATIONS_TOTAL.with_label_values(&[kind.as_str()]).inc();
        NOTIFICATIONS_ACTIVE.inc();

        let feeds = Arc::clone(&self.feeds);
        let ttl = self.ttl;
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            remove_entry(&feeds, &user_id, id).await;
        });

        id
    }

    /// Remove an entry before it expires
    ///
    /// Returns false when the entry is already gone.
    pub async fn dismiss(&self, user_id: &str, id: u64) -> bool {
        remove_entry(&self.feeds, user_id, id).await
    }

    /// Current feed for `user_id` in insertion order
    pub async fn list(&self, user_id: &str) -> Vec<Notification> {
        self.feeds
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

async fn remove_entry(feeds: &RwLock<Feeds>, user_id: &str, id: u64) -> bool {
    let mut feeds = feeds.write().await;
    let Some(feed) = feeds.get_mut(user_id) else {
        return false;
    };

    let before = feed.len();
    feed.retain(|notification| notification.id != id);
    let removed = feed.len() < before;
    if feed.is_empty() {
        feeds.remove(user_id);
    }

    if removed {
        NOTIFICATIONS_ACTIVE.dec();
    }
    removed
}

/// Simulated email dispatch
///
/// Nothing leaves the process: each message is logged and surfaced to the
/// recipient as an `email` notification.
#[derive(Clone)]
pub struct Mailer {
    bus: Arc<NotificationBus>,
}

impl Mailer {
    pub fn new(bus: Arc<NotificationBus>) -> Self {
        Self { bus }
    }

    pub async fn send(&self, user_id: &str, to: &str, subject: &str, body: &str) {
        tracing::info!(to, subject, body, "Simulated email sent");
        self.bus
            .notify(
                user_id,
                format!("Email sent to {to}: {subject}"),
                NotificationKind::Email,
            )
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(6);

    #[tokio::test(start_paused = true)]
    async fn entries_keep_insertion_order_and_are_not_deduplicated() {
        let bus = NotificationBus::new(TTL);

        let first = bus.notify("u1", "Saved", NotificationKind::Success).await;
        let second = bus.notify("u1", "Saved", NotificationKind::Success).await;
        bus.notify("u2", "Other user", NotificationKind::Info).await;

        let feed = bus.list("u1").await;
        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].id, first);
        assert_eq!(feed[1].id, second);
        assert!(second > first);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let bus = NotificationBus::new(TTL);
        bus.notify("u1", "Welcome", NotificationKind::Info).await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(bus.list("u1").await.len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(bus.list("u1").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_removes_early() {
        let bus = NotificationBus::new(TTL);
        let id = bus.notify("u1", "Welcome", NotificationKind::Info).await;
        let kept = bus.notify("u1", "Second", NotificationKind::Info).await;

        assert!(bus.dismiss("u1", id).await);
        assert!(!bus.dismiss("u1", id).await);

        let feed = bus.list("u1").await;
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, kept);
    }

    #[tokio::test(start_paused = true)]
    async fn mailer_surfaces_email_notification() {
        let bus = Arc::new(NotificationBus::new(TTL));
        let mailer = Mailer::new(Arc::clone(&bus));

        mailer
            .send("u1", "student@inst.example", "Welcome to Intro", "See you in class")
            .await;

        let feed = bus.list("u1").await;
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].kind, NotificationKind::Email);
        assert!(feed[0].message.contains("student@inst.example"));
    }
}

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// What caused a toast to be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    /// A single notification that arrived since the previous poll.
    NewNotification,
    /// The once-per-session "you have N unread" summary.
    UnreadSummary,
    /// A user-initiated action failed (bad room code, failed send).
    ActionFailed,
}

/// A transient, user-visible alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub body: String,
    /// Notification id when the toast is about one inbox item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<String>,
    pub ttl_secs: u64,
}

impl Toast {
    /// Toast for one newly arrived notification, shown for 5 seconds.
    pub fn new_notification(
        id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            kind: ToastKind::NewNotification,
            title: title.into(),
            body: body.into(),
            notification_id: Some(id.into()),
            ttl_secs: 5,
        }
    }

    /// Aggregate unread summary shown after the first snapshot of a session.
    pub fn unread_summary(count: usize) -> Self {
        Self {
            kind: ToastKind::UnreadSummary,
            title: "Welcome back!".to_string(),
            body: format!("You have {count} unread notifications."),
            notification_id: None,
            ttl_secs: 5,
        }
    }

    /// Error toast for a failed user action, shown for 8 seconds.
    pub fn action_failed(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::ActionFailed,
            title: title.into(),
            body: body.into(),
            notification_id: None,
            ttl_secs: 8,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug)]
struct Shown {
    toast: Toast,
    shown_at: Instant,
}

/// A bounded queue of visible toasts that auto-evicts expired entries.
#[derive(Debug)]
pub struct ToastQueue {
    items: VecDeque<Shown>,
    capacity: usize,
}

impl ToastQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Pushes a toast, evicting expired entries first.
    /// If still at capacity after eviction, the oldest entry is removed.
    pub fn push(&mut self, toast: Toast) {
        self.push_at(toast, Instant::now());
    }

    fn push_at(&mut self, toast: Toast, shown_at: Instant) {
        self.evict_expired(shown_at);
        if self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(Shown { toast, shown_at });
    }

    /// Returns all currently visible (non-expired) toasts, oldest first.
    pub fn visible(&mut self) -> Vec<&Toast> {
        self.evict_expired(Instant::now());
        self.items.iter().map(|s| &s.toast).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn evict_expired(&mut self, now: Instant) {
        self.items
            .retain(|s| now.saturating_duration_since(s.shown_at) < s.toast.ttl());
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(8)
    }
}

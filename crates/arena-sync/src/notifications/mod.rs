//! Notification inbox synchronization over a polled, non-delta feed.

mod service;
mod synchronizer;

pub use service::{NotificationService, NotificationsConfig};
pub use synchronizer::{NotificationSynchronizer, SnapshotOutcome, SyncPhase};

use std::collections::HashSet;

use arena_common::Toast;

use crate::poll::{AppliedMark, Stamp};
use crate::protocol::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No snapshot with items has been seen this session.
    Init,
    Steady,
}

/// Result of applying one snapshot.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SnapshotOutcome {
    /// At most one toast per snapshot.
    pub toasts: Vec<Toast>,
    pub total: usize,
    pub unread: usize,
}

/// State machine reconciling polled inbox snapshots with local read
/// actions.
///
/// The seen cursor is the id of the newest item that has already been
/// accounted for. A snapshot whose newest id differs from the cursor
/// brings new arrivals; only the newest of them may raise a toast.
/// Read flags set locally stick until the server agrees, since the
/// background commit may land after the next poll.
#[derive(Debug)]
pub struct NotificationSynchronizer {
    phase: SyncPhase,
    cursor: Option<String>,
    items: Vec<Notification>,
    locally_read: HashSet<String>,
    summary_enabled: bool,
    summary_shown: bool,
    applied: AppliedMark,
}

impl NotificationSynchronizer {
    /// `unread_summary` enables the once-per-session "N unread" toast.
    pub fn new(unread_summary: bool) -> Self {
        Self {
            phase: SyncPhase::Init,
            cursor: None,
            items: Vec::new(),
            locally_read: HashSet::new(),
            summary_enabled: unread_summary,
            summary_shown: false,
            applied: AppliedMark::default(),
        }
    }

    /// Applies a snapshot fetched under `stamp`. Returns `None` when a
    /// later fetch has already been applied.
    pub fn apply_snapshot(
        &mut self,
        stamp: Stamp,
        mut snapshot: Vec<Notification>,
    ) -> Option<SnapshotOutcome> {
        if !self.applied.admit(stamp) {
            return None;
        }

        // Newest first; a stable sort keeps server order for equal times.
        snapshot.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        // Forget local flags the server has caught up with or dropped.
        self.locally_read.retain(|id| {
            snapshot
                .iter()
                .any(|n| &n.id == id && !n.is_read)
        });
        for n in snapshot.iter_mut() {
            if self.locally_read.contains(&n.id) {
                n.is_read = true;
            }
        }
        self.items = snapshot;

        let mut toasts = Vec::new();
        let newest = self.items.first();
        match (self.phase, newest) {
            (SyncPhase::Init, None) => {}
            (SyncPhase::Init, Some(newest)) => {
                self.cursor = Some(newest.id.clone());
                self.phase = SyncPhase::Steady;
                let unread = self.unread_count();
                if self.summary_enabled && !self.summary_shown && unread > 0 {
                    self.summary_shown = true;
                    toasts.push(Toast::unread_summary(unread));
                }
            }
            (SyncPhase::Steady, None) => {}
            (SyncPhase::Steady, Some(newest)) => {
                if self.cursor.as_deref() != Some(newest.id.as_str()) {
                    self.cursor = Some(newest.id.clone());
                    if !newest.is_read {
                        toasts.push(Toast::new_notification(
                            newest.id.clone(),
                            newest.title.clone(),
                            newest.content.clone(),
                        ));
                    }
                }
            }
        }

        Some(SnapshotOutcome {
            toasts,
            total: self.items.len(),
            unread: self.unread_count(),
        })
    }

    /// Marks one item read locally. Returns true if it was unread.
    pub fn mark_read(&mut self, id: &str) -> bool {
        let Some(item) = self.items.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if item.is_read {
            return false;
        }
        item.is_read = true;
        self.locally_read.insert(id.to_string());
        true
    }

    /// Clears the local list. The cursor is kept so the next snapshot does
    /// not re-announce the same newest item.
    pub fn mark_all_read(&mut self) {
        self.items.clear();
        self.locally_read.clear();
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.items
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.is_read).count()
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }
}

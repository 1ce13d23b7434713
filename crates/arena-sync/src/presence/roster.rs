use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::poll::{AppliedMark, Stamp};
use crate::protocol::{CommunityMember, PresenceRecord};

use super::online::is_online;

/// A roster row as seen by a viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterMember {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub online: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The record carried a newer timestamp and was stored.
    Advanced,
    /// The stored timestamp is the same or newer; nothing changed.
    Stale,
    /// The user is not on the roster.
    Unknown,
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    avatar_url: Option<String>,
    last_seen: Option<DateTime<Utc>>,
}

/// Last-seen timestamps for the users a viewer is rendering.
///
/// Polled snapshots and live feed updates both land here. Updates are
/// ordered by the server's timestamp, never by arrival: a record only
/// replaces the stored one when its `last_seen` is strictly newer.
#[derive(Debug, Default)]
pub struct PresenceRoster {
    members: HashMap<String, Entry>,
    applied: AppliedMark,
}

fn newer(candidate: Option<DateTime<Utc>>, stored: Option<DateTime<Utc>>) -> bool {
    match (candidate, stored) {
        (Some(c), Some(s)) => c > s,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

impl PresenceRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the member set with a polled snapshot.
    ///
    /// Members missing from the snapshot are dropped. For members already
    /// known, the newer of the stored and snapshot timestamps wins.
    pub fn seed(&mut self, snapshot: &[CommunityMember]) {
        let mut next = HashMap::with_capacity(snapshot.len());
        for member in snapshot {
            let stored = self.members.get(&member.id).and_then(|e| e.last_seen);
            let last_seen = if newer(member.last_seen, stored) {
                member.last_seen
            } else {
                stored
            };
            next.insert(
                member.id.clone(),
                Entry {
                    name: member.name.clone(),
                    avatar_url: member.avatar_url.clone(),
                    last_seen,
                },
            );
        }
        self.members = next;
    }

    /// [`Self::seed`] for a snapshot fetched under `stamp`. Returns false
    /// and leaves the roster alone when a later fetch was already applied.
    pub fn seed_stamped(&mut self, stamp: Stamp, snapshot: &[CommunityMember]) -> bool {
        if !self.applied.admit(stamp) {
            return false;
        }
        self.seed(snapshot);
        true
    }

    pub fn apply(&mut self, record: &PresenceRecord) -> ApplyOutcome {
        let Some(entry) = self.members.get_mut(&record.user_id) else {
            return ApplyOutcome::Unknown;
        };
        if newer(record.last_seen, entry.last_seen) {
            entry.last_seen = record.last_seen;
            ApplyOutcome::Advanced
        } else {
            ApplyOutcome::Stale
        }
    }

    pub fn last_seen(&self, user_id: &str) -> Option<DateTime<Utc>> {
        self.members.get(user_id).and_then(|e| e.last_seen)
    }

    pub fn is_online(&self, user_id: &str, now: DateTime<Utc>, threshold: Duration) -> bool {
        is_online(self.last_seen(user_id), now, threshold)
    }

    /// Online members, not counting `exclude` (usually the viewer).
    pub fn online_count(&self, now: DateTime<Utc>, threshold: Duration, exclude: Option<&str>) -> usize {
        self.members
            .iter()
            .filter(|(id, _)| Some(id.as_str()) != exclude)
            .filter(|(_, e)| is_online(e.last_seen, now, threshold))
            .count()
    }

    /// Members, most recently seen first.
    pub fn members(&self, now: DateTime<Utc>, threshold: Duration) -> Vec<RosterMember> {
        let mut rows: Vec<RosterMember> = self
            .members
            .iter()
            .map(|(id, e)| RosterMember {
                id: id.clone(),
                name: e.name.clone(),
                avatar_url: e.avatar_url.clone(),
                last_seen: e.last_seen,
                online: is_online(e.last_seen, now, threshold),
            })
            .collect();
        rows.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then_with(|| a.name.cmp(&b.name)));
        rows
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const THRESHOLD: Duration = Duration::from_secs(120);

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn member(id: &str, last_seen: Option<DateTime<Utc>>) -> CommunityMember {
        CommunityMember {
            id: id.into(),
            name: id.to_uppercase(),
            avatar_url: None,
            last_seen,
            bio: None,
            interests: Vec::new(),
        }
    }

    fn record(id: &str, last_seen: Option<DateTime<Utc>>) -> PresenceRecord {
        PresenceRecord {
            user_id: id.into(),
            last_seen,
        }
    }

    #[test]
    fn older_record_arriving_late_is_ignored() {
        let mut roster = PresenceRoster::new();
        roster.seed(&[member("u1", Some(at(0)))]);

        assert_eq!(roster.apply(&record("u1", Some(at(60)))), ApplyOutcome::Advanced);
        assert_eq!(roster.apply(&record("u1", Some(at(30)))), ApplyOutcome::Stale);
        assert_eq!(roster.last_seen("u1"), Some(at(60)));
    }

    #[test]
    fn null_never_overwrites_a_timestamp() {
        let mut roster = PresenceRoster::new();
        roster.seed(&[member("u1", Some(at(0)))]);
        assert_eq!(roster.apply(&record("u1", None)), ApplyOutcome::Stale);
        assert_eq!(roster.last_seen("u1"), Some(at(0)));
    }

    #[test]
    fn unknown_users_are_not_added() {
        let mut roster = PresenceRoster::new();
        assert_eq!(roster.apply(&record("ghost", Some(at(0)))), ApplyOutcome::Unknown);
        assert!(roster.is_empty());
    }

    #[test]
    fn reseeding_keeps_newer_live_timestamp() {
        let mut roster = PresenceRoster::new();
        roster.seed(&[member("u1", Some(at(0))), member("u2", None)]);
        roster.apply(&record("u1", Some(at(90))));

        // A snapshot fetched before the live update must not roll it back.
        roster.seed(&[member("u1", Some(at(10))), member("u3", Some(at(5)))]);
        assert_eq!(roster.last_seen("u1"), Some(at(90)));
        assert_eq!(roster.len(), 2);
        assert!(roster.last_seen("u2").is_none());
    }

    #[test]
    fn stale_roster_fetch_is_dropped() {
        let seq = crate::poll::Sequencer::new();
        let early = seq.next();
        let late = seq.next();

        let mut roster = PresenceRoster::new();
        assert!(roster.seed_stamped(late, &[member("a", None), member("b", None)]));
        assert!(!roster.seed_stamped(early, &[member("a", None)]));
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn online_count_excludes_viewer() {
        let mut roster = PresenceRoster::new();
        roster.seed(&[
            member("me", Some(at(100))),
            member("a", Some(at(90))),
            member("b", Some(at(-200))),
            member("c", None),
        ]);
        let now = at(100);
        assert_eq!(roster.online_count(now, THRESHOLD, None), 2);
        assert_eq!(roster.online_count(now, THRESHOLD, Some("me")), 1);
        assert!(roster.is_online("a", now, THRESHOLD));
        assert!(!roster.is_online("b", now, THRESHOLD));
        assert!(!roster.is_online("c", now, THRESHOLD));
    }

    #[test]
    fn members_sorted_most_recent_first() {
        let mut roster = PresenceRoster::new();
        roster.seed(&[member("old", Some(at(0))), member("never", None), member("new", Some(at(50)))]);
        let rows = roster.members(at(60), THRESHOLD);
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["new", "old", "never"]);
        assert!(rows[0].online);
        assert!(!rows[2].online);
    }
}

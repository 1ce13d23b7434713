use std::sync::atomic::{AtomicU64, Ordering};

/// Issue-order number of one request within a polling stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp(u64);

impl Stamp {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Hands out strictly increasing stamps. Shared by every task that issues
/// requests for the same stream.
#[derive(Debug, Default)]
pub struct Sequencer {
    issued: AtomicU64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> Stamp {
        Stamp(self.issued.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// The newest stamp whose response has been applied.
///
/// Lives inside the state lock of the stream so that the check and the
/// write happen atomically.
#[derive(Debug, Default, Clone, Copy)]
pub struct AppliedMark {
    last: Option<Stamp>,
}

impl AppliedMark {
    /// Records `stamp` and returns true if it is newer than anything
    /// applied so far; returns false for a stale response.
    pub fn admit(&mut self, stamp: Stamp) -> bool {
        match self.last {
            Some(last) if stamp <= last => false,
            _ => {
                self.last = Some(stamp);
                true
            }
        }
    }

    pub fn last(&self) -> Option<Stamp> {
        self.last
    }
}

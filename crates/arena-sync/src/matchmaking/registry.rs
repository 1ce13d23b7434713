use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::SyncError;

/// Rooms currently polled by some coordinator of this client.
///
/// Shared by every coordinator a session hands out, so two views never
/// poll the same room.
#[derive(Debug, Clone, Default)]
pub struct RoomRegistry {
    active: Arc<Mutex<HashSet<String>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn claim(&self, room_id: &str) -> Result<RoomClaim, SyncError> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| SyncError::InvalidState("room registry poisoned".into()))?;
        if !active.insert(room_id.to_string()) {
            return Err(SyncError::AlreadyPolling(room_id.to_string()));
        }
        Ok(RoomClaim {
            registry: self.clone(),
            room_id: room_id.to_string(),
        })
    }

    pub fn is_polled(&self, room_id: &str) -> bool {
        self.active
            .lock()
            .map(|active| active.contains(room_id))
            .unwrap_or(false)
    }
}

/// Releases the room when dropped.
#[derive(Debug)]
pub(crate) struct RoomClaim {
    registry: RoomRegistry,
    room_id: String,
}

impl Drop for RoomClaim {
    fn drop(&mut self) {
        if let Ok(mut active) = self.registry.active.lock() {
            active.remove(&self.room_id);
        }
    }
}

//! Quiz-room matchmaking: create or join by code, then poll until the
//! host starts the match.

mod code;
mod coordinator;
mod registry;
mod types;

pub use code::RoomCode;
pub use coordinator::RoomCoordinator;
pub use registry::RoomRegistry;
pub use types::{MatchmakingConfig, Participant, Role, Room, RoomPhase, RoomState};

pub mod errors;
pub mod events;
pub mod id;
pub mod toast;

pub use errors::{ArenaError, ConfigError};
pub use events::{Event, EventBus};
pub use id::{new_correlation_id, SessionId};
pub use toast::{Toast, ToastKind, ToastQueue};

pub type Result<T> = std::result::Result<T, ArenaError>;

//! Direct-message conversations, polled one at a time.

mod history;
mod poller;

pub use history::{ConversationHistory, DEFAULT_HISTORY_LIMIT};
pub use poller::{ConversationPoller, MessagesConfig};

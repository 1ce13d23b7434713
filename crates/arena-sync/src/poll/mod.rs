//! Timer-driven polling primitives shared by every sync stream.
//!
//! A stream issues a [`Stamp`] before each request and applies the
//! response only if [`AppliedMark::admit`] accepts it, so a response that
//! resolves after a newer one is dropped. [`PollHandle`] owns the timer
//! task and tears it down on `stop()` or drop.

mod handle;
mod sequence;

pub use handle::PollHandle;
pub use sequence::{AppliedMark, Sequencer, Stamp};

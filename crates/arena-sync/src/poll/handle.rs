use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// A running interval task.
///
/// The first tick fires immediately. Each tick spawns its future
/// without waiting for the previous one, so slow requests may overlap;
/// streams order them with a `Sequencer`. A tick that returns
/// `ControlFlow::Break` ends the loop. Stopping or dropping the handle
/// aborts the loop together with every in-flight tick.
pub struct PollHandle {
    name: &'static str,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        debug!(name, period_ms = period.as_millis() as u64, "poll started");
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut in_flight = JoinSet::new();

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        in_flight.spawn(tick());
                    }
                    Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                        match joined {
                            Ok(ControlFlow::Break(())) => {
                                debug!(name, "poll finished");
                                break;
                            }
                            Ok(ControlFlow::Continue(())) => {}
                            Err(e) if e.is_panic() => warn!(name, "poll tick panicked"),
                            Err(_) => {}
                        }
                    }
                }
            }
        });

        Self {
            name,
            task: Some(task),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True until the handle is stopped or a tick breaks the loop.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(name = self.name, "poll stopped");
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PollHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollHandle")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

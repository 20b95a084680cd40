//! Event hooks and the background runner that feeds them.

use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bus::Subscription;
use crate::event::{HostEvent, PART_CREATED};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("malformed event payload: {0}")]
    Payload(String),

    #[error("hook failed: {0}")]
    Failed(String),
}

/// Reacts to host events.
///
/// `wants_process_event` is a cheap name filter; only events it accepts are
/// passed to `process_event`.
#[async_trait]
pub trait EventHook: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn wants_process_event(&self, event: &str) -> bool;

    async fn process_event(&self, event: &HostEvent) -> Result<(), HookError>;
}

/// Logs every `part_part.created` event with its arguments.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPartCreated;

#[async_trait]
impl EventHook for LogPartCreated {
    fn name(&self) -> &'static str {
        "log-part-created"
    }

    fn wants_process_event(&self, event: &str) -> bool {
        event == PART_CREATED
    }

    async fn process_event(&self, event: &HostEvent) -> Result<(), HookError> {
        info!(
            event = %event.name,
            args = ?event.args,
            kwargs = ?event.kwargs,
            "processing host event"
        );
        Ok(())
    }
}

/// Run one event through every interested hook.
///
/// Hook failures are logged and do not stop later hooks. Returns the number
/// of hooks that processed the event successfully.
pub async fn dispatch(hooks: &[Arc<dyn EventHook>], event: &HostEvent) -> usize {
    let mut handled = 0;
    for hook in hooks {
        if !hook.wants_process_event(&event.name) {
            continue;
        }
        match hook.process_event(event).await {
            Ok(()) => handled += 1,
            Err(e) => warn!(hook = hook.name(), event = %event.name, error = %e, "event hook failed"),
        }
    }
    handled
}

/// Handle for the running hook runner.
#[derive(Debug)]
pub struct HookRunnerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl HookRunnerHandle {
    /// Stop the runner thread and wait for it to exit.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Consumes a bus subscription on a dedicated thread and drives the hooks on
/// the given tokio runtime.
pub struct HookRunner {
    hooks: Vec<Arc<dyn EventHook>>,
    poll_interval: Duration,
}

impl HookRunner {
    pub fn new(hooks: Vec<Arc<dyn EventHook>>) -> Self {
        Self {
            hooks,
            poll_interval: Duration::from_millis(250),
        }
    }

    pub fn spawn(
        self,
        subscription: Subscription<HostEvent>,
        runtime: tokio::runtime::Handle,
    ) -> std::io::Result<HookRunnerHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name("event-hooks".to_string())
            .spawn(move || self.run(subscription, shutdown_rx, runtime))?;

        Ok(HookRunnerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }

    fn run(
        self,
        subscription: Subscription<HostEvent>,
        shutdown_rx: mpsc::Receiver<()>,
        runtime: tokio::runtime::Handle,
    ) {
        info!(hooks = self.hooks.len(), "event hook runner started");

        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match subscription.recv_timeout(self.poll_interval) {
                Ok(event) => {
                    let handled = runtime.block_on(dispatch(&self.hooks, &event));
                    debug!(event = %event.name, handled, "host event dispatched");
                }
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        info!("event hook runner stopped");
    }
}

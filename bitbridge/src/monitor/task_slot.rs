use std::{fmt, future::Future, sync::Arc};

use tokio::{runtime::Handle, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<Result<()>>,
}

/// Start/stop bookkeeping shared by both monitor directions.
///
/// Holds at most one running task. Starting an occupied slot or stopping an
/// empty one is a lifecycle error and leaves the slot as it was.
pub(crate) struct TaskSlot {
    label: Arc<str>,
    running: Option<Running>,
}

impl TaskSlot {
    pub(crate) fn new(label: &str) -> Self {
        Self {
            label: Arc::from(label),
            running: None,
        }
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn set_label(&mut self, label: &str) {
        self.label = Arc::from(label);
    }

    /// Spawn the loop built by `make_loop` on the current runtime.
    pub(crate) fn start<F, Fut>(&mut self, make_loop: F) -> Result<()>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if self.is_started() {
            return Err(Error::AlreadyStarted);
        }
        let runtime = Handle::try_current().map_err(Error::internal)?;
        let cancel = CancellationToken::new();
        let task = runtime.spawn(make_loop(cancel.clone()));
        self.running = Some(Running { cancel, task });
        tracing::debug!(monitor = %self.label, "monitor started");
        Ok(())
    }

    /// Cancel the loop and wait for it to exit.
    ///
    /// Returns the loop's own error if it had already terminated with one.
    pub(crate) async fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Err(Error::NotStarted);
        };
        running.cancel.cancel();
        let res = running.task.await?;
        tracing::debug!(monitor = %self.label, "monitor stopped");
        res
    }

    /// Whether a task was started and not yet stopped, even if it has exited.
    pub(crate) fn is_started(&self) -> bool {
        self.running.is_some()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            running.task.abort();
        }
    }
}

impl fmt::Debug for TaskSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSlot")
            .field("label", &self.label)
            .field("started", &self.running.is_some())
            .finish()
    }
}

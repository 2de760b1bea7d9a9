use std::{fmt, sync::Arc};

use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::{MonitorQueue, Result, Setter, monitor::TaskSlot};

/// Applies queued values to a target, strictly in queue order.
///
/// While running, the monitor waits for the next queue entry and passes it to
/// `setter.set(&target, value)`. Values are never reordered or coalesced.
///
/// The monitor should be the only consumer of its queue; producers may be
/// many.
///
/// # Errors in the loop
///
/// A setter error ends the loop. It is logged and returned from the next
/// [`stop()`](Self::stop). The value that failed is not requeued.
pub struct ConsumerMonitor<H, V, S> {
    target: Arc<H>,
    setter: Arc<S>,
    queue: MonitorQueue<V>,
    slot: TaskSlot,
}

impl<H, V, S> ConsumerMonitor<H, V, S>
where
    H: Send + Sync + 'static,
    V: Send + 'static,
    S: Setter<H, V>,
{
    /// Create a stopped monitor draining `queue` into `target`.
    pub fn new(target: H, setter: S, queue: MonitorQueue<V>) -> Self {
        Self {
            target: Arc::new(target),
            setter: Arc::new(setter),
            queue,
            slot: TaskSlot::new("consumer"),
        }
    }

    /// Name used in log fields.
    pub fn with_label(mut self, label: &str) -> Self {
        self.slot.set_label(label);
        self
    }

    pub fn label(&self) -> &str {
        self.slot.label()
    }

    pub fn target(&self) -> &H {
        &self.target
    }

    pub fn queue(&self) -> &MonitorQueue<V> {
        &self.queue
    }

    /// Spawn the monitor loop on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`](crate::Error::AlreadyStarted) if the
    /// loop is active; the running loop is not affected.
    pub fn start(&mut self) -> Result<()> {
        let target = self.target.clone();
        let setter = self.setter.clone();
        let queue = self.queue.clone();
        let label: Arc<str> = Arc::from(self.slot.label());
        self.slot
            .start(|cancel| consume(target, setter, queue, label, cancel))
    }

    /// Cancel the loop and wait until it has exited.
    ///
    /// Values still queued stay in the queue for a later restart.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotStarted`](crate::Error::NotStarted) if the loop is
    /// not active, or the error that terminated the loop.
    pub async fn stop(&mut self) -> Result<()> {
        self.slot.stop().await
    }

    pub fn is_running(&self) -> bool {
        self.slot.is_running()
    }
}

async fn consume<H, V, S>(
    target: Arc<H>,
    setter: Arc<S>,
    queue: MonitorQueue<V>,
    label: Arc<str>,
    cancel: CancellationToken,
) -> Result<()>
where
    H: Send + Sync + 'static,
    V: Send + 'static,
    S: Setter<H, V>,
{
    loop {
        select! {
            biased;

            _ = cancel.cancelled() => break,

            value = queue.get() => {
                if let Err(e) = setter.set(&target, value) {
                    tracing::warn!(monitor = %label, error = %e, "consumer loop failed");
                    return Err(e);
                }
                tracing::trace!(monitor = %label, pending = queue.len(), "value applied");
            }
        }
    }
    Ok(())
}

impl<H, V, S> fmt::Debug for ConsumerMonitor<H, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerMonitor")
            .field("slot", &self.slot)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::time::timeout;

    use super::*;
    use crate::Error;

    type Applied = Arc<Mutex<Vec<u32>>>;

    fn record(target: &Applied, value: u32) -> Result<()> {
        target.lock().push(value);
        Ok(())
    }

    async fn wait_for(target: &Applied, n: usize) {
        timeout(Duration::from_secs(1), async {
            while target.lock().len() < n {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn applies_in_enqueue_order() {
        let applied: Applied = Arc::default();
        let queue = MonitorQueue::new();
        for v in 0..50 {
            queue.put(v);
        }
        let mut monitor = ConsumerMonitor::new(applied.clone(), record, queue.clone());
        monitor.start().unwrap();
        for v in 50..100 {
            queue.put(v);
        }
        wait_for(&applied, 100).await;
        assert_eq!(*applied.lock(), (0..100).collect::<Vec<_>>());
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn no_writes_after_stop() {
        let applied: Applied = Arc::default();
        let queue = MonitorQueue::new();
        let mut monitor = ConsumerMonitor::new(applied.clone(), record, queue.clone());
        monitor.start().unwrap();
        monitor.stop().await.unwrap();

        queue.put(1);
        tokio::task::yield_now().await;
        assert!(applied.lock().is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn lifecycle_misuse_fails_loudly() {
        let applied: Applied = Arc::default();
        let queue = MonitorQueue::new();
        let mut monitor =
            ConsumerMonitor::new(applied.clone(), record, queue.clone()).with_label("applied");
        assert_eq!(monitor.stop().await, Err(Error::NotStarted));
        monitor.start().unwrap();
        assert_eq!(monitor.start(), Err(Error::AlreadyStarted));
        queue.put(3);
        wait_for(&applied, 1).await;
        monitor.stop().await.unwrap();
        assert_eq!(monitor.stop().await, Err(Error::NotStarted));
    }

    #[tokio::test]
    async fn setter_error_surfaces_on_stop() {
        let queue = MonitorQueue::new();
        let setter = |_: &(), value: u32| -> Result<()> {
            match value {
                0 => Ok(()),
                bad => Err(Error::NotFound(bad as usize)),
            }
        };
        let mut monitor = ConsumerMonitor::new((), setter, queue.clone());
        monitor.start().unwrap();
        queue.put(0);
        queue.put(5);
        queue.put(0);
        timeout(Duration::from_secs(1), async {
            while monitor.is_running() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(monitor.stop().await, Err(Error::NotFound(5)));
        assert_eq!(queue.len(), 1);
    }
}

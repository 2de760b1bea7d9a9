use std::{fmt, marker::PhantomData, sync::Arc};

use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::{Awaiter, Error, MonitorQueue, Resolver, Result, monitor::TaskSlot};

/// Streams the values of a handle into a queue, one entry per change.
///
/// [`start()`](Self::start) subscribes to the handle before it returns, so a
/// change made right after `start()` is already observed. The loop then waits
/// on `awaiter.changed(..)`; each completion yields a sample of the handle
/// taken at that change, and `resolver.resolve(&sample)` is enqueued. Nothing
/// is sampled late or coalesced on this side: every change the awaiter
/// reports becomes exactly one queue entry carrying that change's value.
///
/// # Type parameters
///
/// - `H` handle being watched
/// - `V` value type placed on the queue
/// - `A` [`Awaiter`] defining the wait criteria
/// - `R` [`Resolver`] turning the awaiter's sample into a `V`
///
/// # Errors in the loop
///
/// An awaiter or resolver error ends the loop. It is logged and returned
/// from the next [`stop()`](Self::stop).
pub struct ProducerMonitor<H, V, A, R> {
    handle: Arc<H>,
    awaiter: Arc<A>,
    resolver: Arc<R>,
    values: MonitorQueue<V>,
    slot: TaskSlot,
}

impl<H, V, A, R> ProducerMonitor<H, V, A, R>
where
    H: Send + Sync + 'static,
    V: Send + 'static,
    A: Awaiter<H>,
    R: Resolver<A::Sample, V>,
{
    /// Create a stopped monitor with a fresh queue.
    pub fn new(handle: H, resolver: R, awaiter: A) -> Self {
        Self {
            handle: Arc::new(handle),
            awaiter: Arc::new(awaiter),
            resolver: Arc::new(resolver),
            values: MonitorQueue::new(),
            slot: TaskSlot::new("producer"),
        }
    }

    /// Name used in log fields.
    pub fn with_label(mut self, label: &str) -> Self {
        self.slot.set_label(label);
        self
    }

    /// Enqueue into an existing queue instead of a private one.
    ///
    /// Several producers may share a queue; each keeps its own order.
    pub fn with_queue(mut self, queue: MonitorQueue<V>) -> Self {
        self.values = queue;
        self
    }

    pub fn label(&self) -> &str {
        self.slot.label()
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Queue receiving the resolved values.
    pub fn values(&self) -> &MonitorQueue<V> {
        &self.values
    }

    /// Subscribe to the handle and spawn the monitor loop on the current
    /// Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`](crate::Error::AlreadyStarted) if the
    /// loop is active; the running loop is not affected.
    pub fn start(&mut self) -> Result<()> {
        if self.slot.is_started() {
            return Err(Error::AlreadyStarted);
        }
        let subscription = self.awaiter.subscribe(&self.handle);
        let run = ProducerLoop {
            handle: self.handle.clone(),
            awaiter: self.awaiter.clone(),
            resolver: self.resolver.clone(),
            values: self.values.clone(),
            label: Arc::from(self.slot.label()),
            _value: PhantomData,
        };
        self.slot.start(|cancel| run.run(subscription, cancel))
    }

    /// Cancel the loop and wait until it has exited.
    ///
    /// A value already resolved when cancellation lands is still enqueued.
    /// Changes the awaiter observed but the loop has not taken yet are dropped
    /// with the subscription; a later `start()` subscribes afresh.
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

struct ProducerLoop<H, V, A, R> {
    handle: Arc<H>,
    awaiter: Arc<A>,
    resolver: Arc<R>,
    values: MonitorQueue<V>,
    label: Arc<str>,
    _value: PhantomData<fn() -> V>,
}

impl<H, V, A, R> ProducerLoop<H, V, A, R>
where
    H: Send + Sync + 'static,
    V: Send + 'static,
    A: Awaiter<H>,
    R: Resolver<A::Sample, V>,
{
    async fn run(
        self,
        mut subscription: A::Subscription,
        cancel: CancellationToken,
    ) -> Result<()> {
        loop {
            select! {
                biased;

                _ = cancel.cancelled() => break,

                res = self.awaiter.changed(&self.handle, &mut subscription) => {
                    match res.and_then(|sample| self.resolver.resolve(&sample)) {
                        Ok(value) => {
                            self.values.put(value);
                            tracing::trace!(monitor = %self.label, queued = self.values.len(), "value enqueued");
                        }
                        Err(e) => {
                            tracing::warn!(monitor = %self.label, error = %e, "producer loop failed");
                            return Err(e);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl<H, V, A, R> fmt::Debug for ProducerMonitor<H, V, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerMonitor")
            .field("slot", &self.slot)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::{ConsumerMonitor, Edge, ReadBinstr, Signal, SignalSample, WriteInteger};

    async fn take(values: &MonitorQueue<String>, n: usize) -> Vec<String> {
        let mut seen = Vec::with_capacity(n);
        for _ in 0..n {
            let value = timeout(Duration::from_secs(1), values.get())
                .await
                .unwrap();
            seen.push(value);
        }
        seen
    }

    #[tokio::test]
    async fn every_change_is_enqueued_in_order() {
        let x = Signal::new("X", 4).unwrap();
        let mut monitor = ProducerMonitor::new(x.clone(), ReadBinstr, Edge);
        monitor.start().unwrap();

        for v in [1u64, 2, 3, 15] {
            tokio::task::yield_now().await;
            x.write(v);
        }
        assert_eq!(
            take(monitor.values(), 4).await,
            vec!["0001", "0010", "0011", "1111"]
        );
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn back_to_back_writes_are_not_merged() {
        let x = Signal::new("X", 4).unwrap();
        let mut monitor = ProducerMonitor::new(x.clone(), ReadBinstr, Edge);
        monitor.start().unwrap();
        tokio::task::yield_now().await;

        assert!(x.write(1));
        assert!(x.write(2));
        assert!(x.write(3));
        assert_eq!(take(monitor.values(), 3).await, vec!["0001", "0010", "0011"]);

        tokio::task::yield_now().await;
        assert!(monitor.values().is_empty());
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn write_right_after_start_is_observed() {
        let x = Signal::new("X", 4).unwrap();
        let mut monitor = ProducerMonitor::new(x.clone(), ReadBinstr, Edge);
        monitor.start().unwrap();
        x.write(5);
        assert_eq!(take(monitor.values(), 1).await, vec!["0101"]);
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn backlog_written_through_a_consumer_reaches_the_producer() {
        let a = Signal::new("A", 4).unwrap();
        let backlog = MonitorQueue::new();
        for v in [1u64, 2, 3] {
            backlog.put(v);
        }
        let mut to_sim = ConsumerMonitor::new(a.clone(), WriteInteger, backlog.clone());
        let mut from_sim = ProducerMonitor::new(a.clone(), ReadBinstr, Edge);
        from_sim.start().unwrap();
        to_sim.start().unwrap();

        assert_eq!(take(from_sim.values(), 3).await, vec!["0001", "0010", "0011"]);
        to_sim.stop().await.unwrap();
        from_sim.stop().await.unwrap();
    }

    #[tokio::test]
    async fn nothing_is_enqueued_after_stop() {
        let x = Signal::new("X", 4).unwrap();
        let mut monitor = ProducerMonitor::new(x.clone(), ReadBinstr, Edge).with_label("x");
        monitor.start().unwrap();
        monitor.stop().await.unwrap();

        x.write(9);
        tokio::task::yield_now().await;
        assert!(monitor.values().is_empty());
        assert!(!monitor.is_running());
    }

    #[tokio::test]
    async fn lifecycle_misuse_fails_loudly() {
        let x = Signal::new("X", 4).unwrap();
        let mut monitor = ProducerMonitor::new(x.clone(), ReadBinstr, Edge);
        assert_eq!(monitor.stop().await, Err(Error::NotStarted));

        monitor.start().unwrap();
        assert_eq!(monitor.start(), Err(Error::AlreadyStarted));

        // The first loop still delivers, exactly once per change.
        x.write(4);
        assert_eq!(take(monitor.values(), 1).await, vec!["0100"]);
        tokio::task::yield_now().await;
        assert!(monitor.values().is_empty());
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn restart_after_stop() {
        let x = Signal::new("X", 4).unwrap();
        let mut monitor = ProducerMonitor::new(x.clone(), ReadBinstr, Edge);
        monitor.start().unwrap();
        monitor.stop().await.unwrap();
        x.write(3);
        monitor.start().unwrap();
        x.write(7);
        assert_eq!(take(monitor.values(), 1).await, vec!["0111"]);
        monitor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn resolver_error_ends_loop_and_surfaces_on_stop() {
        #[derive(Debug, thiserror::Error)]
        #[error("read failed")]
        struct ReadFailed;

        let x = Signal::new("X", 4).unwrap();
        let failure = Error::external(ReadFailed);
        let returned = failure.clone();
        let resolver = move |_: &SignalSample| -> Result<u64> { Err(returned.clone()) };
        let mut monitor = ProducerMonitor::new(x.clone(), resolver, Edge);
        monitor.start().unwrap();
        x.write(1);
        timeout(Duration::from_secs(1), async {
            while monitor.is_running() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(monitor.stop().await, Err(failure));
        assert!(monitor.values().is_empty());
    }
}

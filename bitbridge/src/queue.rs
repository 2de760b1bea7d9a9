use std::{collections::VecDeque, fmt, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Unbounded FIFO of values between monitors and the frame loop.
///
/// Any number of handles may [`put`](Self::put) values; exactly one party is
/// expected to consume them, either by awaiting [`get`](Self::get) (a
/// [`ConsumerMonitor`](crate::ConsumerMonitor)) or by polling
/// [`try_get`](Self::try_get) / [`drain`](Self::drain) once per frame.
/// Values are retained until consumed and come out in insertion order.
///
/// Cloning a queue yields another handle to the same FIFO.
///
/// # Example
///
/// ```rust
/// use bitbridge::MonitorQueue;
///
/// let queue = MonitorQueue::new();
/// queue.put(1);
/// queue.put(2);
/// assert_eq!(queue.drain().collect::<Vec<_>>(), vec![1, 2]);
/// assert_eq!(queue.try_get(), None);
/// ```
pub struct MonitorQueue<V> {
    inner: Arc<Inner<V>>,
}

struct Inner<V> {
    items: Mutex<VecDeque<V>>,
    available: Notify,
}

impl<V> MonitorQueue<V> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                items: Mutex::new(VecDeque::new()),
                available: Notify::new(),
            }),
        }
    }

    /// Append a value. Never blocks.
    pub fn put(&self, value: V) {
        self.inner.items.lock().push_back(value);
        // notify_one stores a permit when nobody waits, so a consumer that
        // checks the queue and then parks cannot miss this value.
        self.inner.available.notify_one();
    }

    /// Pop the oldest value if there is one.
    pub fn try_get(&self) -> Option<V> {
        self.inner.items.lock().pop_front()
    }

    /// Wait until a value is available, then pop it.
    ///
    /// Cancel safe: dropping the future before it completes loses no value.
    pub async fn get(&self) -> V {
        loop {
            if let Some(value) = self.try_get() {
                return value;
            }
            self.inner.available.notified().await;
        }
    }

    /// Pop every value currently queued, oldest first.
    ///
    /// Values put while the iterator is alive are not included.
    pub fn drain(&self) -> impl Iterator<Item = V> {
        std::mem::take(&mut *self.inner.items.lock()).into_iter()
    }

    pub fn len(&self) -> usize {
        self.inner.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.lock().is_empty()
    }
}

impl<V> Clone for MonitorQueue<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> Default for MonitorQueue<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for MonitorQueue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorQueue")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

//! Capabilities the bridge needs from the signal domain.
//!
//! Monitors never talk to a simulator directly. They are handed a handle and
//! one or two capabilities:
//!
//! - [`Awaiter`] subscribes to a handle and suspends until it reports a
//!   change, returning a sample of the handle taken at that change
//! - [`Resolver`] turns such a sample into the value that gets enqueued
//! - [`Setter`] writes a value into a target handle
//!
//! Closures implement [`Resolver`] and [`Setter`] directly. [`Signal`] is an
//! in-process bit-vector handle with an [`Edge`] awaiter, used when no real
//! simulator is attached.

use std::{fmt, future::Future, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::{BankConfig, Error, Result};

/// Observes the changes of a handle, one completion per change.
///
/// A monitor calls [`subscribe`](Self::subscribe) synchronously when it
/// starts, then loops on [`changed`](Self::changed) with that subscription.
/// Every change reported after `subscribe` returns must complete exactly one
/// `changed` call, in order, and the returned sample must describe the handle
/// as it was at that change, not as it is when the loop gets around to it.
pub trait Awaiter<H>: Send + Sync + 'static {
    /// Per-loop observation state.
    type Subscription: Send + 'static;
    /// What a single change records.
    type Sample: Send;

    fn subscribe(&self, handle: &H) -> Self::Subscription;

    fn changed(
        &self,
        handle: &H,
        subscription: &mut Self::Subscription,
    ) -> impl Future<Output = Result<Self::Sample>> + Send;
}

/// Turns a recorded sample into a queue value.
pub trait Resolver<S, V>: Send + Sync + 'static {
    fn resolve(&self, sample: &S) -> Result<V>;
}

/// Writes a value into a target handle.
pub trait Setter<H, V>: Send + Sync + 'static {
    fn set(&self, target: &H, value: V) -> Result<()>;
}

impl<S, V, F> Resolver<S, V> for F
where
    F: Fn(&S) -> Result<V> + Send + Sync + 'static,
{
    fn resolve(&self, sample: &S) -> Result<V> {
        self(sample)
    }
}

impl<H, V, F> Setter<H, V> for F
where
    F: Fn(&H, V) -> Result<()> + Send + Sync + 'static,
{
    fn set(&self, target: &H, value: V) -> Result<()> {
        self(target, value)
    }
}

/// In-process fixed-width bit-vector signal.
///
/// Cloning yields another handle to the same signal. Writes that do not
/// change the value raise no change notification, matching edge semantics
/// of a hardware signal. Values wider than the signal are truncated.
///
/// Every subscriber gets its own unbounded record of changes, so back-to-back
/// writes are never merged: a subscriber that falls behind still sees each
/// intermediate value.
///
/// ```rust
/// use bitbridge::Signal;
///
/// let x = Signal::new("X", 5)?;
/// x.write(9);
/// assert_eq!(x.read_binstr(), "01001");
/// # Ok::<(), bitbridge::Error>(())
/// ```
#[derive(Clone)]
pub struct Signal {
    inner: Arc<SignalInner>,
}

struct SignalInner {
    name: Arc<str>,
    width: usize,
    state: Mutex<SignalState>,
}

struct SignalState {
    value: u64,
    subscribers: Vec<UnboundedSender<SignalSample>>,
}

impl Signal {
    /// Create a signal of `width` bits holding zero.
    ///
    /// # Errors
    ///
    /// - [`Error::ZeroWidth`] if the width is zero.
    /// - [`Error::TooWide`] if the width exceeds 64 bits.
    pub fn new(name: &str, width: usize) -> Result<Self> {
        BankConfig::new(width).validate()?;
        Ok(Self {
            inner: Arc::new(SignalInner {
                name: Arc::from(name),
                width,
                state: Mutex::new(SignalState {
                    value: 0,
                    subscribers: Vec::new(),
                }),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn width(&self) -> usize {
        self.inner.width
    }

    /// Write a new value, truncated to the signal width.
    ///
    /// Returns `true` if the value changed. Each change is recorded for every
    /// live subscriber before this returns.
    pub fn write(&self, value: u64) -> bool {
        let sample = SignalSample {
            value: value & self.mask(),
            width: self.width(),
        };
        let mut state = self.inner.state.lock();
        if state.value == sample.value {
            return false;
        }
        state.value = sample.value;
        state.subscribers.retain(|tx| tx.send(sample).is_ok());
        true
    }

    pub fn read(&self) -> u64 {
        self.inner.state.lock().value
    }

    /// Current value as a zero-padded big-endian string of `'0'`/`'1'`.
    pub fn read_binstr(&self) -> String {
        self.sample().binstr()
    }

    /// Current value together with the signal width.
    pub fn sample(&self) -> SignalSample {
        SignalSample {
            value: self.read(),
            width: self.width(),
        }
    }

    /// Start recording changes made after this call.
    ///
    /// Changes pile up until they are taken with [`SignalEvents::changed`];
    /// drop the subscription to stop recording.
    pub fn subscribe(&self) -> SignalEvents {
        let (tx, rx) = unbounded_channel();
        self.inner.state.lock().subscribers.push(tx);
        SignalEvents { rx }
    }

    fn mask(&self) -> u64 {
        match self.width() {
            64 => u64::MAX,
            w => (1u64 << w) - 1,
        }
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name())
            .field("width", &self.width())
            .field("value", &self.read_binstr())
            .finish()
    }
}

/// The value of a [`Signal`] at one change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalSample {
    value: u64,
    width: usize,
}

impl SignalSample {
    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Zero-padded big-endian string of `'0'`/`'1'`.
    pub fn binstr(&self) -> String {
        format!("{:0width$b}", self.value, width = self.width)
    }
}

impl fmt::Display for SignalSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.binstr())
    }
}

/// Ordered record of the changes of one [`Signal`] since [`Signal::subscribe`].
#[derive(Debug)]
pub struct SignalEvents {
    rx: UnboundedReceiver<SignalSample>,
}

impl SignalEvents {
    /// Wait for the next recorded change.
    ///
    /// Cancel safe: dropping the future before it completes loses nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] once every handle to the signal is gone
    /// and all recorded changes have been taken.
    pub async fn changed(&mut self) -> Result<SignalSample> {
        self.rx.recv().await.ok_or(Error::QueueClosed)
    }

    /// Take the next recorded change without waiting.
    pub fn try_changed(&mut self) -> Option<SignalSample> {
        self.rx.try_recv().ok()
    }
}

/// Waits for the next value change of a [`Signal`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Edge;

impl Awaiter<Signal> for Edge {
    type Subscription = SignalEvents;
    type Sample = SignalSample;

    fn subscribe(&self, handle: &Signal) -> SignalEvents {
        handle.subscribe()
    }

    fn changed(
        &self,
        _handle: &Signal,
        subscription: &mut SignalEvents,
    ) -> impl Future<Output = Result<SignalSample>> + Send {
        subscription.changed()
    }
}

/// Resolves a [`SignalSample`] to its big-endian bit string.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadBinstr;

impl Resolver<SignalSample, String> for ReadBinstr {
    fn resolve(&self, sample: &SignalSample) -> Result<String> {
        Ok(sample.binstr())
    }
}

/// Writes an integer into a [`Signal`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteInteger;

impl Setter<Signal, u64> for WriteInteger {
    fn set(&self, target: &Signal, value: u64) -> Result<()> {
        target.write(value);
        Ok(())
    }
}

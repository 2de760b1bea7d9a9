//! Background tasks that move values across the bridge.
//!
//! | Monitor | Suspends on | Then |
//! |---------|-------------|------|
//! | [`ProducerMonitor`] | [`Awaiter::changed`](crate::Awaiter::changed) | resolves the change's sample and enqueues the value |
//! | [`ConsumerMonitor`] | [`MonitorQueue::get`](crate::MonitorQueue::get) | applies the value to its target |
//!
//! Both own their task. `start()` spawns it on the current Tokio runtime and
//! `stop()` cancels it through a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! checked at every suspension point, then waits for the task to exit. Once
//! `stop()` returns, the monitor writes nothing further to its queue or target.
//!
//! # Example
//!
//! ```rust
//! use bitbridge::{ConsumerMonitor, Edge, MonitorQueue, ProducerMonitor, ReadBinstr, Signal, WriteInteger};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> bitbridge::Result {
//! let a = Signal::new("A", 4)?;
//! let outgoing = MonitorQueue::<u64>::new();
//!
//! let mut to_sim = ConsumerMonitor::new(a.clone(), WriteInteger, outgoing.clone());
//! let mut from_sim = ProducerMonitor::new(a.clone(), ReadBinstr, Edge);
//! from_sim.start()?;
//! to_sim.start()?;
//!
//! outgoing.put(5);
//! outgoing.put(6);
//! assert_eq!(from_sim.values().get().await, "0101");
//! assert_eq!(from_sim.values().get().await, "0110");
//!
//! to_sim.stop().await?;
//! from_sim.stop().await
//! # }
//! ```

mod consumer;
mod producer;
mod task_slot;

pub use consumer::ConsumerMonitor;
pub use producer::ProducerMonitor;

pub(crate) use task_slot::TaskSlot;

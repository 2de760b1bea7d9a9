#![cfg_attr(docsrs, feature(doc_cfg))]
//! # bitbridge
//!
//! Bridges an event-driven simulation with a polling visualization loop.
//!
//! A simulation raises "value changed" events on its signals; a frame loop
//! wants to read state once per tick. bitbridge sits in between: monitors
//! turn awaited changes into queue entries and queue entries into writes,
//! and bit banks hold the multi-bit values both sides exchange.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bitbridge::*;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result {
//!     let a = Signal::new("A", 4)?;
//!     let x = Signal::new("X", 4)?;
//!
//!     // Frame side: switches the user can flip, LEDs showing X.
//!     let mut nibble = SwitchableBitBank::new(&BankConfig::new(4))?;
//!     let mut leds = BitBank::new(4)?;
//!
//!     // Switch values flow into A; changes of X flow back.
//!     let mut to_sim = ConsumerMonitor::new(a.clone(), WriteInteger, nibble.outgoing().clone());
//!     let mut from_sim = ProducerMonitor::new(x.clone(), ReadBinstr, Edge);
//!     to_sim.start()?;
//!     from_sim.start()?;
//!
//!     nibble.update(&[InputEvent::Toggle(3)])?;
//!     for bits in from_sim.values().drain() {
//!         leds.set_state_from_bigendian_string(&bits)?;
//!     }
//!
//!     to_sim.stop().await?;
//!     from_sim.stop().await
//! }
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`BitBank`] | Fixed-width row of [`BitCell`]s with bit-order-aware conversions |
//! | [`BitLayout`] | Explicit position/id mapping used by every conversion |
//! | [`SwitchableBitBank`] | Switches with echoing indicators and an outgoing value queue |
//! | [`MonitorQueue`] | Unbounded FIFO between monitors and the frame loop |
//! | [`ProducerMonitor`] | Awaited changes on a handle → queue |
//! | [`ConsumerMonitor`] | Queue → writes on a target |
//! | [`Awaiter`], [`Resolver`], [`Setter`] | Capabilities supplied by the signal domain |
//! | [`Signal`] | In-process bit-vector handle recording every change per subscriber |
//!
//! ## Bit order
//!
//! Banks store cells most-significant first: position 0 holds cell id
//! `width - 1`. Big-endian strings map character 0 to position 0, and
//! [`BitBank::to_integer`] reads positions as a big-endian number. So for a
//! 4-bit bank, `"1010"` sets ids 3 and 1 and converts to 10.
//!
//! ## Features
//!
//! - **`serde`** - `Serialize`/`Deserialize` for [`BankConfig`], [`BitCell`] and [`InputEvent`]

mod bank_config;
mod bit_bank;
mod bit_cell;
mod error;
mod layout;
mod queue;
mod switch_bank;

pub mod monitor;
pub mod signal;

pub use bank_config::BankConfig;
pub use bit_bank::{BigEndianSetter, BitBank, SharedBitBank};
pub use bit_cell::{BitCell, CellId};
pub use error::Error;
pub use layout::BitLayout;
pub use monitor::{ConsumerMonitor, ProducerMonitor};
pub use queue::MonitorQueue;
pub use signal::{
    Awaiter, Edge, ReadBinstr, Resolver, Setter, Signal, SignalEvents, SignalSample, WriteInteger,
};
pub use switch_bank::{InputEvent, NoopListener, SwitchableBitBank, ToggleListener};

/// Convenience alias for `Result<T, bitbridge::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;

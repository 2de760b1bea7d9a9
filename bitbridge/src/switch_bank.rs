use std::fmt;

use crate::{BankConfig, BitBank, BitCell, CellId, MonitorQueue, Result};

/// Input delivered to a bank once per frame tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InputEvent {
    /// The user (or a script) flipped the switch of this cell.
    Toggle(CellId),
}

/// Receives every toggle of a [`SwitchableBitBank`].
///
/// Called after the indicator echo and the queue push, while the bank is
/// still exclusively borrowed, so the listener sees the bank exactly as the
/// toggle left it.
pub trait ToggleListener: Send + Sync + 'static {
    fn on_toggle(&self, bank: &SwitchableBitBank, cell: &BitCell);
}

impl<F> ToggleListener for F
where
    F: Fn(&SwitchableBitBank, &BitCell) + Send + Sync + 'static,
{
    fn on_toggle(&self, bank: &SwitchableBitBank, cell: &BitCell) {
        self(bank, cell)
    }
}

/// Listener that ignores toggles.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl ToggleListener for NoopListener {
    fn on_toggle(&self, _bank: &SwitchableBitBank, _cell: &BitCell) {}
}

/// A row of switches, each paired with an indicator showing its state.
///
/// Toggling a switch fans out in one step:
///
/// 1. the switch cell flips
/// 2. the paired indicator cell copies the new switch state
/// 3. the switch row's integer value is pushed onto [`outgoing`](Self::outgoing)
/// 4. the [`ToggleListener`] is called with the bank and the changed cell
///
/// All four happen inside a single `&mut self` call, so no other toggle can
/// interleave. Share the bank between tasks behind a mutex to keep it that way.
///
/// # Example
///
/// ```rust
/// use bitbridge::{BankConfig, SwitchableBitBank};
///
/// let mut nibble = SwitchableBitBank::new(&BankConfig::new(4))?;
/// nibble.toggle(3)?;
/// nibble.toggle(0)?;
/// assert_eq!(nibble.to_integer(), 0b1001);
/// assert_eq!(nibble.outgoing().drain().collect::<Vec<_>>(), vec![0b1000, 0b1001]);
/// # Ok::<(), bitbridge::Error>(())
/// ```
pub struct SwitchableBitBank {
    switches: BitBank,
    indicators: BitBank,
    outgoing: MonitorQueue<u64>,
    listener: Box<dyn ToggleListener>,
}

impl SwitchableBitBank {
    /// Build a bank with switches and indicators both set from `config`.
    ///
    /// # Errors
    ///
    /// Propagates [`BankConfig::validate`] failures.
    pub fn new(config: &BankConfig) -> Result<Self> {
        let switches = BitBank::from_config(config)?;
        let indicators = switches.clone();
        Ok(Self {
            switches,
            indicators,
            outgoing: MonitorQueue::new(),
            listener: Box::new(NoopListener),
        })
    }

    pub fn with_listener(mut self, listener: impl ToggleListener) -> Self {
        self.listener = Box::new(listener);
        self
    }

    pub fn width(&self) -> usize {
        self.switches.width()
    }

    pub fn label(&self) -> &str {
        self.switches.label()
    }

    pub fn switches(&self) -> &BitBank {
        &self.switches
    }

    pub fn indicators(&self) -> &BitBank {
        &self.indicators
    }

    /// Queue of aggregate values, one per toggle, for the simulation side.
    pub fn outgoing(&self) -> &MonitorQueue<u64> {
        &self.outgoing
    }

    /// Flip the switch with id `id` and fan the change out.
    ///
    /// Returns the switch cell after the flip.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if no cell has this
    /// id; nothing is echoed, queued or reported in that case.
    pub fn toggle(&mut self, id: CellId) -> Result<BitCell> {
        let cell = self.switches.toggle_by_id(id)?;
        self.indicators.set_state_by_id(id, cell.state())?;

        let value = self.switches.to_integer();
        self.outgoing.put(value);
        tracing::trace!(bank = %self.label(), cell = %cell, value, "switch toggled");

        self.listener.on_toggle(self, &cell);
        Ok(cell)
    }

    /// Apply one frame's worth of input, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first event naming an unknown cell; earlier events stay applied.
    pub fn update(&mut self, events: &[InputEvent]) -> Result<()> {
        for event in events {
            match *event {
                InputEvent::Toggle(id) => {
                    self.toggle(id)?;
                }
            }
        }
        Ok(())
    }

    /// Switch states by position, most significant first.
    pub fn get_state_by_position(&self) -> Vec<bool> {
        self.switches.get_state_by_position()
    }

    /// Switch states indexed by id, least significant first.
    pub fn get_state_by_id_order(&self) -> Vec<bool> {
        self.switches.get_state_by_id_order()
    }

    /// Switch row read as a big-endian unsigned integer.
    pub fn to_integer(&self) -> u64 {
        self.switches.to_integer()
    }
}

impl fmt::Debug for SwitchableBitBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwitchableBitBank")
            .field("switches", &self.switches.to_bigendian_string())
            .field("indicators", &self.indicators.to_bigendian_string())
            .field("outgoing", &self.outgoing)
            .finish_non_exhaustive()
    }
}

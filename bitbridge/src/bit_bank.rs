use std::{fmt, sync::Arc};

use parking_lot::{Mutex, MutexGuard};

use crate::{BankConfig, BitCell, BitLayout, CellId, Error, Result, signal::Setter};

/// Ordered collection of [`BitCell`]s with a fixed width.
///
/// Cells are stored by position, most significant first (see [`BitLayout`]).
/// The bank is the only place that knows about bit order: callers either
/// address cells by id, or exchange whole values as a big-endian bit string
/// or an unsigned integer.
///
/// | Form | Accessors |
/// |------|-----------|
/// | positional (MSB first) | [`get_state_by_position`](Self::get_state_by_position) |
/// | by id (LSB first) | [`get_state_by_id_order`](Self::get_state_by_id_order), [`get_state_by_id`](Self::get_state_by_id), [`set_state_by_id`](Self::set_state_by_id) |
/// | big-endian string | [`set_state_from_bigendian_string`](Self::set_state_from_bigendian_string), [`to_bigendian_string`](Self::to_bigendian_string) |
/// | integer | [`to_integer`](Self::to_integer), [`set_state_from_integer`](Self::set_state_from_integer) |
///
/// # Example
///
/// ```rust
/// use bitbridge::BitBank;
///
/// let mut bank = BitBank::new(4)?;
/// bank.set_state_from_bigendian_string("1010")?;
/// assert_eq!(bank.to_integer(), 10);
/// assert!(bank.get_state_by_id(3)?);
/// assert!(!bank.get_state_by_id(0)?);
/// # Ok::<(), bitbridge::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitBank {
    cells: Vec<BitCell>,
    layout: BitLayout,
    label: Arc<str>,
}

impl BitBank {
    /// Create a bank of `width` cells, all off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroWidth`] or [`Error::TooWide`] for unsupported widths.
    pub fn new(width: usize) -> Result<Self> {
        Self::from_config(&BankConfig::new(width))
    }

    /// Create a bank from a validated [`BankConfig`].
    ///
    /// # Errors
    ///
    /// Propagates [`BankConfig::validate`] failures.
    pub fn from_config(config: &BankConfig) -> Result<Self> {
        config.validate()?;
        let layout = BitLayout::new(config.width());
        let initial = config.initial_state();
        let cells = layout
            .ids()
            .enumerate()
            .map(|(pos, id)| BitCell::new(id, initial.get(pos).copied().unwrap_or(false)))
            .collect();
        Ok(Self {
            cells,
            layout,
            label: Arc::from(config.label()),
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.layout.width()
    }

    #[inline]
    pub fn layout(&self) -> BitLayout {
        self.layout
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Cells in storage order.
    pub fn cells(&self) -> &[BitCell] {
        &self.cells
    }

    /// Cell states ordered by position: index 0 is the most significant bit.
    pub fn get_state_by_position(&self) -> Vec<bool> {
        self.cells.iter().map(BitCell::state).collect()
    }

    /// Cell states indexed by id: index 0 is the least significant bit.
    pub fn get_state_by_id_order(&self) -> Vec<bool> {
        let mut state = vec![false; self.width()];
        for cell in &self.cells {
            state[cell.id()] = cell.state();
        }
        state
    }

    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no cell has this id.
    pub fn get_state_by_id(&self, id: CellId) -> Result<bool> {
        self.cell(id).map(BitCell::state)
    }

    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no cell has this id.
    pub fn set_state_by_id(&mut self, id: CellId, state: bool) -> Result<()> {
        self.cell_mut(id)?.set_state(state);
        Ok(())
    }

    /// Flip one cell and return a copy of it after the change.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no cell has this id.
    pub fn toggle_by_id(&mut self, id: CellId) -> Result<BitCell> {
        let cell = self.cell_mut(id)?;
        cell.toggle();
        Ok(*cell)
    }

    /// Set every cell from a big-endian string of `'0'`/`'1'`.
    ///
    /// The first character maps to position 0 (the most significant bit).
    /// The whole string is checked before any cell is written, so a
    /// rejected string leaves the bank untouched.
    ///
    /// # Errors
    ///
    /// - [`Error::LengthMismatch`] if the string has not exactly `width` characters.
    /// - [`Error::InvalidCharacter`] on the first character that is not `'0'` or `'1'`.
    pub fn set_state_from_bigendian_string(&mut self, bits: &str) -> Result<()> {
        let actual = bits.chars().count();
        if actual != self.width() {
            return Err(Error::LengthMismatch {
                expected: self.width(),
                actual,
            });
        }

        let parsed = bits
            .chars()
            .enumerate()
            .map(|(position, character)| match character {
                '0' => Ok(false),
                '1' => Ok(true),
                _ => Err(Error::InvalidCharacter {
                    character,
                    position,
                }),
            })
            .collect::<Result<Vec<bool>>>()?;

        for (cell, state) in self.cells.iter_mut().zip(parsed) {
            cell.set_state(state);
        }
        Ok(())
    }

    /// Set every cell from an unsigned integer, bit `n` going to cell id `n`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LengthMismatch`] if `value` needs more than `width`
    /// bits. The bank is left untouched in that case.
    pub fn set_state_from_integer(&mut self, value: u64) -> Result<()> {
        let needed = (u64::BITS - value.leading_zeros()) as usize;
        if needed > self.width() {
            return Err(Error::LengthMismatch {
                expected: self.width(),
                actual: needed,
            });
        }
        for cell in &mut self.cells {
            cell.set_state((value >> cell.id()) & 1 == 1);
        }
        Ok(())
    }

    /// Positional state read as a big-endian binary number.
    pub fn to_integer(&self) -> u64 {
        self.cells
            .iter()
            .fold(0u64, |acc, cell| (acc << 1) | u64::from(cell.state()))
    }

    /// Positional state as a string of `'0'`/`'1'`, most significant first.
    pub fn to_bigendian_string(&self) -> String {
        self.cells
            .iter()
            .map(|c| if c.state() { '1' } else { '0' })
            .collect()
    }

    // Linear scan: every call ends in a definite hit or NotFound.
    fn cell(&self, id: CellId) -> Result<&BitCell> {
        self.cells
            .iter()
            .find(|c| c.id() == id)
            .ok_or(Error::NotFound(id))
    }

    fn cell_mut(&mut self, id: CellId) -> Result<&mut BitCell> {
        self.cells
            .iter_mut()
            .find(|c| c.id() == id)
            .ok_or(Error::NotFound(id))
    }
}

impl fmt::Display for BitBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bigendian_string())
    }
}

/// A [`BitBank`] behind a mutex, shared between a frame loop and monitor tasks.
///
/// Cloning yields another handle to the same bank. Every read or write goes
/// through [`lock`](Self::lock), so a consumer monitor applying a value and
/// the frame loop reading the bank never observe a half-written state.
#[derive(Debug, Clone)]
pub struct SharedBitBank(Arc<Mutex<BitBank>>);

impl SharedBitBank {
    pub fn new(bank: BitBank) -> Self {
        Self(Arc::new(Mutex::new(bank)))
    }

    pub fn lock(&self) -> MutexGuard<'_, BitBank> {
        self.0.lock()
    }

    /// Copy of the current bank.
    pub fn snapshot(&self) -> BitBank {
        self.lock().clone()
    }
}

impl From<BitBank> for SharedBitBank {
    fn from(bank: BitBank) -> Self {
        Self::new(bank)
    }
}

/// [`Setter`] that writes big-endian bit strings into a [`SharedBitBank`].
///
/// This is the usual target for a consumer monitor draining the queue of a
/// producer that resolves signal values with [`Signal::read_binstr`](crate::Signal::read_binstr).
#[derive(Debug, Clone, Copy, Default)]
pub struct BigEndianSetter;

impl Setter<SharedBitBank, String> for BigEndianSetter {
    fn set(&self, target: &SharedBitBank, value: String) -> Result<()> {
        target.lock().set_state_from_bigendian_string(&value)
    }
}

use std::fmt;

/// Identifier of a cell inside a bank. Id `0` is the least significant bit.
pub type CellId = usize;

/// One named boolean state unit.
///
/// The `id` is fixed when the owning bank is built and never changes;
/// `state` is mutated in place by whoever currently holds the bank
/// exclusively (`&mut BitBank`, or the lock of a [`SharedBitBank`](crate::SharedBitBank)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BitCell {
    id: CellId,
    state: bool,
}

impl BitCell {
    pub fn new(id: CellId, state: bool) -> Self {
        Self { id, state }
    }

    #[inline]
    pub fn id(&self) -> CellId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> bool {
        self.state
    }

    #[inline]
    pub(crate) fn set_state(&mut self, state: bool) {
        self.state = state;
    }

    /// Flip the cell and return the new state.
    pub(crate) fn toggle(&mut self) -> bool {
        self.state = !self.state;
        self.state
    }
}

impl fmt::Display for BitCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bit{}={}", self.id, u8::from(self.state))
    }
}

use crate::{CellId, Error, Result};

/// Mapping between array positions and cell ids for a bank of fixed width.
///
/// Banks store their cells most-significant first: position `0` holds the
/// cell with id `width - 1`, and the last position holds id `0`. Every
/// format conversion in [`BitBank`](crate::BitBank) goes through this type,
/// so the reversal lives in exactly one place.
///
/// ```rust
/// use bitbridge::BitLayout;
///
/// let layout = BitLayout::new(4);
/// assert_eq!(layout.position_to_id(0).unwrap(), 3);
/// assert_eq!(layout.id_to_position(0).unwrap(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitLayout {
    width: usize,
}

impl BitLayout {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Id of the cell stored at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `position` is outside `0..width`.
    pub fn position_to_id(&self, position: usize) -> Result<CellId> {
        self.mirror(position)
    }

    /// Position of the cell with the given `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `id` is outside `0..width`.
    pub fn id_to_position(&self, id: CellId) -> Result<usize> {
        self.mirror(id)
    }

    /// Ids in storage order, i.e. `width - 1` down to `0`.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = CellId> + ExactSizeIterator {
        (0..self.width).rev()
    }

    // The mapping is its own inverse.
    #[inline]
    fn mirror(&self, index: usize) -> Result<usize> {
        if index < self.width {
            Ok(self.width - 1 - index)
        } else {
            Err(Error::NotFound(index))
        }
    }
}

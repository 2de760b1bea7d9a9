use crate::{Error, Result};

/// Construction-time settings for a [`BitBank`](crate::BitBank) or
/// [`SwitchableBitBank`](crate::SwitchableBitBank).
///
/// Width and initial state are validated when the bank is built, not here,
/// so a config can be assembled in any order.
///
/// # Examples
///
/// ```rust
/// use bitbridge::{BankConfig, BitBank};
///
/// let config = BankConfig::new(4)
///     .with_label("nibble")
///     .with_initial_state([true, false, false, true]);
///
/// let bank = BitBank::from_config(&config).unwrap();
/// assert_eq!(bank.to_integer(), 9);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BankConfig {
    /// Number of cells.
    /// Default: 1
    width: usize,

    /// Cell states by position (most significant first). Empty means all off.
    #[cfg_attr(feature = "serde", serde(default))]
    initial_state: Vec<bool>,

    /// Free-form name used in log fields.
    #[cfg_attr(feature = "serde", serde(default))]
    label: String,
}

impl Default for BankConfig {
    fn default() -> Self {
        BankConfig {
            width: 1,
            initial_state: Vec::new(),
            label: String::new(),
        }
    }
}

impl BankConfig {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    /// Set the number of cells.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Returns the number of cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Set the initial cell states, ordered by position (index 0 is the
    /// most significant bit).
    pub fn with_initial_state(mut self, state: impl IntoIterator<Item = bool>) -> Self {
        self.initial_state = state.into_iter().collect();
        self
    }

    /// Returns the initial state by position. Empty when unset.
    pub fn initial_state(&self) -> &[bool] {
        &self.initial_state
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Check the width and initial state against each other.
    ///
    /// # Errors
    ///
    /// - [`Error::ZeroWidth`] if the width is zero.
    /// - [`Error::TooWide`] if the width exceeds 64 bits.
    /// - [`Error::Configuration`] if a non-empty initial state has a
    ///   different length than the width.
    pub fn validate(&self) -> Result<()> {
        const MAX_WIDTH: usize = u64::BITS as usize;

        if self.width == 0 {
            return Err(Error::ZeroWidth);
        }
        if self.width > MAX_WIDTH {
            return Err(Error::TooWide {
                width: self.width,
                max: MAX_WIDTH,
            });
        }
        if !self.initial_state.is_empty() && self.initial_state.len() != self.width {
            return Err(Error::Configuration {
                width: self.width,
                state_len: self.initial_state.len(),
            });
        }
        Ok(())
    }
}

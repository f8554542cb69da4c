//! Fixed-length pixel storage with a non-destructive global brightness.

use core::fmt;

/// A pixel index or brightness value that was rejected before any state changed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum RangeError {
    /// The pixel index lies outside the strip.
    PixelIndex {
        /// Index that was passed in.
        index: usize,
        /// Number of pixels in the strip.
        len: usize,
    },
    /// The brightness value lies outside `0.0..=1.0`.
    Brightness {
        /// Value that was passed in.
        value: f32,
    },
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PixelIndex { index, len } => {
                write!(f, "pixel index {index} out of range for {len} LEDs")
            }
            Self::Brightness { value } => {
                write!(f, "brightness {value} outside 0.0..=1.0")
            }
        }
    }
}

impl core::error::Error for RangeError {}

/// Ordered per-LED color storage, one slot per physical LED position.
///
/// The length is fixed at construction through the `N` parameter. Brightness is
/// stored as a separate scalar and only applied when the buffer is encoded, so
/// changing it repeatedly never degrades the stored color values.
#[derive(Debug, Clone)]
pub struct PixelBuffer<C, const N: usize> {
    pixels: [C; N],
    brightness: f32,
}

impl<C: Copy + Default, const N: usize> PixelBuffer<C, N> {
    /// Creates a buffer with every pixel at the default (all channels zero)
    /// color and full brightness.
    pub fn new() -> Self {
        Self {
            pixels: [C::default(); N],
            brightness: 1.0,
        }
    }

    /// Number of pixels in the buffer.
    pub const fn len(&self) -> usize {
        N
    }

    /// Whether the buffer holds zero pixels.
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Returns the color at `index`, or `None` outside the strip.
    pub fn get(&self, index: usize) -> Option<C> {
        self.pixels.get(index).copied()
    }

    /// Stores `color` at `index`.
    ///
    /// # Errors
    ///
    /// [`RangeError::PixelIndex`] if `index` is outside `0..len()`; the buffer
    /// is left unchanged.
    pub fn set(&mut self, index: usize, color: C) -> Result<(), RangeError> {
        let slot = self
            .pixels
            .get_mut(index)
            .ok_or(RangeError::PixelIndex { index, len: N })?;
        *slot = color;
        Ok(())
    }

    /// Resets every pixel to the default color. Brightness is kept.
    pub fn clear(&mut self) {
        self.pixels = [C::default(); N];
    }

    /// The stored global brightness scalar.
    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    /// Stores a new global brightness scalar, applied at encode time.
    ///
    /// # Errors
    ///
    /// [`RangeError::Brightness`] if `value` is not within `0.0..=1.0` (NaN is
    /// rejected as well); the stored brightness is left unchanged.
    pub fn set_brightness(&mut self, value: f32) -> Result<(), RangeError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(RangeError::Brightness { value });
        }
        self.brightness = value;
        Ok(())
    }

    /// All pixels in physical order.
    pub fn as_slice(&self) -> &[C] {
        &self.pixels
    }
}

impl<C: Copy + Default, const N: usize> Default for PixelBuffer<C, N> {
    fn default() -> Self {
        Self::new()
    }
}

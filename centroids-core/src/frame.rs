//! Frame views and output buffers.
//!
//! Frames are borrowed, row-major and immutable. Output frames are always a
//! fresh allocation so that input and output never alias.

use crate::error::FrameError;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Unsigned detector sample type.
pub trait Pixel: Copy + Default + PartialOrd + Send + Sync + std::fmt::Debug + 'static {
    /// Largest representable sample.
    const MAX: Self;

    /// Widens the sample for arithmetic.
    fn to_u64(self) -> u64;

    /// Narrows a count into the sample type, saturating at [`Pixel::MAX`].
    fn from_count(count: u64) -> Self;
}

macro_rules! impl_pixel {
    ($($ty:ty),*) => {
        $(
            impl Pixel for $ty {
                const MAX: Self = <$ty>::MAX;

                #[inline]
                fn to_u64(self) -> u64 {
                    u64::from(self)
                }

                #[inline]
                fn from_count(count: u64) -> Self {
                    <$ty>::try_from(count).unwrap_or(<$ty>::MAX)
                }
            }
        )*
    };
}

impl_pixel!(u8, u16, u32);

/// Sample count of `frames` frames of `width` x `height`, or an error when an
/// extent is zero or the product does not fit in `usize`.
fn sample_count(width: usize, height: usize, frames: usize) -> Result<usize, FrameError> {
    if width == 0 || height == 0 {
        return Err(FrameError::ZeroExtent { width, height });
    }
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(frames))
        .ok_or(FrameError::DimensionOverflow {
            width,
            height,
            frames,
        })
}

/// A single borrowed 2D frame.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a, P> {
    data: &'a [P],
    width: usize,
    height: usize,
}

impl<'a, P: Pixel> Frame<'a, P> {
    /// Wraps a row-major slice of `width * height` samples.
    ///
    /// # Errors
    /// Returns an error if either dimension is zero or the slice length does
    /// not match.
    pub fn new(data: &'a [P], width: usize, height: usize) -> Result<Self, FrameError> {
        let expected = sample_count(width, height, 1)?;
        if data.len() != expected {
            return Err(FrameError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Frame width (`x`).
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height (`y`).
    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of samples.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false for a constructed frame.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sample at column `x`, row `y`.
    ///
    /// # Panics
    /// Panics if the coordinate is outside the frame.
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> P {
        self.data[y * self.width + x]
    }

    /// Sample at `(x, y)` widened to `u64`.
    #[inline]
    #[must_use]
    pub fn value(&self, x: usize, y: usize) -> u64 {
        self.get(x, y).to_u64()
    }

    /// One row of samples.
    #[inline]
    #[must_use]
    pub fn row(&self, y: usize) -> &'a [P] {
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    /// Underlying row-major samples.
    #[must_use]
    pub fn as_slice(&self) -> &'a [P] {
        self.data
    }
}

/// `n` frames of identical shape stored back to back.
#[derive(Debug, Clone, Copy)]
pub struct FrameStack<'a, P> {
    data: &'a [P],
    width: usize,
    height: usize,
    frames: usize,
}

impl<'a, P: Pixel> FrameStack<'a, P> {
    /// Wraps `frames * width * height` samples.
    ///
    /// # Errors
    /// Returns an error if any extent is zero or the slice length does not match.
    pub fn new(
        data: &'a [P],
        width: usize,
        height: usize,
        frames: usize,
    ) -> Result<Self, FrameError> {
        let expected = sample_count(width, height, frames)?;
        if frames == 0 || data.len() != expected {
            return Err(FrameError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            frames,
        })
    }

    /// Frame width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of frames.
    #[must_use]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Returns frame `index`, or `None` past the end.
    #[must_use]
    pub fn frame(&self, index: usize) -> Option<Frame<'a, P>> {
        if index >= self.frames {
            return None;
        }
        let size = self.width * self.height;
        let start = index * size;
        Some(Frame {
            data: &self.data[start..start + size],
            width: self.width,
            height: self.height,
        })
    }

    /// Iterates over the frames in order.
    pub fn iter(&self) -> impl Iterator<Item = Frame<'a, P>> + '_ {
        (0..self.frames).filter_map(move |i| self.frame(i))
    }
}

/// Owned annotated frame produced by the output assembler.
///
/// Serialize-only: the shape invariant is established by [`OutputFrame::zeros`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct OutputFrame<P> {
    data: Vec<P>,
    width: usize,
    height: usize,
}

impl<P: Pixel> OutputFrame<P> {
    /// Allocates a zero-filled frame.
    #[must_use]
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            data: vec![P::default(); width * height],
            width,
            height,
        }
    }

    /// Frame width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Sample at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> P {
        self.data[y * self.width + x]
    }

    /// Adds `count` to the sample at `(x, y)`, saturating at [`Pixel::MAX`].
    pub fn add_count(&mut self, x: usize, y: usize, count: u64) {
        let idx = y * self.width + x;
        let current = self.data[idx].to_u64();
        self.data[idx] = P::from_count(current.saturating_add(count));
    }

    /// Returns true if every sample is zero.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|p| p.to_u64() == 0)
    }

    /// Row-major samples.
    #[must_use]
    pub fn as_slice(&self) -> &[P] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_length_checked() {
        let data = vec![0u16; 12];
        assert!(Frame::new(&data, 4, 3).is_ok());
        assert_eq!(
            Frame::new(&data, 5, 3).unwrap_err(),
            FrameError::LengthMismatch {
                expected: 15,
                actual: 12
            }
        );
        assert_eq!(
            Frame::new(&data[..0], 0, 3).unwrap_err(),
            FrameError::ZeroExtent {
                width: 0,
                height: 3
            }
        );
    }

    #[test]
    fn test_frame_row_major_access() {
        let data: Vec<u16> = (0..12).collect();
        let frame = Frame::new(&data, 4, 3).unwrap();
        assert_eq!(frame.get(0, 0), 0);
        assert_eq!(frame.get(3, 0), 3);
        assert_eq!(frame.get(1, 2), 9);
        assert_eq!(frame.row(1), &[4, 5, 6, 7]);
    }

    #[test]
    fn test_stack_frames() {
        let data: Vec<u8> = (0..24).collect();
        let stack = FrameStack::new(&data, 4, 3, 2).unwrap();
        assert_eq!(stack.frames(), 2);
        assert_eq!(stack.frame(1).unwrap().get(0, 0), 12);
        assert!(stack.frame(2).is_none());
        assert_eq!(stack.iter().count(), 2);
        assert!(FrameStack::new(&data, 4, 3, 3).is_err());
    }

    #[test]
    fn test_oversized_dimensions_rejected() {
        let empty: Vec<u16> = Vec::new();
        assert_eq!(
            Frame::new(&empty, usize::MAX, 2).unwrap_err(),
            FrameError::DimensionOverflow {
                width: usize::MAX,
                height: 2,
                frames: 1
            }
        );
        assert!(matches!(
            FrameStack::new(&empty, usize::MAX / 2, 3, 1),
            Err(FrameError::DimensionOverflow { .. })
        ));
        assert!(matches!(
            FrameStack::new(&empty, usize::MAX, 1, 2),
            Err(FrameError::DimensionOverflow { .. })
        ));
    }

    #[test]
    fn test_output_frame_saturates() {
        let mut out: OutputFrame<u8> = OutputFrame::zeros(2, 2);
        assert!(out.is_blank());
        out.add_count(1, 1, 200);
        out.add_count(1, 1, 100);
        assert_eq!(out.get(1, 1), u8::MAX);
        assert!(!out.is_blank());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_output_frame_serializes() {
        let mut out: OutputFrame<u16> = OutputFrame::zeros(2, 1);
        out.add_count(1, 0, 7);
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["data"], serde_json::json!([0, 7]));
        assert_eq!(json["width"], 2);
    }

    #[test]
    fn test_pixel_from_count() {
        assert_eq!(u16::from_count(70_000), u16::MAX);
        assert_eq!(u16::from_count(42), 42);
        assert_eq!(u32::from_count(u64::MAX), u32::MAX);
    }
}

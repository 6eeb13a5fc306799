//! Memory-mapped raw frame readers.
//!
//! A raw frame file is a headerless sequence of `width * height` unsigned
//! 16-bit little-endian samples per frame, frames stored back to back.

use crate::{Error, Result};
use centroids_core::FrameError;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Bytes per stored sample.
const SAMPLE_BYTES: usize = std::mem::size_of::<u16>();

/// A memory-mapped file reader.
///
/// Uses memmap2 to access file contents without loading the entire file
/// into memory.
pub struct MappedFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Path the mapping was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reader for raw 16-bit frame files.
pub struct RawFrameReader {
    reader: MappedFileReader,
    width: usize,
    height: usize,
    frame_bytes: usize,
    frames: usize,
}

impl RawFrameReader {
    /// Opens a raw frame file with the given frame dimensions.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped, if either dimension is
    /// zero or too large, or if the file size is not a whole number of frames.
    pub fn open<P: AsRef<Path>>(path: P, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(FrameError::ZeroExtent { width, height }.into());
        }
        let frame_bytes = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(SAMPLE_BYTES))
            .ok_or(FrameError::DimensionOverflow {
                width,
                height,
                frames: 1,
            })?;
        let reader = MappedFileReader::open(path)?;
        if reader.is_empty() || reader.len() % frame_bytes != 0 {
            return Err(Error::InvalidFormat(format!(
                "{}: {} bytes is not a whole number of {width}x{height} frames ({frame_bytes} bytes each)",
                reader.path().display(),
                reader.len()
            )));
        }
        let frames = reader.len() / frame_bytes;
        log::debug!(
            "mapped {} ({frames} frames of {width}x{height})",
            reader.path().display()
        );
        Ok(Self {
            reader,
            width,
            height,
            frame_bytes,
            frames,
        })
    }

    /// Frame width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of complete frames in the file.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// Size of one frame in bytes.
    #[must_use]
    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    /// Decodes frame `index`.
    ///
    /// # Errors
    /// Returns an error if `index` is past the last frame.
    pub fn read_frame(&self, index: usize) -> Result<Vec<u16>> {
        if index >= self.frames {
            return Err(Error::InvalidFormat(format!(
                "frame {index} out of range (file holds {})",
                self.frames
            )));
        }
        let size = self.frame_bytes();
        let start = index * size;
        Ok(decode(&self.reader.as_bytes()[start..start + size]))
    }

    /// Decodes the first `frames` frames into one contiguous buffer.
    ///
    /// # Errors
    /// Returns an error if the file holds fewer than `frames` frames.
    pub fn read_frames(&self, frames: usize) -> Result<Vec<u16>> {
        if frames > self.frames {
            return Err(Error::InvalidFormat(format!(
                "requested {frames} frames, file holds {}",
                self.frames
            )));
        }
        Ok(decode(&self.reader.as_bytes()[..frames * self.frame_bytes()]))
    }

    /// Iterates over all frames in file order.
    #[must_use]
    pub fn frames(&self) -> FrameIter<'_> {
        FrameIter {
            reader: self,
            next: 0,
        }
    }
}

/// Iterator over decoded frames.
pub struct FrameIter<'a> {
    reader: &'a RawFrameReader,
    next: usize,
}

impl Iterator for FrameIter<'_> {
    type Item = Vec<u16>;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.reader.read_frame(self.next).ok()?;
        self.next += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.reader.frames.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameIter<'_> {}

fn decode(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(SAMPLE_BYTES)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect()
}

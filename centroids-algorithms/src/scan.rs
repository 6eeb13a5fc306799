//! Seed search by thresholded non-maximum suppression.
//!
//! A pixel seeds a candidate when it reaches the threshold and is the
//! tallest pixel in the square neighborhood of radius `search_box` around it.
//! Equal values are resolved by row-major order: the first one wins.

use centroids_core::{Frame, Pixel, Seed, ValidatedParams};
use std::iter::FusedIterator;

/// Threshold plus square non-maximum suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborhoodScanner {
    threshold: u64,
    radius: usize,
}

impl NeighborhoodScanner {
    /// Creates a scanner with an explicit threshold and search radius.
    #[must_use]
    pub fn new(threshold: u64, radius: usize) -> Self {
        Self { threshold, radius }
    }

    /// Creates a scanner from validated parameters.
    #[must_use]
    pub fn from_params(params: &ValidatedParams) -> Self {
        Self::new(params.threshold, params.search_box)
    }

    /// Lazily scans `frame` in row-major order.
    ///
    /// The returned iterator can be cloned to restart from its current position;
    /// calling `scan` again always starts from the first pixel.
    #[must_use]
    pub fn scan<'a, P: Pixel>(&self, frame: Frame<'a, P>) -> Seeds<'a, P> {
        Seeds {
            frame,
            threshold: self.threshold,
            radius: self.radius,
            next: 0,
        }
    }
}

/// Iterator over the seeds of one frame.
#[derive(Debug, Clone)]
pub struct Seeds<'a, P> {
    frame: Frame<'a, P>,
    threshold: u64,
    radius: usize,
    next: usize,
}

impl<P: Pixel> Seeds<'_, P> {
    /// Number of pixels visited so far.
    #[must_use]
    pub fn pixels_visited(&self) -> usize {
        self.next
    }
}

impl<P: Pixel> Iterator for Seeds<'_, P> {
    type Item = Seed;

    fn next(&mut self) -> Option<Self::Item> {
        let width = self.frame.width();
        while self.next < self.frame.len() {
            let idx = self.next;
            self.next += 1;

            let (x, y) = (idx % width, idx / width);
            let value = self.frame.value(x, y);
            if value < self.threshold {
                continue;
            }
            if is_local_max(&self.frame, x, y, self.radius, value) {
                return Some(Seed::new(x, y, value));
            }
        }
        None
    }
}

impl<P: Pixel> FusedIterator for Seeds<'_, P> {}

/// True if no neighbor within `r` is taller, and no earlier neighbor is equal.
fn is_local_max<P: Pixel>(frame: &Frame<'_, P>, x: usize, y: usize, r: usize, v: u64) -> bool {
    let x0 = x.saturating_sub(r);
    let x1 = (x + r).min(frame.width() - 1);
    let y0 = y.saturating_sub(r);
    let y1 = (y + r).min(frame.height() - 1);

    for yy in y0..=y1 {
        let row = frame.row(yy);
        for (xx, px) in row.iter().enumerate().take(x1 + 1).skip(x0) {
            if xx == x && yy == y {
                continue;
            }
            let vv = px.to_u64();
            let earlier = yy < y || (yy == y && xx < x);
            if vv > v || (earlier && vv == v) {
                return false;
            }
        }
    }
    true
}

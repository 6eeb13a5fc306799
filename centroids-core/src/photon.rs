//! Seeds, photon records and the photon table.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A candidate event location surviving non-maximum suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Seed {
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
    /// Raw intensity of the seed pixel.
    pub value: u64,
}

impl Seed {
    /// Creates a new seed.
    #[inline]
    #[must_use]
    pub fn new(x: usize, y: usize, value: u64) -> Self {
        Self { x, y, value }
    }

    /// Pixel center as floating point coordinates.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn center(&self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }
}

/// Per-mode position estimates for one photon.
///
/// A field is `Some` exactly when the corresponding fit mode was enabled.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitResults {
    /// 2D center of mass.
    pub com_2d: Option<(f64, f64)>,
    /// X from the column-sum projection.
    pub marginal_x: Option<f64>,
    /// Y from the row-sum projection.
    pub marginal_y: Option<f64>,
}

impl FitResults {
    /// Primary position: the 2D estimate if present, otherwise each axis
    /// from its marginal estimate, falling back to `seed_center`.
    #[must_use]
    pub fn primary(&self, seed_center: (f64, f64)) -> (f64, f64) {
        if let Some(xy) = self.com_2d {
            return xy;
        }
        (
            self.marginal_x.unwrap_or(seed_center.0),
            self.marginal_y.unwrap_or(seed_center.1),
        )
    }

    /// Number of estimates present.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.com_2d.is_some())
            + usize::from(self.marginal_x.is_some())
            + usize::from(self.marginal_y.is_some())
    }

    /// Returns true if no estimate is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Raw pixel data retained with a photon.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WindowPixels {
    /// Row-major copy of the fitting window.
    Window { width: usize, pixels: Vec<u64> },
    /// Row sums (top to bottom) and column sums (left to right).
    Marginals { rows: Vec<u64>, cols: Vec<u64> },
}

/// An accepted photon event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhotonRecord {
    /// Frame index within the call.
    pub frame: usize,
    /// Primary sub-pixel X.
    pub x: f64,
    /// Primary sub-pixel Y.
    pub y: f64,
    /// Seed pixel column.
    pub seed_x: usize,
    /// Seed pixel row.
    pub seed_y: usize,
    /// Seed pixel intensity.
    pub peak: u64,
    /// Sum over the fitting window.
    pub sum: u64,
    /// Photon count from the window sum.
    pub photons: u64,
    /// Photon count from the peak pixel alone.
    pub pixel_photons: u64,
    /// Individual fit estimates.
    pub fits: FitResults,
    /// Retained raw pixels, if requested.
    pub pixels: Option<WindowPixels>,
}

impl PhotonRecord {
    /// Integer pixel the photon is marked at: the rounded primary position
    /// clamped into a `width` x `height` frame.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn marker_pixel(&self, width: usize, height: usize) -> (usize, usize) {
        let clamp = |v: f64, extent: usize| v.round().clamp(0.0, (extent - 1) as f64) as usize;
        (clamp(self.x, width), clamp(self.y, height))
    }
}

/// Ordered sequence of photons, in detection order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhotonTable {
    records: Vec<PhotonRecord>,
}

impl PhotonTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    /// Appends a record.
    pub fn push(&mut self, record: PhotonRecord) {
        self.records.push(record);
    }

    /// Moves all records of `other` to the end of this table.
    pub fn append(&mut self, other: &mut PhotonTable) {
        self.records.append(&mut other.records);
    }

    /// Number of photon records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of calibrated photon counts over all records.
    #[must_use]
    pub fn total_photons(&self) -> u64 {
        self.records.iter().map(|r| r.photons).sum()
    }

    /// Returns an iterator over the records.
    pub fn iter(&self) -> std::slice::Iter<'_, PhotonRecord> {
        self.records.iter()
    }

    /// Records as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[PhotonRecord] {
        &self.records
    }
}

impl FromIterator<PhotonRecord> for PhotonTable {
    fn from_iter<I: IntoIterator<Item = PhotonRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PhotonTable {
    type Item = PhotonRecord;
    type IntoIter = std::vec::IntoIter<PhotonRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a PhotonTable {
    type Item = &'a PhotonRecord;
    type IntoIter = std::slice::Iter<'a, PhotonRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl std::ops::Index<usize> for PhotonTable {
    type Output = PhotonRecord;

    fn index(&self, index: usize) -> &Self::Output {
        &self.records[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(x: f64, y: f64, photons: u64) -> PhotonRecord {
        PhotonRecord {
            frame: 0,
            x,
            y,
            seed_x: x.round() as usize,
            seed_y: y.round() as usize,
            peak: 10,
            sum: 10,
            photons,
            pixel_photons: 1,
            fits: FitResults::default(),
            pixels: None,
        }
    }

    #[test]
    fn test_primary_prefers_2d() {
        let fits = FitResults {
            com_2d: Some((3.25, 4.5)),
            marginal_x: Some(3.0),
            marginal_y: Some(4.0),
        };
        assert_eq!(fits.primary((3.0, 4.0)), (3.25, 4.5));
        assert_eq!(fits.len(), 3);
    }

    #[test]
    fn test_primary_falls_back_per_axis() {
        let fits = FitResults {
            com_2d: None,
            marginal_x: Some(7.5),
            marginal_y: None,
        };
        let (x, y) = fits.primary((7.0, 9.0));
        assert_relative_eq!(x, 7.5);
        assert_relative_eq!(y, 9.0);

        let empty = FitResults::default();
        assert!(empty.is_empty());
        assert_eq!(empty.primary((1.0, 2.0)), (1.0, 2.0));
    }

    #[test]
    fn test_marker_pixel_rounds_and_clamps() {
        assert_eq!(record(2.6, 3.4, 1).marker_pixel(10, 10), (3, 3));
        assert_eq!(record(9.7, 0.2, 1).marker_pixel(10, 10), (9, 0));
    }

    #[test]
    fn test_table_operations() {
        let mut table = PhotonTable::with_capacity(4);
        assert!(table.is_empty());
        table.push(record(1.0, 1.0, 2));
        table.push(record(5.0, 1.0, 3));

        let mut other: PhotonTable = vec![record(2.0, 8.0, 1)].into_iter().collect();
        table.append(&mut other);

        assert_eq!(table.len(), 3);
        assert!(other.is_empty());
        assert_eq!(table.total_photons(), 6);
        assert_relative_eq!(table[2].y, 8.0);
        assert_eq!(table.iter().filter(|r| r.photons > 1).count(), 2);
    }
}

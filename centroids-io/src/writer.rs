//! Photon table and map writers.

use crate::Result;
use centroids_core::{OutputFrame, PhotonRecord, PhotonTable};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Size of one binary photon record in bytes.
pub const BINARY_RECORD_SIZE: usize = 72;

/// Writer for centroiding output.
///
/// Writes photon tables as CSV, JSON or fixed-size binary records, and
/// annotated maps as raw little-endian frames.
pub struct PhotonFileWriter {
    writer: BufWriter<File>,
}

impl PhotonFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes photons as CSV.
    ///
    /// Fit columns are left empty when the corresponding mode was disabled.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_photons_csv(&mut self, photons: &PhotonTable) -> Result<()> {
        writeln!(
            self.writer,
            "frame,x,y,seed_x,seed_y,peak,sum,photons,pixel_photons,com_x,com_y,marginal_x,marginal_y"
        )?;

        for p in photons {
            let (com_x, com_y) = p
                .fits
                .com_2d
                .map_or((String::new(), String::new()), |(x, y)| (x.to_string(), y.to_string()));
            writeln!(
                self.writer,
                "{},{},{},{},{},{},{},{},{},{},{},{},{}",
                p.frame,
                p.x,
                p.y,
                p.seed_x,
                p.seed_y,
                p.peak,
                p.sum,
                p.photons,
                p.pixel_photons,
                com_x,
                com_y,
                optional(p.fits.marginal_x),
                optional(p.fits.marginal_y)
            )?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Writes photons as binary data.
    ///
    /// Format: for each photon: u64 (frame) + f64 (x) + f64 (y) + u64 (`seed_x`)
    /// + u64 (`seed_y`) + u64 (peak) + u64 (sum) + u64 (photons) + u64 (`pixel_photons`),
    /// all little-endian. Total: 72 bytes per photon
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_photons_binary(&mut self, photons: &PhotonTable) -> Result<()> {
        for p in photons {
            self.write_record(p)?;
        }

        self.writer.flush()?;
        Ok(())
    }

    fn write_record(&mut self, p: &PhotonRecord) -> Result<()> {
        self.writer.write_all(&(p.frame as u64).to_le_bytes())?;
        self.writer.write_all(&p.x.to_le_bytes())?;
        self.writer.write_all(&p.y.to_le_bytes())?;
        self.writer.write_all(&(p.seed_x as u64).to_le_bytes())?;
        self.writer.write_all(&(p.seed_y as u64).to_le_bytes())?;
        self.writer.write_all(&p.peak.to_le_bytes())?;
        self.writer.write_all(&p.sum.to_le_bytes())?;
        self.writer.write_all(&p.photons.to_le_bytes())?;
        self.writer.write_all(&p.pixel_photons.to_le_bytes())?;
        Ok(())
    }

    /// Writes the full table, including fits and retained pixels, as JSON.
    ///
    /// # Errors
    /// Returns an error if serialization or writing fails.
    pub fn write_photons_json(&mut self, photons: &PhotonTable) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, photons)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Appends annotated maps as raw 16-bit little-endian frames.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_maps(&mut self, maps: &[OutputFrame<u16>]) -> Result<()> {
        for map in maps {
            for v in map.as_slice() {
                self.writer.write_all(&v.to_le_bytes())?;
            }
        }

        self.writer.flush()?;
        Ok(())
    }
}

fn optional(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use centroids_core::FitResults;
    use tempfile::NamedTempFile;

    fn photon(frame: usize, x: f64, y: f64) -> PhotonRecord {
        PhotonRecord {
            frame,
            x,
            y,
            seed_x: 4,
            seed_y: 7,
            peak: 90,
            sum: 120,
            photons: 3,
            pixel_photons: 2,
            fits: FitResults {
                com_2d: Some((x, y)),
                marginal_x: None,
                marginal_y: Some(y),
            },
            pixels: None,
        }
    }

    fn table() -> PhotonTable {
        vec![photon(0, 4.25, 7.5), photon(2, 10.5, 1.75)]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_write_photons_csv() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = PhotonFileWriter::create(file.path()).unwrap();

        writer.write_photons_csv(&table()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("frame,x,y,seed_x"));
        assert_eq!(lines[1], "0,4.25,7.5,4,7,90,120,3,2,4.25,7.5,,7.5");
        assert_eq!(lines[2], "2,10.5,1.75,4,7,90,120,3,2,10.5,1.75,,1.75");
    }

    #[test]
    fn test_write_photons_binary() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = PhotonFileWriter::create(file.path()).unwrap();

        writer.write_photons_binary(&table()).unwrap();

        let data = std::fs::read(file.path()).unwrap();
        assert_eq!(data.len(), 2 * BINARY_RECORD_SIZE);
        let x = f64::from_le_bytes(data[8..16].try_into().unwrap());
        assert!((x - 4.25).abs() < f64::EPSILON);
        let frame = u64::from_le_bytes(data[72..80].try_into().unwrap());
        assert_eq!(frame, 2);
    }

    #[test]
    fn test_write_photons_json() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = PhotonFileWriter::create(file.path()).unwrap();

        writer.write_photons_json(&table()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let back: PhotonTable = serde_json::from_str(&content).unwrap();
        assert_eq!(back, table());
    }

    #[test]
    fn test_write_maps() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = PhotonFileWriter::create(file.path()).unwrap();

        let mut map = OutputFrame::<u16>::zeros(3, 2);
        map.add_count(1, 1, 513);
        writer.write_maps(&[map, OutputFrame::zeros(3, 2)]).unwrap();

        let data = std::fs::read(file.path()).unwrap();
        assert_eq!(data.len(), 2 * 3 * 2 * 2);
        assert_eq!(&data[8..10], &513u16.to_le_bytes());
    }
}

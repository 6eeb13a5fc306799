//! Parameter files.

use crate::Result;
use centroids_core::ParameterSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Loads a parameter set from a JSON file.
///
/// Missing keys take their default values.
///
/// # Errors
/// Returns an error if the file cannot be read or is not valid JSON.
pub fn load_params<P: AsRef<Path>>(path: P) -> Result<ParameterSet> {
    let file = File::open(path.as_ref())?;
    let params = serde_json::from_reader(BufReader::new(file))?;
    log::debug!("loaded parameters from {}", path.as_ref().display());
    Ok(params)
}

/// Writes a parameter set as pretty-printed JSON.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn save_params<P: AsRef<Path>>(path: P, params: &ParameterSet) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, params)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "threshold": 250, "box": 1, "overlap_max": 3 }}"#).unwrap();
        file.flush().unwrap();

        let params = load_params(file.path()).unwrap();
        assert_eq!(params.threshold, 250);
        assert_eq!(params.box_size, 1);
        assert_eq!(params.overlap_max, 3);
        assert_eq!(params.search_box, ParameterSet::default().search_box);
    }

    #[test]
    fn test_save_then_load() {
        let file = NamedTempFile::new().unwrap();
        let params = ParameterSet::default().with_threshold(42).with_overlap_max(2);
        save_params(file.path(), &params).unwrap();
        assert_eq!(load_params(file.path()).unwrap(), params);
    }

    #[test]
    fn test_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "threshold = 3").unwrap();
        file.flush().unwrap();
        assert!(matches!(load_params(file.path()), Err(Error::Json(_))));
    }
}

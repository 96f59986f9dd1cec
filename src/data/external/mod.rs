//! External values: a numeric series aligned with the selected days.
//!
//! Three encodings are recognised, chosen by file extension:
//!
//! | extension | encoding                    | decoder          |
//! |-----------|-----------------------------|------------------|
//! | `.npy`    | NumPy dense array           | [`npy::decode`]  |
//! | `.pkl`    | Python pickle               | [`pickle::decode`] |
//! | `.mat`    | MATLAB Level 4/5 container  | [`mat::decode`]  |

pub mod mat;
pub mod npy;
mod numeric;
pub mod pickle;
mod unpickle;

use std::fmt;
use std::path::Path;

use super::error::{DataError, Result};
use super::model::{ArrayLike, DayFolder, DecodedValue, NdArray};

// ---------------------------------------------------------------------------
// Encoding dispatch
// ---------------------------------------------------------------------------

/// The recognised external-value encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueEncoding {
    Npy,
    Pickle,
    Mat,
}

type Decoder = fn(&[u8]) -> Result<DecodedValue>;

impl ValueEncoding {
    pub const ALL: [ValueEncoding; 3] = [ValueEncoding::Npy, ValueEncoding::Pickle, ValueEncoding::Mat];

    /// Resolve the encoding from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "npy" => Ok(ValueEncoding::Npy),
            "pkl" => Ok(ValueEncoding::Pickle),
            "mat" => Ok(ValueEncoding::Mat),
            "" => Err(DataError::UnsupportedFormat(format!(
                "{} (no extension)",
                path.display()
            ))),
            other => Err(DataError::UnsupportedFormat(format!(".{other}"))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ValueEncoding::Npy => "npy",
            ValueEncoding::Pickle => "pkl",
            ValueEncoding::Mat => "mat",
        }
    }

    fn decoder(self) -> Decoder {
        match self {
            ValueEncoding::Npy => decode_npy,
            ValueEncoding::Pickle => pickle::decode,
            ValueEncoding::Mat => decode_mat,
        }
    }
}

impl fmt::Display for ValueEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ValueEncoding::Npy => "NumPy",
            ValueEncoding::Pickle => "Pickle",
            ValueEncoding::Mat => "MATLAB",
        };
        write!(f, "{label}")
    }
}

fn decode_npy(bytes: &[u8]) -> Result<DecodedValue> {
    match npy::decode(bytes)? {
        npy::NpyContent::Array(array) => Ok(DecodedValue::Array(array)),
        npy::NpyContent::Pickled(stream) => pickle::decode(&stream),
    }
}

fn decode_mat(bytes: &[u8]) -> Result<DecodedValue> {
    let file = mat::decode(bytes)?;
    first_data_array(&file).map(DecodedValue::Array)
}

/// Names starting with `__` hold container metadata, not data.
pub fn is_metadata_key(name: &str) -> bool {
    name.starts_with("__")
}

/// The first non-metadata entry that is a numeric array.
fn first_data_array(file: &mat::MatFile) -> Result<NdArray> {
    file.entries()
        .iter()
        .filter(|entry| !is_metadata_key(&entry.name))
        .find_map(|entry| entry.value.as_array())
        .cloned()
        .ok_or_else(|| DataError::parse("No numeric array found in .mat file"))
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read a values file and flatten it (scalar → one element, N-D → row-major).
pub fn load_values(path: &Path) -> Result<Vec<f64>> {
    let encoding = ValueEncoding::from_path(path)?;
    let bytes = std::fs::read(path).map_err(|e| DataError::io(path, e))?;
    let decoded = (encoding.decoder())(&bytes).map_err(|e| match e {
        DataError::Parse(msg) => DataError::Parse(format!("{}: {msg}", path.display())),
        other => other,
    })?;

    log::debug!(
        "Loaded {} file {} with shape {:?}",
        encoding,
        path.display(),
        decoded.shape()
    );
    Ok(decoded.to_flat_vec())
}

/// Single-file mode: one file holds the values for every selected day.
///
/// The number of values is not checked here; see [`ensure_aligned`].
pub fn load_single(path: Option<&Path>) -> Result<Vec<f64>> {
    let path = path
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| DataError::Validation("No values file selected".into()))?;
    load_values(path)
}

/// Per-day mode: `<day>/<filename>` must exist in every day folder and hold
/// exactly one value. The result follows the order of `days`.
pub fn load_per_day(days: &[DayFolder], filename: &str) -> Result<Vec<f64>> {
    if filename.trim().is_empty() {
        return Err(DataError::Validation("No daily values filename given".into()));
    }

    let mut values = Vec::with_capacity(days.len());
    for day in days {
        let path = day.path().join(filename);
        if !path.is_file() {
            return Err(DataError::MissingFile {
                filename: filename.to_string(),
                folder: day.name().to_string(),
            });
        }
        let vals = load_values(&path)?;
        match vals.as_slice() {
            [v] => values.push(*v),
            _ => {
                return Err(DataError::Validation(format!(
                    "Expected exactly one value in {} (folder {}), got {}",
                    filename,
                    day.name(),
                    vals.len()
                )))
            }
        }
    }
    Ok(values)
}

/// Check that a single-file series has one value per selected day.
pub fn ensure_aligned(values: &[f64], days: &[DayFolder]) -> Result<()> {
    if values.len() != days.len() {
        return Err(DataError::Validation(format!(
            "Number of values ({}) does not match number of selected days ({})",
            values.len(),
            days.len()
        )));
    }
    Ok(())
}

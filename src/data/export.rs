use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;

use super::error::{DataError, Result};
use super::external::mat::{self, MatVariable};
use super::external::{npy, pickle};
use super::model::{NdArray, WeightRecord};

// ---------------------------------------------------------------------------
// Output mapping
// ---------------------------------------------------------------------------

/// The saved mapping: weights and their dates, index-aligned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightExport {
    pub weights: Vec<f64>,
    pub dates: Vec<String>,
}

impl WeightExport {
    pub fn from_records(records: &[WeightRecord]) -> Self {
        WeightExport {
            weights: records.iter().map(|r| r.weight).collect(),
            dates: records.iter().map(|r| r.day.name().to_string()).collect(),
        }
    }
}

/// Formats the weights can be saved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Mat,
    Npy,
}

impl SaveFormat {
    pub const ALL: [SaveFormat; 2] = [SaveFormat::Mat, SaveFormat::Npy];

    pub fn extension(self) -> &'static str {
        match self {
            SaveFormat::Mat => "mat",
            SaveFormat::Npy => "npy",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SaveFormat::Mat => "MATLAB files",
            SaveFormat::Npy => "NumPy files",
        }
    }
}

impl fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// `weights_<YYYYmmdd_HHMMSS>.<ext>`
pub fn default_file_name(format: SaveFormat, now: DateTime<Local>) -> String {
    format!("weights_{}.{}", now.format("%Y%m%d_%H%M%S"), format.extension())
}

// ---------------------------------------------------------------------------
// Encoding / saving
// ---------------------------------------------------------------------------

/// Serialize the mapping.
///
/// * `.mat`: `weights` as a 1xN double row, `dates` as a 1xN cell of strings.
/// * `.npy`: a 0-d object array holding the mapping, laid out the way NumPy
///   saves a dict.
pub fn encode(export: &WeightExport, format: SaveFormat) -> Result<Vec<u8>> {
    match format {
        SaveFormat::Mat => {
            let weights = NdArray::new(vec![export.weights.len()], export.weights.clone())?;
            Ok(mat::encode(&[
                ("weights", MatVariable::Double(weights)),
                ("dates", MatVariable::Strings(export.dates.clone())),
            ]))
        }
        SaveFormat::Npy => {
            let stream = pickle::encode_object_array(&[], std::slice::from_ref(export))?;
            Ok(npy::encode_pickled(&[], &stream))
        }
    }
}

pub fn save(path: &Path, export: &WeightExport, format: SaveFormat) -> Result<()> {
    if export.weights.len() != export.dates.len() {
        return Err(DataError::Validation(format!(
            "{} weights but {} dates",
            export.weights.len(),
            export.dates.len()
        )));
    }
    let bytes = encode(export, format)?;
    std::fs::write(path, bytes).map_err(|e| DataError::io(path, e))?;
    log::info!(
        "Saved {} weights to {} ({format})",
        export.weights.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::external::mat::MatValue;
    use crate::data::model::ArrayLike;
    use chrono::TimeZone;
    use serde_pickle::{DeOptions, HashableValue, Value};
    use tempfile::TempDir;

    fn sample() -> WeightExport {
        WeightExport {
            weights: vec![80.0, 81.5, 82.0],
            dates: vec!["20250101".into(), "20250102".into(), "20250103".into()],
        }
    }

    #[test]
    fn test_default_file_name() {
        let now = Local.with_ymd_and_hms(2025, 12, 1, 9, 5, 7).unwrap();
        assert_eq!(default_file_name(SaveFormat::Mat, now), "weights_20251201_090507.mat");
        assert_eq!(default_file_name(SaveFormat::Npy, now), "weights_20251201_090507.npy");
    }

    #[test]
    fn test_save_mat_format() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("weights.mat");
        save(&path, &sample(), SaveFormat::Mat).unwrap();

        let file = mat::decode(&std::fs::read(&path).unwrap()).unwrap();
        let weights = file.get("weights").and_then(MatValue::as_array).unwrap();
        assert_eq!(weights.to_flat_vec(), vec![80.0, 81.5, 82.0]);

        let Some(MatValue::Cell { items, .. }) = file.get("dates") else {
            panic!("dates should be a cell array");
        };
        let dates: Vec<String> = items
            .iter()
            .map(|item| match item {
                MatValue::Char(rows) => rows.concat(),
                other => panic!("unexpected cell item {other:?}"),
            })
            .collect();
        assert_eq!(dates, sample().dates);
    }

    #[test]
    fn test_save_npy_format() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("weights.npy");
        save(&path, &sample(), SaveFormat::Npy).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let npy::NpyContent::Pickled(stream) = npy::decode(&bytes).unwrap() else {
            panic!("expected an object array");
        };
        // BUILD leaves the ndarray state: (1, shape, dtype, fortran, [items]).
        let options = DeOptions::new().replace_unresolved_globals().keep_restore_state();
        let value = serde_pickle::value_from_slice(&stream, options).unwrap();
        let Value::Tuple(state) = value else {
            panic!("expected the ndarray state, got {value:?}");
        };
        assert_eq!(state.len(), 5);
        assert_eq!(state[0], Value::I64(1));
        assert_eq!(state[1], Value::Tuple(Vec::new()));
        assert_eq!(state[3], Value::Bool(false));
        let Value::List(items) = &state[4] else {
            panic!("expected the object list, got {:?}", state[4]);
        };
        let [Value::Dict(map)] = items.as_slice() else {
            panic!("expected a single dict, got {items:?}");
        };
        let weights = &map[&HashableValue::String("weights".into())];
        assert_eq!(
            weights,
            &Value::List(vec![Value::F64(80.0), Value::F64(81.5), Value::F64(82.0)])
        );
        let Value::List(dates) = &map[&HashableValue::String("dates".into())] else {
            panic!("dates should be a list");
        };
        assert_eq!(dates.len(), 3);
    }

    #[test]
    fn test_saved_mat_loads_back_as_external_values() {
        let tmp = TempDir::new().unwrap();
        let mat_path = tmp.path().join("w.mat");
        save(&mat_path, &sample(), SaveFormat::Mat).unwrap();

        // `weights` is the first numeric entry.
        let from_mat = crate::data::external::load_values(&mat_path).unwrap();
        assert_eq!(from_mat, sample().weights);
    }

    #[test]
    fn test_saved_npy_is_not_an_external_values_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("w.npy");
        save(&path, &sample(), SaveFormat::Npy).unwrap();

        let err = crate::data::external::load_values(&path).unwrap_err();
        assert!(err.to_string().contains("not numeric or array-like"), "{err}");
    }

    #[test]
    fn test_save_empty_weights() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.mat");
        let empty = WeightExport {
            weights: Vec::new(),
            dates: Vec::new(),
        };
        save(&path, &empty, SaveFormat::Mat).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_save_rejects_misaligned_mapping() {
        let tmp = TempDir::new().unwrap();
        let mut export = sample();
        export.dates.pop();
        let err = save(&tmp.path().join("bad.mat"), &export, SaveFormat::Mat).unwrap_err();
        assert!(matches!(err, DataError::Validation(_)));
    }

    #[test]
    fn test_save_into_missing_directory_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("no_such_dir").join("w.npy");
        let err = save(&path, &sample(), SaveFormat::Npy).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}

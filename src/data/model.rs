use std::fmt;
use std::path::{Path, PathBuf};

use super::error::{DataError, Result};

// ---------------------------------------------------------------------------
// DayFolder – one experiment day on disk
// ---------------------------------------------------------------------------

/// A directory named after its experiment date (`YYYYMMDD`).
///
/// Field order matters: the derived `Ord` compares `name` first, so sorting
/// day folders is chronological.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayFolder {
    name: String,
    path: PathBuf,
}

impl DayFolder {
    /// Build a day folder when the last path component is exactly eight
    /// ASCII digits. No existence check is made here.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let name = path.file_name()?.to_str()?.to_string();
        if !is_date_name(&name) {
            return None;
        }
        Some(DayFolder { name, path })
    }

    /// The 8-digit date string.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for DayFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// `^\d{8}$`, ASCII digits only.
pub fn is_date_name(name: &str) -> bool {
    name.len() == 8 && name.bytes().all(|b| b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// WeightRecord
// ---------------------------------------------------------------------------

/// The weight extracted for one day. The value is not range-checked.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightRecord {
    pub day: DayFolder,
    pub weight: f64,
}

// ---------------------------------------------------------------------------
// Array-like capability
// ---------------------------------------------------------------------------

/// Anything that has a shape and can be flattened in row-major order.
///
/// Every decoder adapts its output to this trait; values that cannot be
/// adapted are rejected as parse errors before reaching the caller.
pub trait ArrayLike {
    /// Dimensions, outermost first. A scalar has an empty shape.
    fn shape(&self) -> Vec<usize>;

    /// All elements in row-major (C) order.
    fn to_flat_vec(&self) -> Vec<f64>;

    /// Number of elements (1 for a scalar).
    fn element_count(&self) -> usize {
        self.shape().iter().product()
    }
}

/// Number of elements in `shape`, failing on overflow.
///
/// Shapes come from file headers; sizes derived from them go through here
/// before anything is allocated.
pub fn checked_element_count(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| DataError::parse(format!("array shape {shape:?} is too large")))
}

/// Dense N-dimensional array stored in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl NdArray {
    /// Create an array, checking that `data` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let expected = checked_element_count(&shape)?;
        if expected != data.len() {
            return Err(DataError::parse(format!(
                "array of shape {shape:?} needs {expected} values, found {}",
                data.len()
            )));
        }
        Ok(NdArray { shape, data })
    }

    /// Build from column-major (Fortran) storage, reordering to row-major.
    pub fn from_column_major(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let expected = checked_element_count(&shape)?;
        if expected != data.len() {
            return Err(DataError::parse(format!(
                "array of shape {shape:?} needs {expected} values, found {}",
                data.len()
            )));
        }
        let data = column_major_to_row_major(&data, &shape);
        Ok(NdArray { shape, data })
    }

    pub fn scalar(value: f64) -> Self {
        NdArray {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

impl ArrayLike for NdArray {
    fn shape(&self) -> Vec<usize> {
        self.shape.clone()
    }

    fn to_flat_vec(&self) -> Vec<f64> {
        self.data.clone()
    }
}

/// The three shapes a decoded external-values payload can take.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    /// A bare number.
    Scalar(f64),
    /// A list or tuple, already flattened depth-first.
    Sequence(Vec<f64>),
    /// A shaped array.
    Array(NdArray),
}

impl ArrayLike for DecodedValue {
    fn shape(&self) -> Vec<usize> {
        match self {
            DecodedValue::Scalar(_) => Vec::new(),
            DecodedValue::Sequence(v) => vec![v.len()],
            DecodedValue::Array(a) => a.shape(),
        }
    }

    fn to_flat_vec(&self) -> Vec<f64> {
        match self {
            DecodedValue::Scalar(v) => vec![*v],
            DecodedValue::Sequence(v) => v.clone(),
            DecodedValue::Array(a) => a.to_flat_vec(),
        }
    }
}

/// Reorder column-major storage into row-major order.
///
/// `data.len()` must equal the product of `shape`.
pub fn column_major_to_row_major(data: &[f64], shape: &[usize]) -> Vec<f64> {
    if shape.len() < 2 {
        return data.to_vec();
    }
    let total: usize = shape.iter().product();

    let mut strides = vec![1usize; shape.len()];
    for axis in 1..shape.len() {
        strides[axis] = strides[axis - 1] * shape[axis - 1];
    }

    let mut out = Vec::with_capacity(total);
    let mut index = vec![0usize; shape.len()];
    for _ in 0..total {
        let offset: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
        out.push(data[offset]);
        // Last axis varies fastest.
        for axis in (0..shape.len()).rev() {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    out
}

/// Reorder row-major storage into column-major order (inverse of
/// [`column_major_to_row_major`]).
pub fn row_major_to_column_major(data: &[f64], shape: &[usize]) -> Vec<f64> {
    if shape.len() < 2 {
        return data.to_vec();
    }
    let total: usize = shape.iter().product();

    let mut strides = vec![1usize; shape.len()];
    for axis in (0..shape.len() - 1).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }

    let mut out = Vec::with_capacity(total);
    let mut index = vec![0usize; shape.len()];
    for _ in 0..total {
        let offset: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
        out.push(data[offset]);
        // First axis varies fastest.
        for axis in 0..shape.len() {
            index[axis] += 1;
            if index[axis] < shape[axis] {
                break;
            }
            index[axis] = 0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_round_trips_through_column_major() {
        let shape = [2, 3, 4];
        let data: Vec<f64> = (0..24).map(|v| v as f64).collect();
        let col = row_major_to_column_major(&data, &shape);
        assert_ne!(col, data);
        assert_eq!(column_major_to_row_major(&col, &shape), data);
    }

    #[test]
    fn test_day_folder_requires_exactly_eight_digits() {
        assert!(DayFolder::from_path("/data/20251201").is_some());
        assert!(DayFolder::from_path("/data/2025120").is_none());
        assert!(DayFolder::from_path("/data/202512011").is_none());
        assert!(DayFolder::from_path("/data/2025120a").is_none());
        assert!(DayFolder::from_path("/data/x20251201").is_none());
    }

    #[test]
    fn test_day_folders_sort_chronologically() {
        let mut days: Vec<DayFolder> = ["20251203", "20241231", "20251201"]
            .iter()
            .filter_map(|n| DayFolder::from_path(Path::new("/base").join(n)))
            .collect();
        days.sort();
        let names: Vec<&str> = days.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["20241231", "20251201", "20251203"]);
    }

    #[test]
    fn test_column_major_reorders_2d() {
        // [[1, 2, 3], [4, 5, 6]] stored column by column.
        let col_major = [1.0, 4.0, 2.0, 5.0, 3.0, 6.0];
        let out = column_major_to_row_major(&col_major, &[2, 3]);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_column_major_reorders_3d() {
        // shape (2, 2, 2), row-major value = 4*i + 2*j + k
        let mut col_major = vec![0.0; 8];
        for i in 0..2 {
            for j in 0..2 {
                for k in 0..2 {
                    col_major[i + 2 * j + 4 * k] = (4 * i + 2 * j + k) as f64;
                }
            }
        }
        let out = column_major_to_row_major(&col_major, &[2, 2, 2]);
        assert_eq!(out, (0..8).map(|v| v as f64).collect::<Vec<_>>());
    }

    #[test]
    fn test_element_count_overflow_is_a_parse_error() {
        assert_eq!(checked_element_count(&[]).unwrap(), 1);
        assert_eq!(checked_element_count(&[2, 0, 5]).unwrap(), 0);
        assert_eq!(checked_element_count(&[2, 3, 4]).unwrap(), 24);

        let huge = vec![usize::MAX / 2, 3];
        assert!(matches!(checked_element_count(&huge), Err(DataError::Parse(_))));
        assert!(matches!(NdArray::new(huge.clone(), Vec::new()), Err(DataError::Parse(_))));
        assert!(matches!(NdArray::from_column_major(huge, Vec::new()), Err(DataError::Parse(_))));
    }

    #[test]
    fn test_nd_array_rejects_wrong_length() {
        assert!(NdArray::new(vec![2, 2], vec![1.0, 2.0, 3.0]).is_err());
        let a = NdArray::new(vec![3], vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(a.element_count(), 3);
    }

    #[test]
    fn test_scalar_shapes() {
        let s = DecodedValue::Scalar(5.5);
        assert!(s.shape().is_empty());
        assert_eq!(s.element_count(), 1);
        assert_eq!(s.to_flat_vec(), vec![5.5]);
        assert_eq!(NdArray::scalar(2.0).to_flat_vec(), vec![2.0]);
    }
}

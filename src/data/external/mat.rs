//! MAT-file codec.
//!
//! Reading covers Level 5 numeric, logical, char and cell arrays, including
//! zlib-compressed elements, plus Level 4 full and text matrices. Sparse,
//! struct and object classes are kept as [`MatValue::Unsupported`]. Writing
//! produces uncompressed little-endian Level 5 files.

use std::io::Read;

use flate2::read::ZlibDecoder;

use super::numeric::{decode_numbers, NumericKind};
use crate::data::error::{DataError, Result};
use crate::data::model::{checked_element_count, row_major_to_column_major, ArrayLike, NdArray};

const HEADER_LEN: usize = 128;
const HEADER_TEXT_LEN: usize = 116;
const VERSION_5: u16 = 0x0100;
const VERSION_73: u16 = 0x0200;

// Data element types.
const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_INT16: u32 = 3;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_SINGLE: u32 = 7;
const MI_DOUBLE: u32 = 9;
const MI_INT64: u32 = 12;
const MI_UINT64: u32 = 13;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;
const MI_UTF8: u32 = 16;
const MI_UTF16: u32 = 17;

// Array classes.
const MX_CELL: u8 = 1;
const MX_CHAR: u8 = 4;
const MX_SPARSE: u8 = 5;
const MX_DOUBLE: u8 = 6;

// ---------------------------------------------------------------------------
// Decoded model
// ---------------------------------------------------------------------------

/// One decoded variable.
#[derive(Debug, Clone, PartialEq)]
pub enum MatValue {
    /// Numeric or logical array, row-major. Complex arrays keep the real part.
    Numeric(NdArray),
    /// Char array, one string per row.
    Char(Vec<String>),
    /// Cell array; items in column-major order.
    Cell { dims: Vec<usize>, items: Vec<MatValue> },
    /// File-level text such as the header (only under `__` names).
    Text(String),
    /// Array class this reader does not decode (sparse, struct, object...).
    Unsupported(u8),
}

impl MatValue {
    /// The numeric array, if this value has one.
    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            MatValue::Numeric(a) => Some(a),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatEntry {
    pub name: String,
    pub value: MatValue,
}

/// A decoded MAT-file as a name → value mapping in file order.
///
/// Like other MAT readers, the mapping starts with the `__header__`,
/// `__version__` and `__globals__` metadata entries.
#[derive(Debug, Clone, PartialEq)]
pub struct MatFile {
    entries: Vec<MatEntry>,
}

impl MatFile {
    pub fn entries(&self) -> &[MatEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&MatValue> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.value)
    }
}

// ---------------------------------------------------------------------------
// Byte cursor
// ---------------------------------------------------------------------------

struct Element<'a> {
    ty: u32,
    data: &'a [u8],
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    big_endian: bool,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8], big_endian: bool) -> Self {
        Reader {
            buf,
            pos: 0,
            big_endian,
        }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| DataError::parse("truncated MAT-file element"))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let raw: [u8; 4] = self
            .take(4)?
            .try_into()
            .map_err(|_| DataError::parse("truncated MAT-file tag"))?;
        Ok(if self.big_endian {
            u32::from_be_bytes(raw)
        } else {
            u32::from_le_bytes(raw)
        })
    }

    fn element(&mut self) -> Result<Element<'a>> {
        let first = self.u32()?;
        let small_len = (first >> 16) as usize;
        if small_len != 0 {
            // Small data element: type and size packed in one word, data in the next.
            if small_len > 4 {
                return Err(DataError::parse("corrupt small MAT-file element"));
            }
            let data = self.take(4)?;
            return Ok(Element {
                ty: first & 0xffff,
                data: &data[..small_len],
            });
        }

        let ty = first;
        let len = self.u32()? as usize;
        let data = self.take(len)?;
        if ty != MI_COMPRESSED {
            let padding = (8 - len % 8) % 8;
            self.pos += padding.min(self.remaining());
        }
        Ok(Element { ty, data })
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

pub fn decode(bytes: &[u8]) -> Result<MatFile> {
    if is_level4(bytes) {
        return decode_level4(bytes);
    }
    if bytes.len() < HEADER_LEN {
        return Err(DataError::parse("not a Level 5 MAT-file (header too short)"));
    }
    let big_endian = match &bytes[126..128] {
        b"IM" => false,
        b"MI" => true,
        _ => return Err(DataError::parse("not a Level 5 MAT-file (bad endian indicator)")),
    };
    let version_raw = [bytes[124], bytes[125]];
    let version = if big_endian {
        u16::from_be_bytes(version_raw)
    } else {
        u16::from_le_bytes(version_raw)
    };
    if version == VERSION_73 {
        return Err(DataError::parse("MAT v7.3 (HDF5) files are not supported"));
    }
    if version != VERSION_5 {
        return Err(DataError::parse(format!("unknown MAT-file version 0x{version:04x}")));
    }

    let header_text = String::from_utf8_lossy(&bytes[..HEADER_TEXT_LEN])
        .trim_end_matches([' ', '\0'])
        .to_string();

    let mut entries = vec![
        MatEntry {
            name: "__header__".into(),
            value: MatValue::Text(header_text),
        },
        MatEntry {
            name: "__version__".into(),
            value: MatValue::Text("1.0".into()),
        },
        MatEntry {
            name: "__globals__".into(),
            value: MatValue::Cell {
                dims: vec![0, 0],
                items: Vec::new(),
            },
        },
    ];

    read_elements(&bytes[HEADER_LEN..], big_endian, &mut entries)?;
    log::debug!("MAT-file decoded with {} entries", entries.len());
    Ok(MatFile { entries })
}

fn read_elements(buf: &[u8], big_endian: bool, entries: &mut Vec<MatEntry>) -> Result<()> {
    let mut reader = Reader::new(buf, big_endian);
    // Trailing bytes shorter than a tag are padding.
    while reader.remaining() >= 8 {
        let element = reader.element()?;
        match element.ty {
            MI_COMPRESSED => {
                let mut inflated = Vec::new();
                ZlibDecoder::new(element.data)
                    .read_to_end(&mut inflated)
                    .map_err(|e| DataError::parse(format!("corrupt compressed MAT element: {e}")))?;
                read_elements(&inflated, big_endian, entries)?;
            }
            MI_MATRIX => {
                let (name, value) = parse_matrix(element.data, big_endian)?;
                entries.push(MatEntry { name, value });
            }
            other => log::debug!("skipping top-level MAT element of type {other}"),
        }
    }
    Ok(())
}

fn parse_matrix(data: &[u8], big_endian: bool) -> Result<(String, MatValue)> {
    if data.is_empty() {
        // Empty cell slots are written as zero-length matrices.
        return Ok((String::new(), MatValue::Numeric(NdArray::new(vec![0, 0], Vec::new())?)));
    }

    let mut reader = Reader::new(data, big_endian);

    let flags_el = reader.element()?;
    let flag_word: [u8; 4] = flags_el
        .data
        .get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| DataError::parse("corrupt MAT array flags"))?;
    let flags = if big_endian {
        u32::from_be_bytes(flag_word)
    } else {
        u32::from_le_bytes(flag_word)
    };
    let class = (flags & 0xff) as u8;

    let dims_el = reader.element()?;
    let dims: Vec<usize> = decode_numbers(dims_el.data, NumericKind::Int, 4, big_endian)
        .ok_or_else(|| DataError::parse("corrupt MAT dimensions"))?
        .into_iter()
        .map(|d| d.max(0.0) as usize)
        .collect();

    let name_el = reader.element()?;
    let name = String::from_utf8_lossy(name_el.data).into_owned();

    let value = match class {
        MX_DOUBLE..=15 => {
            // Real part only; an imaginary part, if any, follows and is ignored.
            let real = reader.element()?;
            let values = decode_element_numbers(&real, big_endian)?;
            MatValue::Numeric(NdArray::from_column_major(dims, values)?)
        }
        MX_CHAR => {
            let el = reader.element()?;
            MatValue::Char(decode_char_rows(&el, &dims, big_endian)?)
        }
        MX_CELL => {
            let count = checked_element_count(&dims)?;
            // Every item needs at least a tag.
            let mut items = Vec::with_capacity(count.min(reader.remaining() / 8));
            for _ in 0..count {
                let el = reader.element()?;
                if el.ty != MI_MATRIX {
                    return Err(DataError::parse("cell item is not a MAT matrix"));
                }
                items.push(parse_matrix(el.data, big_endian)?.1);
            }
            MatValue::Cell { dims, items }
        }
        other => MatValue::Unsupported(other),
    };

    Ok((name, value))
}

fn element_layout(ty: u32) -> Option<(NumericKind, usize)> {
    Some(match ty {
        MI_INT8 => (NumericKind::Int, 1),
        MI_UINT8 => (NumericKind::Uint, 1),
        MI_INT16 => (NumericKind::Int, 2),
        MI_UINT16 => (NumericKind::Uint, 2),
        MI_INT32 => (NumericKind::Int, 4),
        MI_UINT32 => (NumericKind::Uint, 4),
        MI_SINGLE => (NumericKind::Float, 4),
        MI_DOUBLE => (NumericKind::Float, 8),
        MI_INT64 => (NumericKind::Int, 8),
        MI_UINT64 => (NumericKind::Uint, 8),
        _ => return None,
    })
}

fn decode_element_numbers(el: &Element<'_>, big_endian: bool) -> Result<Vec<f64>> {
    element_layout(el.ty)
        .and_then(|(kind, width)| decode_numbers(el.data, kind, width, big_endian))
        .ok_or_else(|| DataError::parse(format!("unsupported MAT data type {}", el.ty)))
}

fn decode_char_rows(el: &Element<'_>, dims: &[usize], big_endian: bool) -> Result<Vec<String>> {
    let chars: Vec<char> = match el.ty {
        MI_UINT16 | MI_UTF16 => {
            let units: Vec<u16> = el
                .data
                .chunks_exact(2)
                .map(|c| {
                    if big_endian {
                        u16::from_be_bytes([c[0], c[1]])
                    } else {
                        u16::from_le_bytes([c[0], c[1]])
                    }
                })
                .collect();
            String::from_utf16_lossy(&units).chars().collect()
        }
        MI_UINT8 | MI_INT8 | MI_UTF8 => String::from_utf8_lossy(el.data).chars().collect(),
        other => return Err(DataError::parse(format!("unsupported MAT char encoding {other}"))),
    };

    Ok(column_major_rows(&chars, dims.first().copied().unwrap_or(0)))
}

/// Split column-major chars into `rows` strings.
fn column_major_rows(chars: &[char], rows: usize) -> Vec<String> {
    if rows == 0 {
        return Vec::new();
    }
    let cols = chars.len() / rows;
    // Row r is every `rows`-th char starting at r.
    (0..rows)
        .map(|r| (0..cols).filter_map(|c| chars.get(r + c * rows)).collect())
        .collect()
}

// ---------------------------------------------------------------------------
// Level 4
// ---------------------------------------------------------------------------

/// A Level 5 file opens with header text, so a zero among the first four
/// bytes means Level 4.
fn is_level4(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[..4].contains(&0)
}

/// Byte order of a Level 4 file, from the first type word (always < 5000).
fn level4_big_endian(bytes: &[u8]) -> Result<bool> {
    let raw: [u8; 4] = bytes
        .get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| DataError::parse("truncated MAT v4 header"))?;
    if u32::from_le_bytes(raw) < 5000 {
        Ok(false)
    } else if u32::from_be_bytes(raw) < 5000 {
        Ok(true)
    } else {
        Err(DataError::parse("not a MAT-file (unrecognised v4 type word)"))
    }
}

fn level4_layout(precision: u32) -> Option<(NumericKind, usize)> {
    Some(match precision {
        0 => (NumericKind::Float, 8),
        1 => (NumericKind::Float, 4),
        2 => (NumericKind::Int, 4),
        3 => (NumericKind::Int, 2),
        4 => (NumericKind::Uint, 2),
        5 => (NumericKind::Uint, 1),
        _ => return None,
    })
}

fn decode_level4(bytes: &[u8]) -> Result<MatFile> {
    let big_endian = level4_big_endian(bytes)?;
    let mut reader = Reader::new(bytes, big_endian);
    let mut entries = Vec::new();

    while reader.remaining() > 0 {
        // Type word MOPT: byte order, reserved zero, precision, matrix type.
        let mopt = reader.u32()?;
        let (precision, matrix_type) = (mopt / 10 % 10, mopt % 10);
        if mopt >= 5000 || mopt / 100 % 10 != 0 || matrix_type > 2 {
            return Err(DataError::parse(format!("corrupt MAT v4 type word {mopt}")));
        }
        let rows = reader.u32()? as usize;
        let cols = reader.u32()? as usize;
        let imaginary = reader.u32()? != 0;
        let name_len = reader.u32()? as usize;
        let name = String::from_utf8_lossy(reader.take(name_len)?)
            .trim_end_matches('\0')
            .to_string();

        let (kind, width) = level4_layout(precision)
            .ok_or_else(|| DataError::parse(format!("unsupported MAT v4 precision {precision}")))?;
        let dims = vec![rows, cols];
        let byte_len = checked_element_count(&dims)?
            .checked_mul(width)
            .ok_or_else(|| DataError::parse(format!("MAT v4 matrix '{name}' is too large")))?;
        let real = reader.take(byte_len)?;
        if imaginary {
            reader.take(byte_len)?;
        }
        let values = decode_numbers(real, kind, width, big_endian)
            .ok_or_else(|| DataError::parse(format!("corrupt MAT v4 data in '{name}'")))?;

        let value = match matrix_type {
            0 => MatValue::Numeric(NdArray::from_column_major(dims, values)?),
            1 => {
                let chars: Vec<char> = values
                    .iter()
                    .map(|&v| char::from_u32(v as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect();
                MatValue::Char(column_major_rows(&chars, rows))
            }
            _ => MatValue::Unsupported(MX_SPARSE),
        };
        entries.push(MatEntry { name, value });
    }

    log::debug!("MAT v4 file decoded with {} entries", entries.len());
    Ok(MatFile { entries })
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// A variable to write.
#[derive(Debug, Clone, PartialEq)]
pub enum MatVariable {
    /// Double array. Scalars are written 1x1 and 1-D arrays as 1xN.
    Double(NdArray),
    /// 1xN cell array of char rows.
    Strings(Vec<String>),
}

/// Encode variables as an uncompressed little-endian Level 5 MAT-file.
pub fn encode(variables: &[(&str, MatVariable)]) -> Vec<u8> {
    let mut out = header_block();
    for (name, variable) in variables {
        match variable {
            MatVariable::Double(array) => out.extend(double_matrix(name, array)),
            MatVariable::Strings(strings) => out.extend(string_cell(name, strings)),
        }
    }
    out
}

fn header_block() -> Vec<u8> {
    let text = format!(
        "MATLAB 5.0 MAT-file Platform: {}, Created on: {}",
        std::env::consts::OS,
        chrono::Local::now().format("%a %b %e %H:%M:%S %Y")
    );
    let mut out: Vec<u8> = text.into_bytes();
    out.resize(HEADER_TEXT_LEN, b' ');
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&VERSION_5.to_le_bytes());
    out.extend_from_slice(b"IM");
    out
}

fn push_element(out: &mut Vec<u8>, ty: u32, data: &[u8]) {
    out.extend_from_slice(&ty.to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    let padding = (8 - data.len() % 8) % 8;
    out.extend(std::iter::repeat(0u8).take(padding));
}

fn matrix(name: &str, class: u8, dims: &[usize], body: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let mut inner = Vec::new();

    let mut flags = [0u8; 8];
    flags[..4].copy_from_slice(&(class as u32).to_le_bytes());
    push_element(&mut inner, MI_UINT32, &flags);

    let dim_bytes: Vec<u8> = dims
        .iter()
        .flat_map(|&d| (d as i32).to_le_bytes())
        .collect();
    push_element(&mut inner, MI_INT32, &dim_bytes);
    push_element(&mut inner, MI_INT8, name.as_bytes());

    for (ty, data) in body {
        if *ty == MI_MATRIX {
            // Already a complete element.
            inner.extend_from_slice(data);
        } else {
            push_element(&mut inner, *ty, data);
        }
    }

    let mut out = Vec::new();
    push_element(&mut out, MI_MATRIX, &inner);
    out
}

fn mat_dims(shape: &[usize]) -> Vec<usize> {
    match shape {
        [] => vec![1, 1],
        [n] => vec![1, *n],
        dims => dims.to_vec(),
    }
}

fn double_matrix(name: &str, array: &NdArray) -> Vec<u8> {
    let dims = mat_dims(&array.shape());
    let column_major = row_major_to_column_major(array.data(), &dims);
    let data: Vec<u8> = column_major.iter().flat_map(|v| v.to_le_bytes()).collect();
    matrix(name, MX_DOUBLE, &dims, &[(MI_DOUBLE, data)])
}

fn char_matrix(name: &str, text: &str) -> Vec<u8> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let data: Vec<u8> = units.iter().flat_map(|u| u.to_le_bytes()).collect();
    matrix(name, MX_CHAR, &[1, units.len()], &[(MI_UINT16, data)])
}

fn string_cell(name: &str, strings: &[String]) -> Vec<u8> {
    let items: Vec<(u32, Vec<u8>)> = strings
        .iter()
        .map(|s| (MI_MATRIX, char_matrix("", s)))
        .collect();
    matrix(name, MX_CELL, &[1, strings.len()], &items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn first_array(file: &MatFile) -> &NdArray {
        file.entries()
            .iter()
            .find_map(|e| e.value.as_array())
            .unwrap()
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode(&[]);
        assert_eq!(bytes.len(), HEADER_LEN);
        assert!(bytes.starts_with(b"MATLAB 5.0 MAT-file"));
        assert_eq!(&bytes[126..128], b"IM");
    }

    #[test]
    fn test_metadata_entries_come_first() {
        let file = decode(&encode(&[("x", MatVariable::Double(NdArray::scalar(1.0)))])).unwrap();
        let names: Vec<&str> = file.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["__header__", "__version__", "__globals__", "x"]);
    }

    #[test]
    fn test_double_matrix_is_read_row_major() {
        let array = NdArray::new(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let file = decode(&encode(&[("m", MatVariable::Double(array.clone()))])).unwrap();
        let read = file.get("m").and_then(MatValue::as_array).unwrap();
        assert_eq!(read.shape(), vec![2, 3]);
        assert_eq!(read.data(), array.data());
    }

    #[test]
    fn test_vector_is_written_as_row() {
        let array = NdArray::new(vec![3], vec![80.0, 81.5, 82.0]).unwrap();
        let file = decode(&encode(&[("weights", MatVariable::Double(array))])).unwrap();
        let read = first_array(&file);
        assert_eq!(read.shape(), vec![1, 3]);
        assert_eq!(read.to_flat_vec(), vec![80.0, 81.5, 82.0]);
    }

    #[test]
    fn test_string_cell_round_trip() {
        let dates = vec!["20250101".to_string(), "20250102".to_string()];
        let file = decode(&encode(&[("dates", MatVariable::Strings(dates))])).unwrap();
        let Some(MatValue::Cell { dims, items }) = file.get("dates") else {
            panic!("expected cell array");
        };
        assert_eq!(dims, &vec![1, 2]);
        assert_eq!(items[0], MatValue::Char(vec!["20250101".into()]));
        assert_eq!(items[1], MatValue::Char(vec!["20250102".into()]));
    }

    #[test]
    fn test_compressed_element() {
        let plain = encode(&[("v", MatVariable::Double(NdArray::new(vec![2], vec![7.0, 8.0]).unwrap()))]);
        let element = &plain[HEADER_LEN..];

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(element).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut bytes = plain[..HEADER_LEN].to_vec();
        bytes.extend_from_slice(&MI_COMPRESSED.to_le_bytes());
        bytes.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&compressed);

        let file = decode(&bytes).unwrap();
        assert_eq!(first_array(&file).data(), &[7.0, 8.0]);
    }

    #[test]
    fn test_small_element_int32_data() {
        // 1x1 int32 matrix whose value is stored in a small data element.
        let mut body = Vec::new();
        let mut flags = [0u8; 8];
        flags[0] = 12; // mxINT32_CLASS
        push_element(&mut body, MI_UINT32, &flags);
        push_element(&mut body, MI_INT32, &[1, 0, 0, 0, 1, 0, 0, 0]);
        // name "n" as small element
        body.extend_from_slice(&((1u32 << 16) | MI_INT8).to_le_bytes());
        body.extend_from_slice(&[b'n', 0, 0, 0]);
        // value 42 as small element
        body.extend_from_slice(&((4u32 << 16) | MI_INT32).to_le_bytes());
        body.extend_from_slice(&42i32.to_le_bytes());

        let mut bytes = encode(&[]);
        push_element(&mut bytes, MI_MATRIX, &body);

        let file = decode(&bytes).unwrap();
        assert_eq!(file.get("n").and_then(MatValue::as_array).unwrap().data(), &[42.0]);
    }

    fn level4_matrix(
        big_endian: bool,
        mopt: u32,
        name: &str,
        rows: u32,
        cols: u32,
        data: &[u8],
    ) -> Vec<u8> {
        let word = |v: u32| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
        let mut out = Vec::new();
        for v in [mopt, rows, cols, 0, name.len() as u32 + 1] {
            out.extend_from_slice(&word(v));
        }
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_level4_double_and_text_matrices() {
        // 2x2 [[1, 2], [3, 4]] stored column-major.
        let data: Vec<u8> = [1.0f64, 3.0, 2.0, 4.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut bytes = level4_matrix(false, 0, "a", 2, 2, &data);
        let text: Vec<u8> = "hi".chars().flat_map(|c| (c as u32 as f64).to_le_bytes()).collect();
        bytes.extend(level4_matrix(false, 1, "t", 1, 2, &text));

        let file = decode(&bytes).unwrap();
        let a = file.get("a").and_then(MatValue::as_array).unwrap();
        assert_eq!(a.shape(), vec![2, 2]);
        assert_eq!(a.data(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(file.get("t"), Some(&MatValue::Char(vec!["hi".into()])));
    }

    #[test]
    fn test_level4_big_endian_int16() {
        let data: Vec<u8> = [-5i16, 7].iter().flat_map(|v| v.to_be_bytes()).collect();
        let bytes = level4_matrix(true, 1030, "v", 1, 2, &data);
        let file = decode(&bytes).unwrap();
        assert_eq!(first_array(&file).data(), &[-5.0, 7.0]);
    }

    #[test]
    fn test_level4_corrupt_type_word() {
        let bytes = level4_matrix(false, 4999, "x", 1, 1, &[0; 8]);
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("MAT v4"), "{err}");
    }

    #[test]
    fn test_huge_cell_dims_fail_without_allocating() {
        let big = i32::MAX as usize;
        let mut bytes = encode(&[]);
        bytes.extend(matrix("c", MX_CELL, &[big, big], &[]));
        assert!(matches!(decode(&bytes), Err(DataError::Parse(_))));
    }

    #[test]
    fn test_rejects_non_mat_bytes() {
        assert!(matches!(decode(b"short"), Err(DataError::Parse(_))));
        let mut bytes = vec![b' '; HEADER_LEN];
        bytes[124] = 0x00;
        bytes[125] = 0x02;
        bytes[126] = b'I';
        bytes[127] = b'M';
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("7.3"));
    }
}

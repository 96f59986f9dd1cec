//! Reader and writer for NumPy `.npy` files (format versions 1.0 – 3.0).
//!
//! Numeric dtypes are decoded into an [`NdArray`]; object arrays (`|O`)
//! carry a pickle stream which is handed back untouched.

use std::sync::OnceLock;

use regex::Regex;

use super::numeric::{decode_numbers, NumericKind};
use crate::data::error::{DataError, Result};
use crate::data::model::{checked_element_count, NdArray};

const MAGIC: &[u8] = b"\x93NUMPY";
const HEADER_ALIGN: usize = 64;

/// Decoded `.npy` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NpyContent {
    Array(NdArray),
    /// Object array; the bytes are a pickle stream.
    Pickled(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Dtype {
    Numeric {
        kind: NumericKind,
        width: usize,
        big_endian: bool,
    },
    Object,
}

#[derive(Debug)]
struct Header {
    dtype: Dtype,
    fortran_order: bool,
    shape: Vec<usize>,
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

pub fn decode(bytes: &[u8]) -> Result<NpyContent> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(DataError::parse("not a .npy file (bad magic)"));
    }
    let major = bytes[6];
    let (header_len, header_start): (usize, usize) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(DataError::parse("truncated .npy header"));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
            (len as usize, 12)
        }
        other => return Err(DataError::parse(format!("unsupported .npy version {other}"))),
    };

    let truncated = || DataError::parse("truncated .npy header");
    let data_start = header_start.checked_add(header_len).ok_or_else(truncated)?;
    let header_bytes = bytes.get(header_start..data_start).ok_or_else(truncated)?;
    let header = parse_header(&String::from_utf8_lossy(header_bytes))?;
    let payload = &bytes[data_start..];

    log::debug!(
        "npy header: dtype {:?}, shape {:?}, fortran {}",
        header.dtype,
        header.shape,
        header.fortran_order
    );

    match header.dtype {
        Dtype::Object => Ok(NpyContent::Pickled(payload.to_vec())),
        Dtype::Numeric {
            kind,
            width,
            big_endian,
        } => {
            let needed = checked_element_count(&header.shape)?
                .checked_mul(width)
                .ok_or_else(|| DataError::parse("array shape in .npy header is too large"))?;
            let raw = payload.get(..needed).ok_or_else(|| {
                DataError::parse(format!(
                    ".npy data too short: need {needed} bytes, have {}",
                    payload.len()
                ))
            })?;
            let values = decode_numbers(raw, kind, width, big_endian).ok_or_else(|| {
                DataError::parse(format!("unsupported .npy element type {kind:?}{width}"))
            })?;
            let array = if header.fortran_order {
                NdArray::from_column_major(header.shape, values)?
            } else {
                NdArray::new(header.shape, values)?
            };
            Ok(NpyContent::Array(array))
        }
    }
}

fn header_patterns() -> &'static (Regex, Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(r#"['"]descr['"]\s*:\s*['"]([^'"]*)['"]"#).expect("descr pattern"),
            Regex::new(r#"['"]fortran_order['"]\s*:\s*(True|False)"#).expect("fortran pattern"),
            Regex::new(r#"['"]shape['"]\s*:\s*\(([^)]*)\)"#).expect("shape pattern"),
        )
    })
}

fn parse_header(text: &str) -> Result<Header> {
    let (descr_re, fortran_re, shape_re) = header_patterns();

    let descr = descr_re
        .captures(text)
        .map(|c| c[1].to_string())
        .ok_or_else(|| DataError::parse(format!("unsupported .npy dtype in header: {text}")))?;
    let fortran_order = fortran_re
        .captures(text)
        .map(|c| &c[1] == "True")
        .ok_or_else(|| DataError::parse("missing fortran_order in .npy header"))?;
    let shape_text = shape_re
        .captures(text)
        .map(|c| c[1].to_string())
        .ok_or_else(|| DataError::parse("missing shape in .npy header"))?;

    let shape = shape_text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| DataError::parse(format!("bad .npy dimension '{s}'")))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Header {
        dtype: parse_descr(&descr)?,
        fortran_order,
        shape,
    })
}

/// Parse a dtype string such as `<f8`, `|b1` or `|O`.
pub(super) fn parse_descr(descr: &str) -> Result<Dtype> {
    let unsupported = || DataError::parse(format!("unsupported .npy dtype '{descr}'"));

    let (big_endian, rest) = match descr.chars().next() {
        Some('<') | Some('=') | Some('|') => (false, &descr[1..]),
        Some('>') => (true, &descr[1..]),
        _ => (false, descr),
    };

    let mut chars = rest.chars();
    let kind_char = chars.next().ok_or_else(unsupported)?;
    if kind_char == 'O' {
        return Ok(Dtype::Object);
    }
    let kind = match kind_char {
        'f' => NumericKind::Float,
        'i' => NumericKind::Int,
        'u' => NumericKind::Uint,
        'b' => NumericKind::Bool,
        _ => return Err(unsupported()),
    };
    let width = chars
        .as_str()
        .parse::<usize>()
        .map_err(|_| unsupported())?;

    Ok(Dtype::Numeric {
        kind,
        width,
        big_endian,
    })
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode a row-major `f64` array as a version 1.0 `.npy` file.
pub fn encode_f64(shape: &[usize], data: &[f64]) -> Vec<u8> {
    let mut out = header_bytes("<f8", shape);
    for v in data {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Encode an object array of `shape` whose payload is the given pickle
/// stream (see [`super::pickle::encode_object_array`]).
pub fn encode_pickled(shape: &[usize], pickle: &[u8]) -> Vec<u8> {
    let mut out = header_bytes("|O", shape);
    out.extend_from_slice(pickle);
    out
}

fn header_bytes(descr: &str, shape: &[usize]) -> Vec<u8> {
    let shape_text = match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => format!(
            "({})",
            dims.iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    let dict = format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': {shape_text}, }}");

    // magic(6) + version(2) + length(2) + dict + '\n', padded to HEADER_ALIGN.
    let unpadded = MAGIC.len() + 4 + dict.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    let header_len = dict.len() + padding + 1;

    let mut out = Vec::with_capacity(unpadded + padding);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header_len as u16).to_le_bytes());
    out.extend_from_slice(dict.as_bytes());
    out.extend(std::iter::repeat(b' ').take(padding));
    out.push(b'\n');
    out
}

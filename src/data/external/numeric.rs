// ---------------------------------------------------------------------------
// Raw numeric element decoding shared by the .npy and .mat codecs
// ---------------------------------------------------------------------------

/// Storage class of a raw numeric element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Float,
    Int,
    Uint,
    Bool,
}

/// Decode a packed buffer of `width`-byte elements into `f64`s.
///
/// Returns `None` for kind/width pairs that have no Rust counterpart
/// (e.g. half floats) or when the buffer is not a whole number of elements.
pub fn decode_numbers(
    bytes: &[u8],
    kind: NumericKind,
    width: usize,
    big_endian: bool,
) -> Option<Vec<f64>> {
    if width == 0 || bytes.len() % width != 0 {
        return None;
    }
    bytes
        .chunks_exact(width)
        .map(|chunk| decode_one(chunk, kind, big_endian))
        .collect()
}

fn decode_one(chunk: &[u8], kind: NumericKind, big_endian: bool) -> Option<f64> {
    macro_rules! num {
        ($t:ty) => {{
            let raw: [u8; std::mem::size_of::<$t>()] = chunk.try_into().ok()?;
            let v = if big_endian {
                <$t>::from_be_bytes(raw)
            } else {
                <$t>::from_le_bytes(raw)
            };
            v as f64
        }};
    }

    let value = match (kind, chunk.len()) {
        (NumericKind::Float, 4) => num!(f32),
        (NumericKind::Float, 8) => num!(f64),
        (NumericKind::Int, 1) => num!(i8),
        (NumericKind::Int, 2) => num!(i16),
        (NumericKind::Int, 4) => num!(i32),
        (NumericKind::Int, 8) => num!(i64),
        (NumericKind::Uint, 1) => num!(u8),
        (NumericKind::Uint, 2) => num!(u16),
        (NumericKind::Uint, 4) => num!(u32),
        (NumericKind::Uint, 8) => num!(u64),
        (NumericKind::Bool, 1) => {
            if chunk[0] != 0 {
                1.0
            } else {
                0.0
            }
        }
        _ => return None,
    };
    Some(value)
}

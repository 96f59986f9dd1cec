use serde::Serialize;
use serde_pickle::{SerOptions, Serializer};

use super::unpickle::{self, ArrayContent, Obj};
use crate::data::error::{DataError, Result};
use crate::data::model::{checked_element_count, DecodedValue};

const NOT_ARRAY_LIKE: &str = "Loaded data is not numeric or array-like";

/// Containers nested deeper than this are treated as corrupt (or cyclic).
const MAX_DEPTH: usize = 64;

// ---------------------------------------------------------------------------
// Pickle stream → DecodedValue
// ---------------------------------------------------------------------------

/// Decode a pickle stream into a scalar, a flattened sequence or an array.
///
/// NumPy arrays and scalars are rebuilt from their reduce state. Any other
/// class instance is rejected as not array-like.
pub fn decode(bytes: &[u8]) -> Result<DecodedValue> {
    let obj = unpickle::load(bytes)
        .map_err(|e| DataError::parse(format!("invalid pickle stream: {e}")))?;
    adapt(&obj)
}

fn adapt(obj: &Obj) -> Result<DecodedValue> {
    match obj {
        Obj::List(_) | Obj::Tuple(_) => {
            let mut out = Vec::new();
            flatten_into(obj, &mut out, 0)?;
            Ok(DecodedValue::Sequence(out))
        }
        Obj::Array(array) => match array.borrow().content()? {
            ArrayContent::Numeric(array) => Ok(DecodedValue::Array(array)),
            ArrayContent::Objects(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in &items {
                    flatten_into(item, &mut out, 1)?;
                }
                Ok(DecodedValue::Sequence(out))
            }
        },
        other => as_number(other)
            .map(DecodedValue::Scalar)
            .ok_or_else(|| DataError::parse(NOT_ARRAY_LIKE)),
    }
}

/// Nested containers are flattened depth-first, i.e. row-major.
fn flatten_into(obj: &Obj, out: &mut Vec<f64>, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(DataError::parse("pickled containers are nested too deeply"));
    }
    match obj {
        Obj::List(items) => {
            for item in items.borrow().iter() {
                flatten_into(item, out, depth + 1)?;
            }
        }
        Obj::Tuple(items) => {
            for item in items {
                flatten_into(item, out, depth + 1)?;
            }
        }
        Obj::Array(array) => match array.borrow().content()? {
            ArrayContent::Numeric(array) => out.extend_from_slice(array.data()),
            ArrayContent::Objects(items) => {
                for item in &items {
                    flatten_into(item, out, depth + 1)?;
                }
            }
        },
        other => out.push(as_number(other).ok_or_else(|| DataError::parse(NOT_ARRAY_LIKE))?),
    }
    Ok(())
}

fn as_number(obj: &Obj) -> Option<f64> {
    match obj {
        Obj::Float(v) => Some(*v),
        Obj::Int(v) => Some(*v as f64),
        Obj::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn pickle_error(e: serde_pickle::Error) -> DataError {
    DataError::parse(format!("failed to pickle value: {e}"))
}

/// Serialize any serde value as a pickle stream (protocol 3).
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_pickle::to_vec(value, SerOptions::new()).map_err(pickle_error)
}

/// Pickle a NumPy object array of `shape` holding `items` in C order.
///
/// This is the payload NumPy writes after the header of an object-dtype
/// `.npy` file: `_reconstruct(ndarray, (0,), b'b')` followed by the BUILD
/// state `(1, shape, dtype('O'), False, [items...])`.
pub fn encode_object_array<T: Serialize>(shape: &[usize], items: &[T]) -> Result<Vec<u8>> {
    let expected = checked_element_count(shape)?;
    if items.len() != expected {
        return Err(DataError::parse(format!(
            "{} items do not fill an object array of shape {shape:?}",
            items.len()
        )));
    }

    let mut out = b"\x80\x03".to_vec();
    out.extend_from_slice(b"cnumpy.core.multiarray\n_reconstruct\n");
    out.extend_from_slice(b"cnumpy\nndarray\nK\x00\x85C\x01b\x87R");

    out.extend_from_slice(b"(K\x01(");
    for &dim in shape {
        push_int(&mut out, dim)?;
    }
    out.push(b't');
    // dtype('O') with its (3, '|', None, None, None, -1, -1, 63) state.
    out.extend_from_slice(b"cnumpy\ndtype\nX\x02\x00\x00\x00O8\x89\x88\x87R");
    out.extend_from_slice(b"(K\x03X\x01\x00\x00\x00|NNNJ\xff\xff\xff\xffJ\xff\xff\xff\xffK?tb");
    out.extend_from_slice(b"\x89](");
    {
        let mut serializer = Serializer::new(&mut out, SerOptions::new());
        for item in items {
            item.serialize(&mut serializer).map_err(pickle_error)?;
        }
    }
    out.extend_from_slice(b"etb.");
    Ok(out)
}

fn push_int(out: &mut Vec<u8>, value: usize) -> Result<()> {
    if let Ok(small) = u8::try_from(value) {
        out.extend_from_slice(&[b'K', small]);
    } else if let Ok(medium) = i32::try_from(value) {
        out.push(b'J');
        out.extend_from_slice(&medium.to_le_bytes());
    } else {
        let large = i64::try_from(value)
            .map_err(|_| DataError::parse(format!("array dimension {value} is too large")))?;
        out.extend_from_slice(&[0x8a, 8]);
        out.extend_from_slice(&large.to_le_bytes());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ArrayLike;

    #[test]
    fn test_scalar_float() {
        let bytes = encode(&5.5f64).unwrap();
        assert_eq!(decode(&bytes).unwrap(), DecodedValue::Scalar(5.5));
    }

    #[test]
    fn test_scalar_int() {
        let bytes = encode(&7i64).unwrap();
        assert_eq!(decode(&bytes).unwrap(), DecodedValue::Scalar(7.0));
    }

    #[test]
    fn test_list() {
        let bytes = encode(&vec![1.1f64, 2.2, 3.3, 4.4]).unwrap();
        assert_eq!(
            decode(&bytes).unwrap(),
            DecodedValue::Sequence(vec![1.1, 2.2, 3.3, 4.4])
        );
    }

    #[test]
    fn test_tuple_and_nested_lists_flatten() {
        let bytes = encode(&(1.0f64, 2i64)).unwrap();
        assert_eq!(decode(&bytes).unwrap(), DecodedValue::Sequence(vec![1.0, 2.0]));

        let nested = vec![vec![1.0f64, 2.0], vec![3.0, 4.0]];
        let bytes = encode(&nested).unwrap();
        assert_eq!(
            decode(&bytes).unwrap(),
            DecodedValue::Sequence(vec![1.0, 2.0, 3.0, 4.0])
        );
    }

    #[test]
    fn test_protocol_2_stream_from_python() {
        // pickle.dumps([1.5, 2], protocol=2)
        let bytes = b"\x80\x02]q\x00(G?\xf8\x00\x00\x00\x00\x00\x00K\x02e.";
        assert_eq!(decode(bytes).unwrap(), DecodedValue::Sequence(vec![1.5, 2.0]));
    }

    #[test]
    fn test_numpy_float_array_protocol_2() {
        // pickle.dumps(np.array([1.5, 2.5]), protocol=2)
        let bytes = b"\x80\x02cnumpy.core.multiarray\x0a_reconstruct\x0aq\x00cnumpy\x0andarray\x0aq\x01K\x00\x85q\x02c_codecs\x0aencode\x0aq\x03X\x01\x00\x00\x00bq\x04X\x06\x00\x00\x00latin1q\x05\x86q\x06Rq\x07\x87q\x08Rq\x09(K\x01K\x02\x85q\x0acnumpy\x0adtype\x0aq\x0bX\x02\x00\x00\x00f8q\x0c\x89\x88\x87q\x0dRq\x0e(K\x03X\x01\x00\x00\x00<q\x0fNNNJ\xff\xff\xff\xffJ\xff\xff\xff\xffK\x00tq\x10b\x89h\x03X\x11\x00\x00\x00\x00\x00\x00\x00\x00\x00\xc3\xb8?\x00\x00\x00\x00\x00\x00\x04@q\x11h\x05\x86q\x12Rq\x13tq\x14b.";
        let decoded = decode(bytes).unwrap();
        assert_eq!(decoded.shape(), vec![2]);
        assert_eq!(decoded.to_flat_vec(), vec![1.5, 2.5]);
    }

    #[test]
    fn test_numpy_scalar_protocol_2() {
        // pickle.dumps(np.float64(3.5), protocol=2)
        let bytes = b"\x80\x02cnumpy.core.multiarray\x0ascalar\x0aq\x00cnumpy\x0adtype\x0aq\x01X\x02\x00\x00\x00f8q\x02\x89\x88\x87q\x03Rq\x04(K\x03X\x01\x00\x00\x00<q\x05NNNJ\xff\xff\xff\xffJ\xff\xff\xff\xffK\x00tq\x06bc_codecs\x0aencode\x0aq\x07X\x08\x00\x00\x00\x00\x00\x00\x00\x00\x00\x0c@q\x08X\x06\x00\x00\x00latin1q\x09\x86q\x0aRq\x0b\x86q\x0cRq\x0d.";
        assert_eq!(decode(bytes).unwrap(), DecodedValue::Scalar(3.5));
    }

    #[test]
    fn test_list_of_numpy_scalars_sharing_a_dtype() {
        // pickle.dumps([np.float64(1.0), np.float64(2.0)], protocol=2)
        let bytes = b"\x80\x02]q\x00(cnumpy.core.multiarray\x0ascalar\x0aq\x01cnumpy\x0adtype\x0aq\x02X\x02\x00\x00\x00f8q\x03\x89\x88\x87q\x04Rq\x05(K\x03X\x01\x00\x00\x00<q\x06NNNJ\xff\xff\xff\xffJ\xff\xff\xff\xffK\x00tq\x07bc_codecs\x0aencode\x0aq\x08X\x09\x00\x00\x00\x00\x00\x00\x00\x00\x00\xc3\xb0?q\x09X\x06\x00\x00\x00latin1q\x0a\x86q\x0bRq\x0c\x86q\x0dRq\x0eh\x01h\x05h\x08X\x08\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00@q\x0fh\x0a\x86q\x10Rq\x11\x86q\x12Rq\x13e.";
        assert_eq!(decode(bytes).unwrap(), DecodedValue::Sequence(vec![1.0, 2.0]));
    }

    #[test]
    fn test_numpy_fortran_int32_protocol_4() {
        // pickle.dumps(np.asfortranarray([[1, 2, 3], [4, 5, 6]], dtype='<i4'), protocol=4)
        let bytes = b"\x80\x04\x95\xa2\x00\x00\x00\x00\x00\x00\x00\x8c\x15numpy.core.multiarray\x94\x8c\x0c_reconstruct\x94\x93\x94\x8c\x05numpy\x94\x8c\x07ndarray\x94\x93\x94K\x00\x85\x94C\x01b\x94\x87\x94R\x94(K\x01K\x02K\x03\x86\x94h\x03\x8c\x05dtype\x94\x93\x94\x8c\x02i4\x94\x89\x88\x87\x94R\x94(K\x03\x8c\x01<\x94NNNJ\xff\xff\xff\xffJ\xff\xff\xff\xffK\x00t\x94b\x88C\x18\x01\x00\x00\x00\x04\x00\x00\x00\x02\x00\x00\x00\x05\x00\x00\x00\x03\x00\x00\x00\x06\x00\x00\x00\x94t\x94b.";
        let decoded = decode(bytes).unwrap();
        assert_eq!(decoded.shape(), vec![2, 3]);
        assert_eq!(decoded.to_flat_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_numpy_object_array_protocol_3() {
        // pickle.dumps(np.array([1.0, 2], dtype=object), protocol=3)
        let bytes = b"\x80\x03cnumpy.core.multiarray\x0a_reconstruct\x0aq\x00cnumpy\x0andarray\x0aq\x01K\x00\x85q\x02C\x01bq\x03\x87q\x04Rq\x05(K\x01K\x02\x85q\x06cnumpy\x0adtype\x0aq\x07X\x02\x00\x00\x00O8q\x08\x89\x88\x87q\x09Rq\x0a(K\x03X\x01\x00\x00\x00|q\x0bNNNJ\xff\xff\xff\xffJ\xff\xff\xff\xffK?tq\x0cb\x89]q\x0d(G?\xf0\x00\x00\x00\x00\x00\x00K\x02etq\x0eb.";
        assert_eq!(decode(bytes).unwrap(), DecodedValue::Sequence(vec![1.0, 2.0]));
    }

    #[test]
    fn test_numpy_2_module_path() {
        let bytes = b"\x80\x02cnumpy._core.multiarray\nscalar\ncnumpy\ndtype\nX\x02\x00\x00\x00i8\x89\x88\x87RC\x08\x09\x00\x00\x00\x00\x00\x00\x00\x86R.";
        assert_eq!(decode(bytes).unwrap(), DecodedValue::Scalar(9.0));
    }

    #[test]
    fn test_object_array_round_trip() {
        let bytes = encode_object_array(&[3], &[1.0f64, 2.0, 3.0]).unwrap();
        assert_eq!(decode(&bytes).unwrap(), DecodedValue::Sequence(vec![1.0, 2.0, 3.0]));

        // 0-d array wrapping a list.
        let bytes = encode_object_array(&[], &[vec![4.0f64, 5.0]]).unwrap();
        assert_eq!(decode(&bytes).unwrap(), DecodedValue::Sequence(vec![4.0, 5.0]));
    }

    #[test]
    fn test_object_array_checks_item_count() {
        assert!(encode_object_array(&[2, 2], &[1.0f64]).is_err());
        assert!(encode_object_array(&[usize::MAX, 2], &[1.0f64]).is_err());
    }

    #[test]
    fn test_object_array_wrapping_a_dict_is_not_array_like() {
        let mut map = std::collections::BTreeMap::new();
        map.insert("weights", vec![1.0f64]);
        let bytes = encode_object_array(&[], &[map]).unwrap();
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("not numeric or array-like"), "{err}");
    }

    #[test]
    fn test_strings_are_rejected() {
        let bytes = encode(&"hello").unwrap();
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("not numeric or array-like"));

        let bytes = encode(&vec!["a", "b"]).unwrap();
        assert!(matches!(decode(&bytes), Err(DataError::Parse(_))));
    }

    #[test]
    fn test_self_referencing_list_is_rejected() {
        // a = []; a.append(a); pickle.dumps(a, protocol=2)
        let bytes = b"\x80\x02]q\x00h\x00a.";
        let err = decode(bytes).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"), "{err}");
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(matches!(decode(b"\x00\x01garbage"), Err(DataError::Parse(_))));
    }
}

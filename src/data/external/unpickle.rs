//! A small pickle virtual machine.
//!
//! It evaluates the opcodes Python writes for plain containers and numbers
//! (protocols 0 to 5), and understands the handful of callables NumPy uses
//! to rebuild arrays, scalars and dtypes. Any other class instance becomes
//! [`Obj::Opaque`] and is rejected later by whoever needs a number.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::npy::{self, Dtype};
use super::numeric::{decode_numbers, NumericKind};
use crate::data::error::{DataError, Result};
use crate::data::model::{checked_element_count, NdArray};

/// A value on the machine's stack.
///
/// Mutable containers are shared so that memoized references observe
/// later `APPENDS`, `SETITEMS` and `BUILD` opcodes.
#[derive(Debug, Clone)]
pub(super) enum Obj {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Rc<RefCell<Vec<Obj>>>),
    Tuple(Vec<Obj>),
    Dict(Rc<RefCell<Vec<(Obj, Obj)>>>),
    Global { module: String, name: String },
    Dtype(Rc<RefCell<DtypeObj>>),
    Array(Rc<RefCell<ArrayObj>>),
    Opaque,
}

impl Obj {
    fn list(items: Vec<Obj>) -> Self {
        Obj::List(Rc::new(RefCell::new(items)))
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Obj::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes, accepting text whose chars are all below 256.
    fn to_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Obj::Bytes(b) => Some(b.clone()),
            Obj::Str(s) => latin1(s),
            _ => None,
        }
    }
}

/// `numpy.dtype`, as rebuilt by REDUCE and BUILD.
#[derive(Debug, Clone)]
pub(super) struct DtypeObj {
    code: String,
    big_endian: bool,
}

impl DtypeObj {
    fn resolve(&self) -> Result<Dtype> {
        let order = if self.big_endian { '>' } else { '<' };
        npy::parse_descr(&format!("{order}{}", self.code))
    }
}

/// `numpy.ndarray` waiting for (or holding) its BUILD state.
#[derive(Debug, Clone, Default)]
pub(super) struct ArrayObj {
    state: Option<Obj>,
}

/// What an ndarray turned out to contain.
pub(super) enum ArrayContent {
    Numeric(NdArray),
    /// Object dtype: the elements in C order.
    Objects(Vec<Obj>),
}

impl ArrayObj {
    /// Interpret the BUILD state `([version,] shape, dtype, fortran, raw)`.
    pub(super) fn content(&self) -> Result<ArrayContent> {
        let corrupt = |what: &str| DataError::parse(format!("corrupt ndarray state: {what}"));

        let fields = match &self.state {
            Some(Obj::Tuple(items)) => items.as_slice(),
            _ => return Err(corrupt("missing state")),
        };
        let fields = if fields.len() == 5 { &fields[1..] } else { fields };
        let [shape, dtype, fortran, raw] = fields else {
            return Err(corrupt("wrong number of fields"));
        };

        let shape = match shape {
            Obj::Tuple(dims) => dims
                .iter()
                .map(|d| match d {
                    Obj::Int(n) => usize::try_from(*n).ok(),
                    _ => None,
                })
                .collect::<Option<Vec<usize>>>()
                .ok_or_else(|| corrupt("bad shape"))?,
            _ => return Err(corrupt("bad shape")),
        };
        let dtype = match dtype {
            Obj::Dtype(d) => d.borrow().resolve()?,
            _ => return Err(corrupt("bad dtype")),
        };
        let fortran = match fortran {
            Obj::Bool(b) => *b,
            Obj::Int(n) => *n != 0,
            _ => return Err(corrupt("bad order flag")),
        };

        match dtype {
            Dtype::Object => match raw {
                Obj::List(items) => Ok(ArrayContent::Objects(items.borrow().clone())),
                _ => Err(corrupt("object data is not a list")),
            },
            Dtype::Numeric {
                kind,
                width,
                big_endian,
            } => {
                let bytes = raw.to_bytes().ok_or_else(|| corrupt("data is not bytes"))?;
                let needed = checked_element_count(&shape)?
                    .checked_mul(width)
                    .ok_or_else(|| DataError::parse("ndarray shape is too large"))?;
                if bytes.len() != needed {
                    return Err(corrupt(&format!(
                        "{} data bytes for shape {shape:?}, expected {needed}",
                        bytes.len()
                    )));
                }
                let values = decode_numbers(&bytes, kind, width, big_endian)
                    .ok_or_else(|| DataError::parse("unsupported ndarray element type"))?;
                let array = if fortran {
                    NdArray::from_column_major(shape, values)?
                } else {
                    NdArray::new(shape, values)?
                };
                Ok(ArrayContent::Numeric(array))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

mod op {
    pub const MARK: u8 = b'(';
    pub const STOP: u8 = b'.';
    pub const POP: u8 = b'0';
    pub const POP_MARK: u8 = b'1';
    pub const DUP: u8 = b'2';
    pub const FLOAT: u8 = b'F';
    pub const INT: u8 = b'I';
    pub const BININT: u8 = b'J';
    pub const BININT1: u8 = b'K';
    pub const LONG: u8 = b'L';
    pub const BININT2: u8 = b'M';
    pub const NONE: u8 = b'N';
    pub const PERSID: u8 = b'P';
    pub const BINPERSID: u8 = b'Q';
    pub const REDUCE: u8 = b'R';
    pub const STRING: u8 = b'S';
    pub const BINSTRING: u8 = b'T';
    pub const SHORT_BINSTRING: u8 = b'U';
    pub const UNICODE: u8 = b'V';
    pub const BINUNICODE: u8 = b'X';
    pub const APPEND: u8 = b'a';
    pub const BUILD: u8 = b'b';
    pub const GLOBAL: u8 = b'c';
    pub const DICT: u8 = b'd';
    pub const EMPTY_DICT: u8 = b'}';
    pub const APPENDS: u8 = b'e';
    pub const GET: u8 = b'g';
    pub const BINGET: u8 = b'h';
    pub const INST: u8 = b'i';
    pub const LONG_BINGET: u8 = b'j';
    pub const LIST: u8 = b'l';
    pub const EMPTY_LIST: u8 = b']';
    pub const OBJ: u8 = b'o';
    pub const PUT: u8 = b'p';
    pub const BINPUT: u8 = b'q';
    pub const LONG_BINPUT: u8 = b'r';
    pub const SETITEM: u8 = b's';
    pub const TUPLE: u8 = b't';
    pub const EMPTY_TUPLE: u8 = b')';
    pub const SETITEMS: u8 = b'u';
    pub const BINFLOAT: u8 = b'G';

    pub const PROTO: u8 = 0x80;
    pub const NEWOBJ: u8 = 0x81;
    pub const EXT1: u8 = 0x82;
    pub const EXT2: u8 = 0x83;
    pub const EXT4: u8 = 0x84;
    pub const TUPLE1: u8 = 0x85;
    pub const TUPLE2: u8 = 0x86;
    pub const TUPLE3: u8 = 0x87;
    pub const NEWTRUE: u8 = 0x88;
    pub const NEWFALSE: u8 = 0x89;
    pub const LONG1: u8 = 0x8a;
    pub const LONG4: u8 = 0x8b;

    pub const BINBYTES: u8 = b'B';
    pub const SHORT_BINBYTES: u8 = b'C';

    pub const SHORT_BINUNICODE: u8 = 0x8c;
    pub const BINUNICODE8: u8 = 0x8d;
    pub const BINBYTES8: u8 = 0x8e;
    pub const EMPTY_SET: u8 = 0x8f;
    pub const ADDITEMS: u8 = 0x90;
    pub const FROZENSET: u8 = 0x91;
    pub const NEWOBJ_EX: u8 = 0x92;
    pub const STACK_GLOBAL: u8 = 0x93;
    pub const MEMOIZE: u8 = 0x94;
    pub const FRAME: u8 = 0x95;

    pub const BYTEARRAY8: u8 = 0x96;
    pub const NEXT_BUFFER: u8 = 0x97;
    pub const READONLY_BUFFER: u8 = 0x98;
}

// ---------------------------------------------------------------------------
// Byte cursor
// ---------------------------------------------------------------------------

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(DataError::parse("truncated pickle stream"));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut raw = [0u8; N];
        raw.copy_from_slice(self.take(N)?);
        Ok(raw)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    /// A length prefix of `width` bytes (1, 4 or 8).
    fn len(&mut self, width: usize) -> Result<usize> {
        let n = match width {
            1 => u64::from(self.u8()?),
            4 => u64::from(self.u32()?),
            _ => u64::from_le_bytes(self.array()?),
        };
        usize::try_from(n).map_err(|_| DataError::parse("pickle length prefix is too large"))
    }

    /// Text up to the next newline, newline dropped.
    fn line(&mut self) -> Result<&'a [u8]> {
        let rest = &self.buf[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| DataError::parse("truncated pickle stream"))?;
        self.pos += end + 1;
        Ok(&rest[..end])
    }

    fn text_line(&mut self) -> Result<&'a str> {
        std::str::from_utf8(self.line()?)
            .map_err(|_| DataError::parse("non-ASCII text in pickle stream"))
    }
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Machine {
    stack: Vec<Obj>,
    marks: Vec<usize>,
    memo: HashMap<usize, Obj>,
}

fn stack_underflow() -> DataError {
    DataError::parse("corrupt pickle stream: stack underflow")
}

impl Machine {
    fn push(&mut self, obj: Obj) {
        self.stack.push(obj);
    }

    fn pop(&mut self) -> Result<Obj> {
        self.stack.pop().ok_or_else(stack_underflow)
    }

    fn top(&mut self) -> Result<&mut Obj> {
        self.stack.last_mut().ok_or_else(stack_underflow)
    }

    fn pop_mark(&mut self) -> Result<Vec<Obj>> {
        let mark = self
            .marks
            .pop()
            .ok_or_else(|| DataError::parse("corrupt pickle stream: missing MARK"))?;
        if mark > self.stack.len() {
            return Err(stack_underflow());
        }
        Ok(self.stack.split_off(mark))
    }

    fn pop_n(&mut self, n: usize) -> Result<Vec<Obj>> {
        if n > self.stack.len() {
            return Err(stack_underflow());
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    fn memo_get(&self, index: usize) -> Result<Obj> {
        self.memo
            .get(&index)
            .cloned()
            .ok_or_else(|| DataError::parse(format!("pickle memo entry {index} is missing")))
    }

    fn memo_put(&mut self, index: usize) -> Result<()> {
        let top = self.stack.last().cloned().ok_or_else(stack_underflow)?;
        self.memo.insert(index, top);
        Ok(())
    }

    fn extend_top(&mut self, items: Vec<Obj>) -> Result<()> {
        match self.top()? {
            Obj::List(list) => {
                list.borrow_mut().extend(items);
                Ok(())
            }
            Obj::Opaque => Ok(()),
            _ => Err(DataError::parse("corrupt pickle stream: APPEND to a non-list")),
        }
    }

    fn set_items(&mut self, items: Vec<Obj>) -> Result<()> {
        if items.len() % 2 != 0 {
            return Err(DataError::parse("corrupt pickle stream: odd SETITEMS"));
        }
        match self.top()? {
            Obj::Dict(dict) => {
                let mut dict = dict.borrow_mut();
                let mut iter = items.into_iter();
                while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                    dict.push((k, v));
                }
                Ok(())
            }
            Obj::Opaque => Ok(()),
            _ => Err(DataError::parse("corrupt pickle stream: SETITEM on a non-dict")),
        }
    }
}

/// Evaluate a pickle stream and return the value left by STOP.
pub(super) fn load(bytes: &[u8]) -> Result<Obj> {
    let mut reader = Reader { buf: bytes, pos: 0 };
    let mut m = Machine::default();

    loop {
        let code = reader.u8()?;
        match code {
            op::PROTO => {
                reader.u8()?;
            }
            op::FRAME => {
                reader.take(8)?;
            }
            op::STOP => return m.pop(),
            op::MARK => m.marks.push(m.stack.len()),
            op::POP => {
                if m.stack.is_empty() {
                    m.pop_mark()?;
                } else {
                    m.pop()?;
                }
            }
            op::POP_MARK => {
                m.pop_mark()?;
            }
            op::DUP => {
                let top = m.top()?.clone();
                m.push(top);
            }

            op::NONE => m.push(Obj::None),
            op::NEWTRUE => m.push(Obj::Bool(true)),
            op::NEWFALSE => m.push(Obj::Bool(false)),
            op::INT => {
                let text = reader.text_line()?;
                m.push(match text {
                    "00" => Obj::Bool(false),
                    "01" => Obj::Bool(true),
                    _ => parse_int_text(text)?,
                });
            }
            op::LONG => {
                let text = reader.text_line()?;
                m.push(parse_int_text(text.trim_end_matches('L'))?);
            }
            op::BININT => m.push(Obj::Int(i64::from(i32::from_le_bytes(reader.array()?)))),
            op::BININT1 => m.push(Obj::Int(i64::from(reader.u8()?))),
            op::BININT2 => m.push(Obj::Int(i64::from(u16::from_le_bytes(reader.array()?)))),
            op::LONG1 | op::LONG4 => {
                let n = reader.len(if code == op::LONG1 { 1 } else { 4 })?;
                m.push(long_from_bytes(reader.take(n)?));
            }
            op::FLOAT => {
                let text = reader.text_line()?;
                let v = text
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| DataError::parse(format!("bad pickle float '{text}'")))?;
                m.push(Obj::Float(v));
            }
            op::BINFLOAT => m.push(Obj::Float(f64::from_be_bytes(reader.array()?))),

            op::STRING => {
                let raw = reader.line()?;
                m.push(Obj::Bytes(unquote_string(raw)?));
            }
            op::BINSTRING | op::SHORT_BINSTRING | op::BINBYTES | op::SHORT_BINBYTES
            | op::BINBYTES8 | op::BYTEARRAY8 => {
                let width = match code {
                    op::SHORT_BINSTRING | op::SHORT_BINBYTES => 1,
                    op::BINSTRING | op::BINBYTES => 4,
                    _ => 8,
                };
                let n = reader.len(width)?;
                m.push(Obj::Bytes(reader.take(n)?.to_vec()));
            }
            op::UNICODE => {
                let raw = reader.line()?;
                m.push(Obj::Str(raw_unicode_escape(raw)?));
            }
            op::BINUNICODE | op::SHORT_BINUNICODE | op::BINUNICODE8 => {
                let width = match code {
                    op::SHORT_BINUNICODE => 1,
                    op::BINUNICODE => 4,
                    _ => 8,
                };
                let n = reader.len(width)?;
                let text = std::str::from_utf8(reader.take(n)?)
                    .map_err(|_| DataError::parse("invalid UTF-8 in pickle string"))?;
                m.push(Obj::Str(text.to_string()));
            }

            op::EMPTY_LIST => m.push(Obj::list(Vec::new())),
            op::LIST => {
                let items = m.pop_mark()?;
                m.push(Obj::list(items));
            }
            op::APPEND => {
                let item = m.pop()?;
                m.extend_top(vec![item])?;
            }
            op::APPENDS => {
                let items = m.pop_mark()?;
                m.extend_top(items)?;
            }
            op::EMPTY_TUPLE => m.push(Obj::Tuple(Vec::new())),
            op::TUPLE => {
                let items = m.pop_mark()?;
                m.push(Obj::Tuple(items));
            }
            op::TUPLE1 | op::TUPLE2 | op::TUPLE3 => {
                let items = m.pop_n(usize::from(code - op::TUPLE1 + 1))?;
                m.push(Obj::Tuple(items));
            }
            op::EMPTY_DICT => m.push(Obj::Dict(Rc::default())),
            op::DICT => {
                let items = m.pop_mark()?;
                m.push(Obj::Dict(Rc::default()));
                m.set_items(items)?;
            }
            op::SETITEM => {
                let pair = m.pop_n(2)?;
                m.set_items(pair)?;
            }
            op::SETITEMS => {
                let items = m.pop_mark()?;
                m.set_items(items)?;
            }
            op::EMPTY_SET => m.push(Obj::Opaque),
            op::ADDITEMS => {
                m.pop_mark()?;
            }
            op::FROZENSET => {
                m.pop_mark()?;
                m.push(Obj::Opaque);
            }

            op::GLOBAL => {
                let module = reader.text_line()?.to_string();
                let name = reader.text_line()?.to_string();
                m.push(Obj::Global { module, name });
            }
            op::STACK_GLOBAL => {
                let name = m.pop()?;
                let module = m.pop()?;
                match (module.as_str(), name.as_str()) {
                    (Some(module), Some(name)) => m.push(Obj::Global {
                        module: module.to_string(),
                        name: name.to_string(),
                    }),
                    _ => return Err(DataError::parse("corrupt pickle stream: bad STACK_GLOBAL")),
                }
            }
            op::REDUCE => {
                let args = m.pop()?;
                let callable = m.pop()?;
                m.push(reduce(&callable, args)?);
            }
            op::BUILD => {
                let state = m.pop()?;
                build(m.top()?, state);
            }
            op::NEWOBJ => {
                m.pop_n(2)?;
                m.push(Obj::Opaque);
            }
            op::NEWOBJ_EX => {
                m.pop_n(3)?;
                m.push(Obj::Opaque);
            }
            op::INST => {
                reader.line()?;
                reader.line()?;
                m.pop_mark()?;
                m.push(Obj::Opaque);
            }
            op::OBJ => {
                m.pop_mark()?;
                m.push(Obj::Opaque);
            }

            op::PUT => {
                let index = parse_index(reader.text_line()?)?;
                m.memo_put(index)?;
            }
            op::BINPUT => {
                let index = reader.len(1)?;
                m.memo_put(index)?;
            }
            op::LONG_BINPUT => {
                let index = reader.len(4)?;
                m.memo_put(index)?;
            }
            op::MEMOIZE => {
                let index = m.memo.len();
                m.memo_put(index)?;
            }
            op::GET => {
                let obj = m.memo_get(parse_index(reader.text_line()?)?)?;
                m.push(obj);
            }
            op::BINGET => {
                let obj = m.memo_get(reader.len(1)?)?;
                m.push(obj);
            }
            op::LONG_BINGET => {
                let obj = m.memo_get(reader.len(4)?)?;
                m.push(obj);
            }

            op::PERSID | op::BINPERSID | op::EXT1 | op::EXT2 | op::EXT4 | op::NEXT_BUFFER
            | op::READONLY_BUFFER => {
                return Err(DataError::parse(format!(
                    "unsupported pickle opcode 0x{code:02x}"
                )))
            }
            other => {
                return Err(DataError::parse(format!(
                    "invalid pickle opcode 0x{other:02x} at offset {}",
                    reader.pos - 1
                )))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// NumPy callables
// ---------------------------------------------------------------------------

fn is_numpy_module(module: &str, submodule: &str) -> bool {
    module == format!("numpy.core.{submodule}") || module == format!("numpy._core.{submodule}")
}

fn reduce(callable: &Obj, args: Obj) -> Result<Obj> {
    let (module, name) = match callable {
        Obj::Global { module, name } => (module.as_str(), name.as_str()),
        _ => return Ok(Obj::Opaque),
    };
    let args = match args {
        Obj::Tuple(items) => items,
        _ => return Ok(Obj::Opaque),
    };

    match (module, name) {
        (m, "_reconstruct") if is_numpy_module(m, "multiarray") => {
            Ok(Obj::Array(Rc::default()))
        }
        (m, "scalar") if is_numpy_module(m, "multiarray") => numpy_scalar(&args),
        (m, "_frombuffer") if is_numpy_module(m, "numeric") => match args.as_slice() {
            [buf, dtype, shape, order] => {
                let fortran = order.as_str() == Some("F");
                let state = Obj::Tuple(vec![
                    shape.clone(),
                    dtype.clone(),
                    Obj::Bool(fortran),
                    buf.clone(),
                ]);
                Ok(Obj::Array(Rc::new(RefCell::new(ArrayObj {
                    state: Some(state),
                }))))
            }
            _ => Err(DataError::parse("corrupt ndarray buffer arguments")),
        },
        ("numpy", "dtype") => match args.first().and_then(Obj::as_str) {
            Some(code) => Ok(Obj::Dtype(Rc::new(RefCell::new(DtypeObj {
                code: code.to_string(),
                big_endian: false,
            })))),
            None => Ok(Obj::Opaque),
        },
        ("_codecs", "encode") => match args.first().and_then(Obj::as_str) {
            Some(text) => latin1(text)
                .map(Obj::Bytes)
                .ok_or_else(|| DataError::parse("pickled bytes are not latin-1")),
            None => Ok(Obj::Opaque),
        },
        _ => Ok(Obj::Opaque),
    }
}

/// `scalar(dtype, raw)`: one element of `dtype` packed in `raw`.
fn numpy_scalar(args: &[Obj]) -> Result<Obj> {
    let [Obj::Dtype(dtype), raw] = args else {
        return Err(DataError::parse("corrupt numpy scalar arguments"));
    };
    match dtype.borrow().resolve()? {
        Dtype::Object => Ok(raw.clone()),
        Dtype::Numeric {
            kind,
            width,
            big_endian,
        } => {
            let bytes = raw
                .to_bytes()
                .ok_or_else(|| DataError::parse("numpy scalar data is not bytes"))?;
            match decode_numbers(&bytes, kind, width, big_endian).as_deref() {
                Some([v]) if kind == NumericKind::Bool => Ok(Obj::Bool(*v != 0.0)),
                Some([v]) => Ok(Obj::Float(*v)),
                _ => Err(DataError::parse("corrupt numpy scalar data")),
            }
        }
    }
}

fn build(target: &mut Obj, state: Obj) {
    match target {
        Obj::Array(array) => array.borrow_mut().state = Some(state),
        Obj::Dtype(dtype) => {
            // (version, byteorder, subarray, names, fields, elsize, alignment, flags)
            if let Obj::Tuple(items) = &state {
                if let Some(order) = items.get(1).and_then(Obj::as_str) {
                    dtype.borrow_mut().big_endian = order == ">";
                }
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

fn latin1(text: &str) -> Option<Vec<u8>> {
    text.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

fn parse_index(text: &str) -> Result<usize> {
    text.trim()
        .parse()
        .map_err(|_| DataError::parse(format!("bad pickle memo index '{text}'")))
}

/// Decimal integers; values beyond `i64` degrade to a float.
fn parse_int_text(text: &str) -> Result<Obj> {
    let text = text.trim();
    if let Ok(v) = text.parse::<i64>() {
        return Ok(Obj::Int(v));
    }
    text.parse::<f64>()
        .map(Obj::Float)
        .map_err(|_| DataError::parse(format!("bad pickle integer '{text}'")))
}

/// Little-endian two's complement, as written by LONG1 and LONG4.
fn long_from_bytes(bytes: &[u8]) -> Obj {
    if bytes.len() <= 8 {
        let fill = if bytes.last().is_some_and(|b| b & 0x80 != 0) { 0xff } else { 0 };
        let mut raw = [fill; 8];
        raw[..bytes.len()].copy_from_slice(bytes);
        return Obj::Int(i64::from_le_bytes(raw));
    }
    let magnitude = bytes.iter().rev().fold(0.0f64, |acc, &b| acc * 256.0 + f64::from(b));
    let negative = bytes.last().is_some_and(|b| b & 0x80 != 0);
    if negative {
        Obj::Float(magnitude - 256f64.powi(bytes.len() as i32))
    } else {
        Obj::Float(magnitude)
    }
}

/// Protocol 0 `STRING` argument: a quoted Python 2 string literal.
fn unquote_string(raw: &[u8]) -> Result<Vec<u8>> {
    let bad = || DataError::parse("bad quoted string in pickle stream");
    let inner = match raw {
        [q, inner @ .., last] if (*q == b'\'' || *q == b'"') && q == last => inner,
        _ => return Err(bad()),
    };

    let mut out = Vec::with_capacity(inner.len());
    let mut iter = inner.iter().copied();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match iter.next().ok_or_else(bad)? {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'0' => out.push(0),
            b'x' => {
                let hex = [iter.next().ok_or_else(bad)?, iter.next().ok_or_else(bad)?];
                let hex = std::str::from_utf8(&hex).map_err(|_| bad())?;
                out.push(u8::from_str_radix(hex, 16).map_err(|_| bad())?);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Protocol 0 `UNICODE` argument: only `\uXXXX` and `\UXXXXXXXX` are escaped.
fn raw_unicode_escape(raw: &[u8]) -> Result<String> {
    let bad = || DataError::parse("bad unicode escape in pickle stream");
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let digits = match raw.get(i..i + 2) {
            Some(b"\\u") => 4,
            Some(b"\\U") => 8,
            _ => {
                out.push(char::from(raw[i]));
                i += 1;
                continue;
            }
        };
        let hex = raw.get(i + 2..i + 2 + digits).ok_or_else(bad)?;
        let hex = std::str::from_utf8(hex).map_err(|_| bad())?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| bad())?;
        out.push(char::from_u32(code).ok_or_else(bad)?);
        i += 2 + digits;
    }
    Ok(out)
}

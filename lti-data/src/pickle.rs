//! # Minimal unpickler
//!
//! Decodes the subset of the Python pickle format (protocols 2–5) used by
//! numpy array pickles and plain containers. Objects are not instantiated:
//! `REDUCE`/`NEWOBJ` produce a [`Value::Object`] that records the callable,
//! its arguments, and any `BUILD` state, which is enough to recover the shape,
//! dtype, and raw buffer of a pickled `numpy.ndarray`.
//!
//! The memo stores snapshots. A container memoized before it is filled and
//! fetched again later decodes as it was at memo time.

use std::collections::HashMap;
use std::io::Read;

use bytes::Bytes;

use crate::error::{DataError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// OPCODES
// ═══════════════════════════════════════════════════════════════════════════════

const MARK: u8 = b'(';
const STOP: u8 = b'.';
const POP: u8 = b'0';
const POP_MARK: u8 = b'1';
const DUP: u8 = b'2';
const INT: u8 = b'I';
const BININT: u8 = b'J';
const BININT1: u8 = b'K';
const BININT2: u8 = b'M';
const NONE: u8 = b'N';
const BINFLOAT: u8 = b'G';
const BINSTRING: u8 = b'T';
const SHORT_BINSTRING: u8 = b'U';
const BINUNICODE: u8 = b'X';
const APPEND: u8 = b'a';
const BUILD: u8 = b'b';
const GLOBAL: u8 = b'c';
const DICT: u8 = b'd';
const EMPTY_DICT: u8 = b'}';
const APPENDS: u8 = b'e';
const GET: u8 = b'g';
const BINGET: u8 = b'h';
const LONG_BINGET: u8 = b'j';
const LIST: u8 = b'l';
const EMPTY_LIST: u8 = b']';
const PUT: u8 = b'p';
const BINPUT: u8 = b'q';
const LONG_BINPUT: u8 = b'r';
const SETITEM: u8 = b's';
const TUPLE: u8 = b't';
const EMPTY_TUPLE: u8 = b')';
const SETITEMS: u8 = b'u';
const REDUCE: u8 = b'R';

// protocol 2
const PROTO: u8 = 0x80;
const NEWOBJ: u8 = 0x81;
const TUPLE1: u8 = 0x85;
const TUPLE2: u8 = 0x86;
const TUPLE3: u8 = 0x87;
const NEWTRUE: u8 = 0x88;
const NEWFALSE: u8 = 0x89;
const LONG1: u8 = 0x8a;
const LONG4: u8 = 0x8b;

// protocol 3+
const BINBYTES: u8 = b'B';
const SHORT_BINBYTES: u8 = b'C';
const SHORT_BINUNICODE: u8 = 0x8c;
const BINUNICODE8: u8 = 0x8d;
const BINBYTES8: u8 = 0x8e;
const NEWOBJ_EX: u8 = 0x92;
const STACK_GLOBAL: u8 = 0x93;
const MEMOIZE: u8 = 0x94;
const FRAME: u8 = 0x95;
const BYTEARRAY8: u8 = 0x96;

/// A decoded pickle value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Python 2 `str`, `bytes`, `bytearray`
    Bytes(Bytes),
    String(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Insertion-ordered key/value pairs
    Dict(Vec<(Value, Value)>),
    Global {
        module: String,
        name: String,
    },
    Object {
        callable: Box<Value>,
        args: Box<Value>,
        state: Option<Box<Value>>,
    },
}

impl Value {
    /// Dict lookup by textual key (`str` or byte-string keys)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Dict(pairs) => pairs
                .iter()
                .find(|(k, _)| k.as_text() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Text content of a `str` or UTF-8 byte string
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Items of a list or tuple
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

/// Decode a pickle held in memory
pub fn from_bytes(data: Bytes) -> Result<Value> {
    Unpickler::new(data).run()
}

/// Decode a pickle from a reader
pub fn from_reader<R: Read>(mut reader: R) -> Result<Value> {
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;
    from_bytes(Bytes::from(buffer))
}

struct Unpickler {
    data: Bytes,
    pos: usize,
    stack: Vec<Value>,
    marks: Vec<usize>,
    memo: HashMap<u64, Value>,
}

impl Unpickler {
    fn new(data: Bytes) -> Self {
        Self {
            data,
            pos: 0,
            stack: Vec::new(),
            marks: Vec::new(),
            memo: HashMap::new(),
        }
    }

    fn run(mut self) -> Result<Value> {
        loop {
            let offset = self.pos;
            let op = self.read_u8()?;

            match op {
                PROTO => {
                    self.read_u8()?;
                }
                FRAME => {
                    self.take(8)?;
                }
                STOP => return self.pop(),

                MARK => self.marks.push(self.stack.len()),
                POP => {
                    self.pop()?;
                }
                POP_MARK => {
                    self.pop_mark()?;
                }
                DUP => {
                    let top = self.top()?.clone();
                    self.stack.push(top);
                }

                NONE => self.stack.push(Value::None),
                NEWTRUE => self.stack.push(Value::Bool(true)),
                NEWFALSE => self.stack.push(Value::Bool(false)),
                INT => {
                    let line = self.read_line()?;
                    let value = match line.as_str() {
                        "00" => Value::Bool(false),
                        "01" => Value::Bool(true),
                        text => Value::Int(text.parse().map_err(|_| {
                            DataError::Pickle(format!("bad INT literal {text:?}"))
                        })?),
                    };
                    self.stack.push(value);
                }
                BININT => {
                    let v = i32::from_le_bytes(self.array()?);
                    self.stack.push(Value::Int(v.into()));
                }
                BININT1 => {
                    let v = self.read_u8()?;
                    self.stack.push(Value::Int(v.into()));
                }
                BININT2 => {
                    let v = u16::from_le_bytes(self.array()?);
                    self.stack.push(Value::Int(v.into()));
                }
                LONG1 => {
                    let n = usize::from(self.read_u8()?);
                    let v = decode_long(&self.take(n)?)?;
                    self.stack.push(Value::Int(v));
                }
                LONG4 => {
                    let n = self.read_len_u32()?;
                    let v = decode_long(&self.take(n)?)?;
                    self.stack.push(Value::Int(v));
                }
                BINFLOAT => {
                    let v = f64::from_be_bytes(self.array()?);
                    self.stack.push(Value::Float(v));
                }

                BINSTRING => {
                    let n = i32::from_le_bytes(self.array()?);
                    let n = usize::try_from(n)
                        .map_err(|_| DataError::Pickle(format!("negative BINSTRING length {n}")))?;
                    let b = self.take(n)?;
                    self.stack.push(Value::Bytes(b));
                }
                SHORT_BINSTRING | SHORT_BINBYTES => {
                    let n = usize::from(self.read_u8()?);
                    let b = self.take(n)?;
                    self.stack.push(Value::Bytes(b));
                }
                BINBYTES => {
                    let n = self.read_len_u32()?;
                    let b = self.take(n)?;
                    self.stack.push(Value::Bytes(b));
                }
                BINBYTES8 | BYTEARRAY8 => {
                    let n = self.read_len_u64()?;
                    let b = self.take(n)?;
                    self.stack.push(Value::Bytes(b));
                }
                SHORT_BINUNICODE => {
                    let n = usize::from(self.read_u8()?);
                    let s = self.read_utf8(n)?;
                    self.stack.push(Value::String(s));
                }
                BINUNICODE => {
                    let n = self.read_len_u32()?;
                    let s = self.read_utf8(n)?;
                    self.stack.push(Value::String(s));
                }
                BINUNICODE8 => {
                    let n = self.read_len_u64()?;
                    let s = self.read_utf8(n)?;
                    self.stack.push(Value::String(s));
                }

                EMPTY_LIST => self.stack.push(Value::List(Vec::new())),
                EMPTY_TUPLE => self.stack.push(Value::Tuple(Vec::new())),
                EMPTY_DICT => self.stack.push(Value::Dict(Vec::new())),
                LIST => {
                    let items = self.pop_mark()?;
                    self.stack.push(Value::List(items));
                }
                TUPLE => {
                    let items = self.pop_mark()?;
                    self.stack.push(Value::Tuple(items));
                }
                TUPLE1 | TUPLE2 | TUPLE3 => {
                    let n = usize::from(op - TUPLE1 + 1);
                    if self.stack.len() < n {
                        return Err(DataError::Pickle(format!("stack underflow at byte {offset}")));
                    }
                    let items = self.stack.split_off(self.stack.len() - n);
                    self.stack.push(Value::Tuple(items));
                }
                DICT => {
                    let items = self.pop_mark()?;
                    let pairs = into_pairs(items, offset)?;
                    self.stack.push(Value::Dict(pairs));
                }
                APPEND => {
                    let item = self.pop()?;
                    self.extend_list(vec![item], offset)?;
                }
                APPENDS => {
                    let items = self.pop_mark()?;
                    self.extend_list(items, offset)?;
                }
                SETITEM => {
                    let value = self.pop()?;
                    let key = self.pop()?;
                    self.extend_dict(vec![(key, value)], offset)?;
                }
                SETITEMS => {
                    let items = self.pop_mark()?;
                    let pairs = into_pairs(items, offset)?;
                    self.extend_dict(pairs, offset)?;
                }

                PUT => {
                    let index = self.read_line()?;
                    let index = index
                        .parse()
                        .map_err(|_| DataError::Pickle(format!("bad PUT index {index:?}")))?;
                    self.memoize(index)?;
                }
                BINPUT => {
                    let index = self.read_u8()?;
                    self.memoize(index.into())?;
                }
                LONG_BINPUT => {
                    let index = u32::from_le_bytes(self.array()?);
                    self.memoize(index.into())?;
                }
                MEMOIZE => {
                    let index = self.memo.len() as u64;
                    self.memoize(index)?;
                }
                GET => {
                    let index = self.read_line()?;
                    let index = index
                        .parse()
                        .map_err(|_| DataError::Pickle(format!("bad GET index {index:?}")))?;
                    self.fetch(index)?;
                }
                BINGET => {
                    let index = self.read_u8()?;
                    self.fetch(index.into())?;
                }
                LONG_BINGET => {
                    let index = u32::from_le_bytes(self.array()?);
                    self.fetch(index.into())?;
                }

                GLOBAL => {
                    let module = self.read_line()?;
                    let name = self.read_line()?;
                    self.stack.push(Value::Global { module, name });
                }
                STACK_GLOBAL => {
                    let name = self.pop_text(offset)?;
                    let module = self.pop_text(offset)?;
                    self.stack.push(Value::Global { module, name });
                }
                REDUCE | NEWOBJ => {
                    let args = self.pop()?;
                    let callable = self.pop()?;
                    self.stack.push(Value::Object {
                        callable: Box::new(callable),
                        args: Box::new(args),
                        state: None,
                    });
                }
                NEWOBJ_EX => {
                    let _kwargs = self.pop()?;
                    let args = self.pop()?;
                    let callable = self.pop()?;
                    self.stack.push(Value::Object {
                        callable: Box::new(callable),
                        args: Box::new(args),
                        state: None,
                    });
                }
                BUILD => {
                    let new_state = self.pop()?;
                    match self.top_mut()? {
                        Value::Object { state, .. } => *state = Some(Box::new(new_state)),
                        Value::Dict(pairs) => match new_state {
                            Value::Dict(extra) => pairs.extend(extra),
                            _ => {
                                return Err(DataError::Pickle(format!(
                                    "BUILD on dict needs dict state at byte {offset}"
                                )));
                            }
                        },
                        _ => {
                            return Err(DataError::Pickle(format!(
                                "BUILD target is not an object at byte {offset}"
                            )));
                        }
                    }
                }

                other => {
                    return Err(DataError::Pickle(format!(
                        "unsupported opcode 0x{other:02x} at byte {offset}"
                    )));
                }
            }
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| DataError::Pickle("unexpected end of pickle data".into()))?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, n: usize) -> Result<Bytes> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| DataError::Pickle("unexpected end of pickle data".into()))?;
        let slice = self.data.slice(self.pos..end);
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&bytes);
        Ok(out)
    }

    fn read_len_u32(&mut self) -> Result<usize> {
        let n = u32::from_le_bytes(self.array()?);
        usize::try_from(n).map_err(|_| DataError::Pickle(format!("length {n} too large")))
    }

    fn read_len_u64(&mut self) -> Result<usize> {
        let n = u64::from_le_bytes(self.array()?);
        usize::try_from(n).map_err(|_| DataError::Pickle(format!("length {n} too large")))
    }

    fn read_utf8(&mut self, n: usize) -> Result<String> {
        let bytes = self.take(n)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| DataError::Pickle(format!("invalid UTF-8 string: {e}")))
    }

    /// Newline-terminated ASCII argument
    fn read_line(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| DataError::Pickle("unterminated text argument".into()))?;
        let line = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.pos += end + 1;
        Ok(line)
    }

    fn pop(&mut self) -> Result<Value> {
        self.stack
            .pop()
            .ok_or_else(|| DataError::Pickle(format!("stack underflow at byte {}", self.pos)))
    }

    fn pop_text(&mut self, offset: usize) -> Result<String> {
        match self.pop()? {
            Value::String(s) => Ok(s),
            Value::Bytes(b) => Ok(String::from_utf8_lossy(&b).into_owned()),
            _ => Err(DataError::Pickle(format!(
                "STACK_GLOBAL needs string operands at byte {offset}"
            ))),
        }
    }

    fn top(&self) -> Result<&Value> {
        self.stack
            .last()
            .ok_or_else(|| DataError::Pickle(format!("empty stack at byte {}", self.pos)))
    }

    fn top_mut(&mut self) -> Result<&mut Value> {
        let pos = self.pos;
        self.stack
            .last_mut()
            .ok_or_else(|| DataError::Pickle(format!("empty stack at byte {pos}")))
    }

    fn pop_mark(&mut self) -> Result<Vec<Value>> {
        let mark = self
            .marks
            .pop()
            .ok_or_else(|| DataError::Pickle(format!("missing MARK before byte {}", self.pos)))?;
        if mark > self.stack.len() {
            return Err(DataError::Pickle("MARK beyond stack top".into()));
        }
        Ok(self.stack.split_off(mark))
    }

    fn extend_list(&mut self, items: Vec<Value>, offset: usize) -> Result<()> {
        match self.top_mut()? {
            Value::List(list) => {
                list.extend(items);
                Ok(())
            }
            _ => Err(DataError::Pickle(format!("append to non-list at byte {offset}"))),
        }
    }

    fn extend_dict(&mut self, pairs: Vec<(Value, Value)>, offset: usize) -> Result<()> {
        match self.top_mut()? {
            Value::Dict(dict) => {
                dict.extend(pairs);
                Ok(())
            }
            _ => Err(DataError::Pickle(format!("setitem on non-dict at byte {offset}"))),
        }
    }

    fn memoize(&mut self, index: u64) -> Result<()> {
        let value = self.top()?.clone();
        self.memo.insert(index, value);
        Ok(())
    }

    fn fetch(&mut self, index: u64) -> Result<()> {
        let value = self
            .memo
            .get(&index)
            .cloned()
            .ok_or_else(|| DataError::Pickle(format!("memo key {index} not found")))?;
        self.stack.push(value);
        Ok(())
    }
}

fn into_pairs(items: Vec<Value>, offset: usize) -> Result<Vec<(Value, Value)>> {
    if items.len() % 2 != 0 {
        return Err(DataError::Pickle(format!("odd number of dict items at byte {offset}")));
    }
    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        pairs.push((key, value));
    }
    Ok(pairs)
}

/// Little-endian two's-complement integer of up to 8 bytes
fn decode_long(bytes: &[u8]) -> Result<i64> {
    if bytes.len() > 8 {
        return Err(DataError::Pickle(format!("{}-byte integer does not fit in i64", bytes.len())));
    }
    if bytes.is_empty() {
        return Ok(0);
    }

    let fill = if bytes[bytes.len() - 1] & 0x80 != 0 { 0xff } else { 0x00 };
    let mut buf = [fill; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(i64::from_le_bytes(buf))
}

// ═══════════════════════════════════════════════════════════════════════════════
// NUMPY
// ═══════════════════════════════════════════════════════════════════════════════

/// The pieces of a pickled `numpy.ndarray` needed to rebuild it
#[derive(Debug, Clone, PartialEq)]
pub struct NumpyArray {
    pub shape: Vec<usize>,
    /// dtype code such as `u1` or `<f4`
    pub dtype: String,
    pub fortran_order: bool,
    pub data: Bytes,
}

impl NumpyArray {
    /// Read the `BUILD` state `(version, shape, dtype, fortran_order, data)`
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object {
            state: Some(state), ..
        } = value
        else {
            return Err(DataError::Pickle("value is not a reconstructed ndarray".into()));
        };

        let fields = state
            .as_sequence()
            .filter(|fields| fields.len() == 5)
            .ok_or_else(|| DataError::Pickle("unexpected ndarray state layout".into()))?;

        let shape = fields[1]
            .as_sequence()
            .ok_or_else(|| DataError::Pickle("ndarray shape is not a tuple".into()))?
            .iter()
            .map(|dim| {
                dim.as_int()
                    .and_then(|d| usize::try_from(d).ok())
                    .ok_or_else(|| DataError::Pickle("ndarray dimension is not an integer".into()))
            })
            .collect::<Result<Vec<_>>>()?;

        let dtype = match &fields[2] {
            Value::Object { args, .. } => args
                .as_sequence()
                .and_then(|args| args.first())
                .and_then(Value::as_text)
                .map(str::to_owned),
            _ => None,
        }
        .ok_or_else(|| DataError::Pickle("ndarray dtype is not a numpy.dtype".into()))?;

        let fortran_order = fields[3]
            .as_bool()
            .ok_or_else(|| DataError::Pickle("ndarray order flag is not a bool".into()))?;

        let data = fields[4]
            .as_bytes()
            .cloned()
            .ok_or_else(|| DataError::Pickle("ndarray buffer is not a byte string".into()))?;

        Ok(Self {
            shape,
            dtype,
            fortran_order,
            data,
        })
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

use std::cmp::Ordering;
use std::fmt;
use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::errors::RecordError;

/// Closed set of attribute types the storage layer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int,
    Real,
    Varchar,
}

impl DataType {
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int => "INT",
            DataType::Real => "REAL",
            DataType::Varchar => "VARCHAR",
        }
    }
}

/// A typed value in its in-memory form. Comparison and hashing dispatch over
/// the tag once, here, instead of at every call site.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Real(f32),
    Varchar(String),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int,
            Value::Real(_) => DataType::Real,
            Value::Varchar(_) => DataType::Varchar,
        }
    }

    /// Size of this value in the tuple wire format: 4 bytes for Int/Real,
    /// a 4-byte length prefix plus the raw bytes for Varchar.
    pub fn wire_size(&self) -> usize {
        match self {
            Value::Int(_) | Value::Real(_) => 4,
            Value::Varchar(s) => 4 + s.len(),
        }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) {
        match self {
            Value::Int(v) => buffer
                .write_i32::<LittleEndian>(*v)
                .expect("vec write cannot fail"),
            Value::Real(v) => buffer
                .write_f32::<LittleEndian>(*v)
                .expect("vec write cannot fail"),
            Value::Varchar(s) => {
                buffer
                    .write_u32::<LittleEndian>(s.len() as u32)
                    .expect("vec write cannot fail");
                buffer.extend_from_slice(s.as_bytes());
            }
        }
    }

    /// Decodes one value of `data_type` from the cursor, advancing it past
    /// the consumed bytes.
    pub fn decode(data_type: DataType, cursor: &mut Cursor<&[u8]>) -> Result<Value, RecordError> {
        match data_type {
            DataType::Int => {
                let v = cursor
                    .read_i32::<LittleEndian>()
                    .map_err(|_| RecordError::MalformedTuple)?;
                Ok(Value::Int(v))
            }
            DataType::Real => {
                let v = cursor
                    .read_f32::<LittleEndian>()
                    .map_err(|_| RecordError::MalformedTuple)?;
                Ok(Value::Real(v))
            }
            DataType::Varchar => {
                let len = cursor
                    .read_u32::<LittleEndian>()
                    .map_err(|_| RecordError::MalformedTuple)? as usize;
                let start = cursor.position() as usize;
                let raw = *cursor.get_ref();
                if start + len > raw.len() {
                    return Err(RecordError::MalformedTuple);
                }
                let s = std::str::from_utf8(&raw[start..start + len])
                    .map_err(|_| RecordError::MalformedTuple)?
                    .to_string();
                cursor.set_position((start + len) as u64);
                Ok(Value::Varchar(s))
            }
        }
    }

    /// Total order between two values of the same type. `None` when the
    /// types differ.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Real(a), Value::Real(b)) => Some(a.total_cmp(b)),
            // Byte-wise lexicographic, which is what str::cmp does.
            (Value::Varchar(a), Value::Varchar(b)) => Some(a.as_str().cmp(b.as_str())),
            _ => None,
        }
    }

    /// Raw key bytes fed to the index hash: the fixed 4-byte encoding for
    /// numerics, the unprefixed string bytes for Varchar.
    pub fn key_bytes(&self) -> Vec<u8> {
        match self {
            Value::Int(v) => v.to_le_bytes().to_vec(),
            Value::Real(v) => v.to_le_bytes().to_vec(),
            Value::Varchar(s) => s.as_bytes().to_vec(),
        }
    }

    pub fn hash_key(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.key_bytes());
        hasher.finalize()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
            Value::Varchar(s) => write!(f, "{}", s),
        }
    }
}

/// Comparison operators a scan predicate can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    Ne,
    NoOp,
}

impl CompOp {
    /// Whether an ordering of `record value` versus `predicate value`
    /// satisfies the operator. `NoOp` always matches.
    pub fn matches(&self, ordering: Ordering) -> bool {
        match self {
            CompOp::Eq => ordering == Ordering::Equal,
            CompOp::Lt => ordering == Ordering::Less,
            CompOp::Le => ordering != Ordering::Greater,
            CompOp::Gt => ordering == Ordering::Greater,
            CompOp::Ge => ordering != Ordering::Less,
            CompOp::Ne => ordering != Ordering::Equal,
            CompOp::NoOp => true,
        }
    }
}

use std::io::Cursor;

use bytes::Buf;

use crate::catalog::schema::Schema;
use crate::db_types::value::{DataType, Value};
use crate::errors::RecordError;

/// Encodes values into the tuple wire format, in schema order: Int/Real as
/// 4 little-endian bytes, Varchar as a 4-byte length prefix followed by the
/// raw bytes, no terminator, no padding.
pub fn encode_values(schema: &Schema, values: &[Value]) -> Result<Vec<u8>, RecordError> {
    if values.len() != schema.len() {
        return Err(RecordError::MalformedTuple);
    }
    let mut data = Vec::new();
    for (attribute, value) in schema.attributes().iter().zip(values) {
        if value.data_type() != attribute.data_type {
            return Err(RecordError::TypeMismatch(attribute.data_type.name()));
        }
        if let Value::Varchar(s) = value {
            if s.len() > attribute.length as usize {
                return Err(RecordError::TypeMismatch(attribute.data_type.name()));
            }
        }
        value.encode(&mut data);
    }
    Ok(data)
}

pub fn decode_values(schema: &Schema, data: &[u8]) -> Result<Vec<Value>, RecordError> {
    let mut cursor = Cursor::new(data);
    let mut values = Vec::with_capacity(schema.len());
    for attribute in schema.attributes() {
        values.push(Value::decode(attribute.data_type, &mut cursor)?);
    }
    if cursor.position() as usize != data.len() {
        return Err(RecordError::MalformedTuple);
    }
    Ok(values)
}

/// Walks the encoded tuple and returns its exact wire size, verifying it
/// matches the schema.
pub fn wire_size(schema: &Schema, data: &[u8]) -> Result<usize, RecordError> {
    let mut offset = 0usize;
    for attribute in schema.attributes() {
        offset += field_len(attribute.data_type, data, offset)?;
    }
    if offset != data.len() {
        return Err(RecordError::MalformedTuple);
    }
    Ok(offset)
}

fn field_len(data_type: DataType, data: &[u8], offset: usize) -> Result<usize, RecordError> {
    match data_type {
        DataType::Int | DataType::Real => {
            if offset + 4 > data.len() {
                return Err(RecordError::MalformedTuple);
            }
            Ok(4)
        }
        DataType::Varchar => {
            if offset + 4 > data.len() {
                return Err(RecordError::MalformedTuple);
            }
            let mut prefix = &data[offset..offset + 4];
            let len = prefix.get_u32_le() as usize;
            if offset + 4 + len > data.len() {
                return Err(RecordError::MalformedTuple);
            }
            Ok(4 + len)
        }
    }
}

/// Byte range `(offset, len)` of the field at schema position `index`.
pub fn field_range(
    schema: &Schema,
    data: &[u8],
    index: usize,
) -> Result<(usize, usize), RecordError> {
    let mut offset = 0usize;
    for (position, attribute) in schema.attributes().iter().enumerate() {
        let len = field_len(attribute.data_type, data, offset)?;
        if position == index {
            return Ok((offset, len));
        }
        offset += len;
    }
    Err(RecordError::MalformedTuple)
}

/// Decodes the single field at schema position `index`.
pub fn read_field(schema: &Schema, data: &[u8], index: usize) -> Result<Value, RecordError> {
    let (offset, _) = field_range(schema, data, index)?;
    let mut cursor = Cursor::new(data);
    cursor.set_position(offset as u64);
    Value::decode(schema.attributes()[index].data_type, &mut cursor)
}

/// Debug dump of one record, `name: value` per field.
pub fn format_record(schema: &Schema, data: &[u8]) -> Result<String, RecordError> {
    let values = decode_values(schema, data)?;
    let fields: Vec<String> = schema
        .attributes()
        .iter()
        .zip(&values)
        .map(|(attribute, value)| format!("{}: {}", attribute.name, value))
        .collect();
    Ok(fields.join(", "))
}

//! Runtime values and the codec that moves them to and from wire bytes.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{Error, Result};

use super::schema::{Field, FieldType, Schema};

/// A decoded value, tagged with the wire type it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Byte(u8),
    Word(u16),
    Dword(u32),
    Qword(u64),
    SignedByte(i8),
    SignedWord(i16),
    SignedDword(i32),
    SignedQword(i64),
    Single(f32),
    Double(f64),
    Boolean(bool),
    Guid(Uuid),
    String(String),
    Binary(Vec<u8>),
    Array(Vec<Value>),
    /// A decoded nested or dynamic record: field name to value, in schema
    /// order.
    Record(HashMap<String, Value>),
}

/// Encodes one value against its field type, appending the wire bytes to
/// `out`.
pub fn encode_value(value: &Value, field_type: &FieldType, out: &mut Vec<u8>) -> Result<()> {
    match (field_type, value) {
        (FieldType::Null, Value::Null) => Ok(()),
        (FieldType::Byte, Value::Byte(v)) => {
            out.push(*v);
            Ok(())
        }
        (FieldType::Word, Value::Word(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (FieldType::Dword, Value::Dword(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (FieldType::Qword, Value::Qword(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (FieldType::SignedByte, Value::SignedByte(v)) => {
            out.push(*v as u8);
            Ok(())
        }
        (FieldType::SignedWord, Value::SignedWord(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (FieldType::SignedDword, Value::SignedDword(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (FieldType::SignedQword, Value::SignedQword(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (FieldType::Single, Value::Single(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (FieldType::Double, Value::Double(v)) => {
            out.extend_from_slice(&v.to_le_bytes());
            Ok(())
        }
        (FieldType::Boolean, Value::Boolean(v)) => {
            out.push(if *v { 1 } else { 0 });
            Ok(())
        }
        (FieldType::Guid, Value::Guid(v)) => {
            out.extend_from_slice(v.as_bytes());
            Ok(())
        }
        (FieldType::String, Value::String(v)) => {
            let bytes = v.as_bytes();
            if bytes.len() > u16::MAX as usize {
                return Err(Error::SerializationError);
            }
            out.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
            out.extend_from_slice(bytes);
            Ok(())
        }
        (FieldType::Binary, Value::Binary(v)) => {
            if v.len() > u16::MAX as usize {
                return Err(Error::SerializationError);
            }
            out.extend_from_slice(&(v.len() as u16).to_le_bytes());
            out.extend_from_slice(v);
            Ok(())
        }
        (FieldType::Array(elem_type), Value::Array(items)) => {
            if items.len() > u16::MAX as usize {
                return Err(Error::SerializationError);
            }
            out.extend_from_slice(&(items.len() as u16).to_le_bytes());
            for item in items {
                encode_value(item, elem_type, out)?;
            }
            Ok(())
        }
        (FieldType::Record(schema), Value::Record(fields)) => encode_record(fields, schema, out),
        _ => Err(Error::SerializationError),
    }
}

/// Decodes one value from the front of `buf` against its field type.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_value(buf: &[u8], field_type: &FieldType) -> Result<(Value, usize)> {
    match field_type {
        FieldType::Null => Ok((Value::Null, 0)),
        FieldType::Byte => {
            let b = read_bytes(buf, 1)?;
            Ok((Value::Byte(b[0]), 1))
        }
        FieldType::Word => {
            let b = read_bytes(buf, 2)?;
            Ok((Value::Word(u16::from_le_bytes([b[0], b[1]])), 2))
        }
        FieldType::Dword => {
            let b = read_bytes(buf, 4)?;
            Ok((
                Value::Dword(u32::from_le_bytes([b[0], b[1], b[2], b[3]])),
                4,
            ))
        }
        FieldType::Qword => {
            let b = read_bytes(buf, 8)?;
            Ok((Value::Qword(u64::from_le_bytes(b.try_into().unwrap())), 8))
        }
        FieldType::SignedByte => {
            let b = read_bytes(buf, 1)?;
            Ok((Value::SignedByte(b[0] as i8), 1))
        }
        FieldType::SignedWord => {
            let b = read_bytes(buf, 2)?;
            Ok((Value::SignedWord(i16::from_le_bytes([b[0], b[1]])), 2))
        }
        FieldType::SignedDword => {
            let b = read_bytes(buf, 4)?;
            Ok((
                Value::SignedDword(i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
                4,
            ))
        }
        FieldType::SignedQword => {
            let b = read_bytes(buf, 8)?;
            Ok((
                Value::SignedQword(i64::from_le_bytes(b.try_into().unwrap())),
                8,
            ))
        }
        FieldType::Single => {
            let b = read_bytes(buf, 4)?;
            Ok((
                Value::Single(f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
                4,
            ))
        }
        FieldType::Double => {
            let b = read_bytes(buf, 8)?;
            Ok((Value::Double(f64::from_le_bytes(b.try_into().unwrap())), 8))
        }
        FieldType::Boolean => {
            let b = read_bytes(buf, 1)?;
            Ok((Value::Boolean(b[0] > 0), 1))
        }
        FieldType::Guid => {
            let b = read_bytes(buf, 16)?;
            let array: [u8; 16] = b.try_into().unwrap();
            Ok((Value::Guid(Uuid::from_bytes(array)), 16))
        }
        FieldType::String => {
            let len_bytes = read_bytes(buf, 2)?;
            let len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
            let data = read_bytes(&buf[2..], len)?;
            let s = std::str::from_utf8(data)
                .map_err(|_| Error::InvalidEncoding)?
                .to_owned();
            Ok((Value::String(s), 2 + len))
        }
        FieldType::Binary => {
            let len_bytes = read_bytes(buf, 2)?;
            let len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
            let data = read_bytes(&buf[2..], len)?;
            Ok((Value::Binary(data.to_vec()), 2 + len))
        }
        FieldType::Array(elem_type) => {
            let count_bytes = read_bytes(buf, 2)?;
            let count = u16::from_le_bytes([count_bytes[0], count_bytes[1]]) as usize;
            let mut offset = 2;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let (item, consumed) = decode_value(&buf[offset..], elem_type)?;
                items.push(item);
                offset += consumed;
            }
            Ok((Value::Array(items), offset))
        }
        FieldType::Record(schema) => {
            let (fields, consumed) = decode_record(buf, schema)?;
            Ok((Value::Record(fields), consumed))
        }
    }
}

fn read_bytes(buf: &[u8], len: usize) -> Result<&[u8]> {
    if buf.len() < len {
        return Err(Error::DeserializationError);
    }
    Ok(&buf[..len])
}

/// Encodes a record's fields, in schema order, appending to `out`.
pub fn encode_record(
    fields: &HashMap<String, Value>,
    schema: &Schema,
    out: &mut Vec<u8>,
) -> Result<()> {
    for field in &schema.fields {
        let value = fields.get(&field.name).ok_or(Error::SerializationError)?;
        encode_value(value, &field.field_type, out)?;
    }
    Ok(())
}

/// Decodes a record's fields, in schema order, from the front of `buf`.
///
/// Returns the decoded name-to-value map and the number of bytes consumed.
pub fn decode_record(buf: &[u8], schema: &Schema) -> Result<(HashMap<String, Value>, usize)> {
    let mut offset = 0;
    let mut fields = HashMap::with_capacity(schema.fields.len());
    for Field { name, field_type } in &schema.fields {
        let (value, consumed) = decode_value(&buf[offset..], field_type)?;
        fields.insert(name.clone(), value);
        offset += consumed;
    }
    Ok((fields, offset))
}

//! Binary → JSON.

use serde_json::{Map, Value};

use super::amount::{decode_amount, decode_currency};
use super::definitions::{
    field_by_id, ledger_entry_type_name, transaction_result_name, transaction_type_name,
    FieldDef, TypeCode,
};
use super::CodecError;
use crate::crypto::encode_classic_address;

const OBJECT_END: (u8, u8) = (14, 1);
const ARRAY_END: (u8, u8) = (15, 1);

/// Cursor over a serialized object.
pub struct BinaryParser<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn read(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(n).ok_or(CodecError::UnexpectedEnd)?;
        let slice = self.data.get(self.pos..end).ok_or(CodecError::UnexpectedEnd)?;
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.read(1)?[0])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let slice = self.read(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    /// Returns `(type_code, nth)`.
    pub fn read_field_header(&mut self) -> Result<(u8, u8), CodecError> {
        let first = self.read_u8()?;
        let mut type_code = first >> 4;
        let mut nth = first & 0x0F;
        if type_code == 0 {
            type_code = self.read_u8()?;
        }
        if nth == 0 {
            nth = self.read_u8()?;
        }
        Ok((type_code, nth))
    }

    pub fn read_vl_length(&mut self) -> Result<usize, CodecError> {
        let b1 = self.read_u8()? as usize;
        match b1 {
            0..=192 => Ok(b1),
            193..=240 => {
                let b2 = self.read_u8()? as usize;
                Ok(193 + (b1 - 193) * 256 + b2)
            }
            241..=254 => {
                let b2 = self.read_u8()? as usize;
                let b3 = self.read_u8()? as usize;
                Ok(12_481 + (b1 - 241) * 65_536 + b2 * 256 + b3)
            }
            _ => Err(CodecError::InvalidLengthPrefix),
        }
    }

    /// Parse fields until the buffer ends or `end_marker` is read.
    pub fn read_object(&mut self, end_marker: Option<(u8, u8)>) -> Result<Map<String, Value>, CodecError> {
        let mut object = Map::new();
        loop {
            if self.is_end() {
                return match end_marker {
                    None => Ok(object),
                    Some(_) => Err(CodecError::UnexpectedEnd),
                };
            }
            let id = self.read_field_header()?;
            if Some(id) == end_marker {
                return Ok(object);
            }
            let def = field_by_id(id.0, id.1).ok_or(CodecError::UnknownFieldId(id.0, id.1))?;
            let value = self.read_field_value(&def)?;
            object.insert(def.name.to_string(), value);
        }
    }

    fn read_field_value(&mut self, def: &FieldDef) -> Result<Value, CodecError> {
        Ok(match def.type_code {
            TypeCode::UInt8 => {
                let n = self.read_u8()?;
                match (def.name, transaction_result_name(n)) {
                    ("TransactionResult", Some(name)) => Value::String(name.into()),
                    _ => Value::from(n),
                }
            }
            TypeCode::UInt16 => {
                let n = u16::from_be_bytes(self.read_array()?);
                let named = match def.name {
                    "TransactionType" => transaction_type_name(n),
                    "LedgerEntryType" => ledger_entry_type_name(n),
                    _ => None,
                };
                named.map(|s| Value::String(s.into())).unwrap_or_else(|| Value::from(n))
            }
            TypeCode::UInt32 => Value::from(u32::from_be_bytes(self.read_array()?)),
            TypeCode::UInt64 => {
                Value::String(format!("{:016X}", u64::from_be_bytes(self.read_array()?)))
            }
            TypeCode::Hash128 => Value::String(hex::encode_upper(self.read(16)?)),
            TypeCode::Hash160 => Value::String(hex::encode_upper(self.read(20)?)),
            TypeCode::Hash256 => Value::String(hex::encode_upper(self.read(32)?)),
            TypeCode::Amount => {
                let (value, used) = decode_amount(&self.data[self.pos..])?;
                self.pos += used;
                value
            }
            TypeCode::StObject => Value::Object(self.read_object(Some(OBJECT_END))?),
            TypeCode::StArray => {
                let mut items = Vec::new();
                loop {
                    let id = self.read_field_header()?;
                    if id == ARRAY_END {
                        break;
                    }
                    let inner = field_by_id(id.0, id.1).ok_or(CodecError::UnknownFieldId(id.0, id.1))?;
                    let object = self.read_object(Some(OBJECT_END))?;
                    let mut wrapper = Map::new();
                    wrapper.insert(inner.name.to_string(), Value::Object(object));
                    items.push(Value::Object(wrapper));
                }
                Value::Array(items)
            }
            TypeCode::PathSet => self.read_path_set()?,
            TypeCode::Blob | TypeCode::AccountId | TypeCode::Vector256 => {
                let len = self.read_vl_length()?;
                let payload = self.read(len)?;
                decode_vl_value(def, payload)?
            }
        })
    }

    fn read_path_set(&mut self) -> Result<Value, CodecError> {
        let mut paths = Vec::new();
        let mut current = Vec::new();
        loop {
            let kind = self.read_u8()?;
            match kind {
                0x00 => {
                    paths.push(Value::Array(current));
                    return Ok(Value::Array(paths));
                }
                0xFF => {
                    paths.push(Value::Array(std::mem::take(&mut current)));
                }
                _ => {
                    let mut step = Map::new();
                    if kind & 0x01 != 0 {
                        let id: [u8; 20] = self.read_array()?;
                        step.insert("account".into(), Value::String(encode_classic_address(&id)));
                    }
                    if kind & 0x10 != 0 {
                        let currency: [u8; 20] = self.read_array()?;
                        step.insert("currency".into(), Value::String(decode_currency(&currency)));
                    }
                    if kind & 0x20 != 0 {
                        let id: [u8; 20] = self.read_array()?;
                        step.insert("issuer".into(), Value::String(encode_classic_address(&id)));
                    }
                    current.push(Value::Object(step));
                }
            }
        }
    }
}

fn decode_vl_value(def: &FieldDef, payload: &[u8]) -> Result<Value, CodecError> {
    match def.type_code {
        TypeCode::AccountId => {
            let id: [u8; 20] = payload.try_into().map_err(|_| CodecError::InvalidValue {
                field: def.name.to_string(),
                reason: format!("account ID must be 20 bytes, got {}", payload.len()),
            })?;
            Ok(Value::String(encode_classic_address(&id)))
        }
        TypeCode::Vector256 => {
            if payload.len() % 32 != 0 {
                return Err(CodecError::InvalidValue {
                    field: def.name.to_string(),
                    reason: "vector length not a multiple of 32".into(),
                });
            }
            Ok(Value::Array(
                payload
                    .chunks(32)
                    .map(|c| Value::String(hex::encode_upper(c)))
                    .collect(),
            ))
        }
        _ => Ok(Value::String(hex::encode_upper(payload))),
    }
}

//! JSON → canonical binary.

use serde_json::{Map, Value};

use super::amount::{encode_amount, encode_currency};
use super::definitions::{
    field_by_name, ledger_entry_type_code, transaction_result_code, transaction_type_code,
    FieldDef, TypeCode,
};
use super::CodecError;
use crate::crypto::decode_classic_address;

const OBJECT_END_MARKER: u8 = 0xE1;
const ARRAY_END_MARKER: u8 = 0xF1;
const PATH_SEPARATOR: u8 = 0xFF;
const PATHSET_END: u8 = 0x00;
const PATH_STEP_ACCOUNT: u8 = 0x01;
const PATH_STEP_CURRENCY: u8 = 0x10;
const PATH_STEP_ISSUER: u8 = 0x20;

/// Largest payload a length prefix can describe.
pub const MAX_VL_LENGTH: usize = 918_744;

/// Accumulates the binary encoding of an object.
#[derive(Debug, Default)]
pub struct BinarySerializer {
    buf: Vec<u8>,
}

impl BinarySerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: &[u8]) -> Self {
        Self {
            buf: prefix.to_vec(),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Serialize every field of `object` in canonical order. With
    /// `signing_only`, fields that carry signatures are left out.
    pub fn write_object(
        &mut self,
        object: &Map<String, Value>,
        signing_only: bool,
    ) -> Result<(), CodecError> {
        let mut fields = Vec::with_capacity(object.len());
        for (name, value) in object {
            let def = field_by_name(name).ok_or_else(|| CodecError::UnknownField(name.clone()))?;
            if signing_only && !def.is_signing_field {
                continue;
            }
            fields.push((def, value));
        }
        fields.sort_by_key(|(def, _)| def.ordinal());

        for (def, value) in fields {
            self.write_field(&def, value, signing_only)?;
        }
        Ok(())
    }

    fn write_field(
        &mut self,
        def: &FieldDef,
        value: &Value,
        signing_only: bool,
    ) -> Result<(), CodecError> {
        write_field_header(&mut self.buf, def.type_code.code(), def.nth);

        if def.type_code.is_vl_encoded() {
            let mut payload = Vec::new();
            encode_value(def, value, &mut payload, signing_only)?;
            write_vl_length(&mut self.buf, payload.len())?;
            self.buf.extend_from_slice(&payload);
        } else {
            encode_value(def, value, &mut self.buf, signing_only)?;
        }
        Ok(())
    }
}

/// Field ID: one byte when both codes are below 16, otherwise two or three.
pub fn write_field_header(out: &mut Vec<u8>, type_code: u8, nth: u8) {
    match (type_code < 16, nth < 16) {
        (true, true) => out.push((type_code << 4) | nth),
        (true, false) => out.extend_from_slice(&[type_code << 4, nth]),
        (false, true) => out.extend_from_slice(&[nth, type_code]),
        (false, false) => out.extend_from_slice(&[0, type_code, nth]),
    }
}

/// Length prefix for variable-length fields.
pub fn write_vl_length(out: &mut Vec<u8>, len: usize) -> Result<(), CodecError> {
    if len <= 192 {
        out.push(len as u8);
    } else if len <= 12_480 {
        let len = len - 193;
        out.extend_from_slice(&[193 + (len >> 8) as u8, (len & 0xFF) as u8]);
    } else if len <= MAX_VL_LENGTH {
        let len = len - 12_481;
        out.extend_from_slice(&[
            241 + (len >> 16) as u8,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ]);
    } else {
        return Err(CodecError::LengthTooLarge(len));
    }
    Ok(())
}

fn invalid(def: &FieldDef, reason: impl Into<String>) -> CodecError {
    CodecError::InvalidValue {
        field: def.name.to_string(),
        reason: reason.into(),
    }
}

fn encode_value(
    def: &FieldDef,
    value: &Value,
    out: &mut Vec<u8>,
    signing_only: bool,
) -> Result<(), CodecError> {
    match def.type_code {
        TypeCode::UInt8 => {
            let n = match (def.name, value) {
                ("TransactionResult", Value::String(name)) => transaction_result_code(name)
                    .ok_or_else(|| invalid(def, format!("unknown result {}", name)))?
                    as u64,
                _ => uint(def, value, u8::MAX as u64)?,
            };
            out.push(n as u8);
        }
        TypeCode::UInt16 => {
            let n = match (def.name, value) {
                ("TransactionType", Value::String(name)) => transaction_type_code(name)
                    .ok_or_else(|| CodecError::UnknownTransactionType(name.clone()))?,
                ("LedgerEntryType", Value::String(name)) => ledger_entry_type_code(name)
                    .ok_or_else(|| invalid(def, format!("unknown ledger entry type {}", name)))?,
                _ => uint(def, value, u16::MAX as u64)? as u16,
            };
            out.extend_from_slice(&n.to_be_bytes());
        }
        TypeCode::UInt32 => {
            let n = uint(def, value, u32::MAX as u64)? as u32;
            out.extend_from_slice(&n.to_be_bytes());
        }
        TypeCode::UInt64 => {
            // Hex on the wire's JSON side, like the ledger itself reports it.
            let n = match value {
                Value::String(s) => u64::from_str_radix(s, 16)
                    .map_err(|_| invalid(def, "expected up to 16 hex characters"))?,
                other => uint(def, other, u64::MAX)?,
            };
            out.extend_from_slice(&n.to_be_bytes());
        }
        TypeCode::Hash128 => out.extend_from_slice(&fixed_hex(def, value, 16)?),
        TypeCode::Hash160 => out.extend_from_slice(&fixed_hex(def, value, 20)?),
        TypeCode::Hash256 => out.extend_from_slice(&fixed_hex(def, value, 32)?),
        TypeCode::Amount => encode_amount(value, out)?,
        TypeCode::Blob => {
            let s = value.as_str().ok_or_else(|| invalid(def, "expected hex string"))?;
            let bytes = hex::decode(s).map_err(|_| CodecError::InvalidHex(def.name.to_string()))?;
            out.extend_from_slice(&bytes);
        }
        TypeCode::AccountId => {
            let s = value.as_str().ok_or_else(|| invalid(def, "expected address"))?;
            let id = decode_classic_address(s)
                .map_err(|e| CodecError::InvalidAccount(format!("{}: {}", s, e)))?;
            out.extend_from_slice(&id);
        }
        TypeCode::StObject => {
            let object = value.as_object().ok_or_else(|| invalid(def, "expected object"))?;
            let mut inner = BinarySerializer::new();
            inner.write_object(object, signing_only)?;
            out.extend_from_slice(&inner.into_bytes());
            out.push(OBJECT_END_MARKER);
        }
        TypeCode::StArray => {
            let items = value.as_array().ok_or_else(|| invalid(def, "expected array"))?;
            for item in items {
                let wrapper = item
                    .as_object()
                    .filter(|o| o.len() == 1)
                    .ok_or_else(|| invalid(def, "array entries must be single-key objects"))?;
                let mut inner = BinarySerializer::new();
                inner.write_object(wrapper, signing_only)?;
                out.extend_from_slice(&inner.into_bytes());
            }
            out.push(ARRAY_END_MARKER);
        }
        TypeCode::PathSet => encode_path_set(def, value, out)?,
        TypeCode::Vector256 => {
            let items = value.as_array().ok_or_else(|| invalid(def, "expected array"))?;
            for item in items {
                out.extend_from_slice(&fixed_hex(def, item, 32)?);
            }
        }
    }
    Ok(())
}

fn uint(def: &FieldDef, value: &Value, max: u64) -> Result<u64, CodecError> {
    let n = match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| invalid(def, "expected unsigned integer"))?,
        Value::String(s) => s
            .parse::<u64>()
            .map_err(|_| invalid(def, "expected unsigned integer"))?,
        _ => return Err(invalid(def, "expected unsigned integer")),
    };
    if n > max {
        return Err(invalid(def, format!("{} exceeds {}", n, max)));
    }
    Ok(n)
}

fn fixed_hex(def: &FieldDef, value: &Value, len: usize) -> Result<Vec<u8>, CodecError> {
    let s = value.as_str().ok_or_else(|| invalid(def, "expected hex string"))?;
    let bytes = hex::decode(s).map_err(|_| CodecError::InvalidHex(def.name.to_string()))?;
    if bytes.len() != len {
        return Err(invalid(def, format!("expected {} bytes, got {}", len, bytes.len())));
    }
    Ok(bytes)
}

fn encode_path_set(def: &FieldDef, value: &Value, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let paths = value.as_array().ok_or_else(|| invalid(def, "expected array of paths"))?;
    for (i, path) in paths.iter().enumerate() {
        if i > 0 {
            out.push(PATH_SEPARATOR);
        }
        let steps = path.as_array().ok_or_else(|| invalid(def, "expected array of steps"))?;
        for step in steps {
            let step = step.as_object().ok_or_else(|| invalid(def, "expected path step object"))?;
            let account = step.get("account").and_then(Value::as_str);
            let currency = step.get("currency").and_then(Value::as_str);
            let issuer = step.get("issuer").and_then(Value::as_str);

            let mut kind = 0u8;
            if account.is_some() {
                kind |= PATH_STEP_ACCOUNT;
            }
            if currency.is_some() {
                kind |= PATH_STEP_CURRENCY;
            }
            if issuer.is_some() {
                kind |= PATH_STEP_ISSUER;
            }
            out.push(kind);

            if let Some(account) = account {
                let id = decode_classic_address(account)
                    .map_err(|e| CodecError::InvalidAccount(format!("{}: {}", account, e)))?;
                out.extend_from_slice(&id);
            }
            if let Some(currency) = currency {
                out.extend_from_slice(&encode_currency(currency)?);
            }
            if let Some(issuer) = issuer {
                let id = decode_classic_address(issuer)
                    .map_err(|e| CodecError::InvalidAccount(format!("{}: {}", issuer, e)))?;
                out.extend_from_slice(&id);
            }
        }
    }
    out.push(PATHSET_END);
    Ok(())
}
